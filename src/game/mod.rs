//! Board, participants and the replicated game state

pub mod board;
pub mod participant;
pub mod state;

pub use board::{Board, Marker, Square, WINNING_LINES};
pub use participant::{IdentityScheme, ParticipantId};
pub use state::{evaluate, GameState, MoveRejection, Phase, Winner};
