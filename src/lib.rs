//! duet - two-player board game state replicated over a shared broadcast channel
//!
//! There is no server-side referee. Each replica:
//! - tracks presence on a shared topic and starts a game once exactly two
//!   participants are present
//! - applies its own moves optimistically and broadcasts the full resulting state
//! - treats every inbound `move` as the new ground truth (last writer wins)
//! - drops back to waiting when the peer leaves

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod game;
pub mod membership;

// Re-export commonly used types for convenience
pub use error::{ChannelError, DuetError, GameResult};

// Re-export game types
pub use game::{Board, GameState, IdentityScheme, Marker, ParticipantId, Phase, Square, Winner};

// Re-export message contracts
pub use events::{ChannelEvent, ChannelMessage, Envelope, EventParser, PresenceEvent};

// Re-export transport, membership and client interfaces
pub use channel::{Channel, LocalChannel, LocalRelay};
pub use membership::{MembershipSignal, MembershipTracker};
pub use client::{connect, GameSynchronizer, GameView, MoveOutcome, ReplicaHandle, Status};

// Re-export configuration interfaces
pub use config::{DuetConfig, OriginationPolicy};
