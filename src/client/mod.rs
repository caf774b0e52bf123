//! Replica-side components: synchronizer, event loop and presentation view

pub mod replica;
pub mod synchronizer;
pub mod view;

// Re-export client types
pub use replica::{connect, Replica, ReplicaHandle};
pub use synchronizer::{GameSynchronizer, MoveOutcome};
pub use view::{GameView, Status};
