//! Transport seam: a named pub/sub channel with presence tracking

pub mod local;

pub use local::{LocalChannel, LocalRelay};

use std::sync::Arc;

use crate::error::GameResult;
use crate::events::Envelope;
use crate::game::ParticipantId;

/// One participant's handle on a shared topic.
///
/// Inbound events are delivered out of band (see [`LocalRelay::subscribe`]);
/// this trait only covers the outbound side. Every call is a single
/// best-effort send with no retry.
pub trait Channel: Send + Sync {
    fn topic(&self) -> &str;

    /// Announce `participant` in the topic's presence set
    fn track(&self, participant: &ParticipantId) -> GameResult<()>;

    /// Retract `participant` from the presence set
    fn untrack(&self, participant: &ParticipantId) -> GameResult<()>;

    /// Broadcast to every other subscriber; the sender gets no echo
    fn publish(&self, envelope: Envelope) -> GameResult<()>;

    /// Stop receiving events on this handle
    fn unsubscribe(&self) -> GameResult<()>;
}

impl<C: Channel + ?Sized> Channel for Arc<C> {
    fn topic(&self) -> &str {
        (**self).topic()
    }

    fn track(&self, participant: &ParticipantId) -> GameResult<()> {
        (**self).track(participant)
    }

    fn untrack(&self, participant: &ParticipantId) -> GameResult<()> {
        (**self).untrack(participant)
    }

    fn publish(&self, envelope: Envelope) -> GameResult<()> {
        (**self).publish(envelope)
    }

    fn unsubscribe(&self) -> GameResult<()> {
        (**self).unsubscribe()
    }
}
