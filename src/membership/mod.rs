//! Membership tracking: turns raw presence events into pairing signals

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::channel::Channel;
use crate::error::GameResult;
use crate::events::PresenceEvent;
use crate::game::ParticipantId;

/// Semantic transitions raised for the game synchronizer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipSignal {
    /// Exactly two participants present and no game active
    PairFormed { opponent: ParticipantId },
    /// Presence dropped to a single participant
    PeerLeft,
}

/// Watches the presence set of one topic on behalf of the local participant.
///
/// Holds no game state; callers pass in whether a game is active.
#[derive(Debug, Clone)]
pub struct MembershipTracker {
    self_id: ParticipantId,
}

impl MembershipTracker {
    pub fn new(self_id: ParticipantId) -> Self {
        Self { self_id }
    }

    pub fn self_id(&self) -> &ParticipantId {
        &self.self_id
    }

    /// Announce local presence. Call once the subscription is active.
    pub fn track<C: Channel + ?Sized>(&self, channel: &C) -> GameResult<()> {
        info!(participant = %self.self_id, topic = channel.topic(), "Tracking presence");
        channel.track(&self.self_id)
    }

    /// Retract local presence on teardown
    pub fn untrack<C: Channel + ?Sized>(&self, channel: &C) -> GameResult<()> {
        info!(participant = %self.self_id, topic = channel.topic(), "Untracking presence");
        channel.untrack(&self.self_id)
    }

    /// Handle a presence sync.
    ///
    /// Raises `PairFormed` only for a two-member set containing the local
    /// participant while no game is active, so repeated syncs are harmless.
    pub fn on_sync(&self, keys: &BTreeSet<ParticipantId>, game_active: bool) -> Option<MembershipSignal> {
        debug!(participant = %self.self_id, present = keys.len(), game_active, "Presence sync");

        if game_active || keys.len() != 2 || !keys.contains(&self.self_id) {
            return None;
        }

        let opponent = keys.iter().find(|key| **key != self.self_id)?.clone();
        info!(participant = %self.self_id, opponent = %opponent, "Pair formed");
        Some(MembershipSignal::PairFormed { opponent })
    }

    pub fn on_join(&self, key: &ParticipantId) {
        debug!(participant = %self.self_id, joined = %key, "Presence join");
    }

    /// Handle a departure; `remaining` counts participants still present
    pub fn on_leave(&self, key: &ParticipantId, remaining: usize) -> Option<MembershipSignal> {
        debug!(participant = %self.self_id, left = %key, remaining, "Presence leave");

        if remaining == 1 {
            info!(participant = %self.self_id, left = %key, "Peer left");
            Some(MembershipSignal::PeerLeft)
        } else {
            None
        }
    }

    /// Dispatch any presence event to the matching handler
    pub fn on_presence(&self, event: &PresenceEvent, game_active: bool) -> Option<MembershipSignal> {
        match event {
            PresenceEvent::Sync { keys } => self.on_sync(keys, game_active),
            PresenceEvent::Join { key } => {
                self.on_join(key);
                None
            }
            PresenceEvent::Leave { key, remaining } => self.on_leave(key, *remaining),
        }
    }
}
