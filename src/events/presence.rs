//! Presence sub-protocol events

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::ParticipantId;

/// Liveness metadata the transport keeps per tracked participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceMeta {
    pub joined_at: DateTime<Utc>,
}

impl PresenceMeta {
    pub fn now() -> Self {
        Self { joined_at: Utc::now() }
    }
}

/// Change in the set of participants present on a topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum PresenceEvent {
    /// Full key set after any change
    Sync { keys: BTreeSet<ParticipantId> },
    Join { key: ParticipantId },
    /// `remaining` counts participants still present after the departure
    Leave { key: ParticipantId, remaining: usize },
}
