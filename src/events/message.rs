//! Broadcast messages carrying the full game state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GameResult;
use crate::game::{GameState, ParticipantId};
use super::{MOVE_EVENT, START_EVENT};

/// A state-change message sent over the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    /// A freshly originated game
    Start(GameState),
    /// The state right after a move
    Move(GameState),
}

impl ChannelMessage {
    pub fn event_name(&self) -> &'static str {
        match self {
            ChannelMessage::Start(_) => START_EVENT,
            ChannelMessage::Move(_) => MOVE_EVENT,
        }
    }

    pub fn payload(&self) -> &GameState {
        match self {
            ChannelMessage::Start(state) | ChannelMessage::Move(state) => state,
        }
    }

    pub fn into_payload(self) -> GameState {
        match self {
            ChannelMessage::Start(state) | ChannelMessage::Move(state) => state,
        }
    }

    /// Wrap the message for publication by `sender`
    pub fn to_envelope(&self, sender: &ParticipantId) -> GameResult<Envelope> {
        let content = serde_json::to_string(self.payload())?;
        Ok(Envelope {
            id: Uuid::new_v4(),
            sender: sender.clone(),
            sent_at: Utc::now(),
            event: self.event_name().to_string(),
            content,
        })
    }
}

/// What actually travels over the channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    pub sender: ParticipantId,
    pub sent_at: DateTime<Utc>,
    /// Broadcast event name, `start` or `move`
    pub event: String,
    /// JSON-encoded [`GameState`]
    pub content: String,
}
