//! Channel message contracts: broadcast `start`/`move` and presence events

pub mod message;
pub mod presence;


pub use message::{ChannelMessage, Envelope};
pub use presence::{PresenceEvent, PresenceMeta};

use crate::error::{DuetError, GameResult};
use crate::game::GameState;

/// Broadcast event names
pub const START_EVENT: &str = "start";
pub const MOVE_EVENT: &str = "move";

/// Anything a subscriber can receive from a channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    Presence(PresenceEvent),
    Broadcast(Envelope),
}

/// Envelope decoding utilities
pub struct EventParser;

impl EventParser {
    /// Parse a `start` envelope
    pub fn parse_start(envelope: &Envelope) -> GameResult<GameState> {
        Self::expect_event(envelope, START_EVENT)?;
        serde_json::from_str(&envelope.content).map_err(DuetError::from)
    }

    /// Parse a `move` envelope
    pub fn parse_move(envelope: &Envelope) -> GameResult<GameState> {
        Self::expect_event(envelope, MOVE_EVENT)?;
        serde_json::from_str(&envelope.content).map_err(DuetError::from)
    }

    /// Parse any game envelope into a message
    pub fn parse(envelope: &Envelope) -> GameResult<ChannelMessage> {
        match envelope.event.as_str() {
            START_EVENT => Self::parse_start(envelope).map(ChannelMessage::Start),
            MOVE_EVENT => Self::parse_move(envelope).map(ChannelMessage::Move),
            other => Err(DuetError::Validation {
                message: format!("Unknown broadcast event '{}'", other),
                field: Some("event".to_string()),
            }),
        }
    }

    pub fn is_game_event(envelope: &Envelope) -> bool {
        matches!(envelope.event.as_str(), START_EVENT | MOVE_EVENT)
    }

    fn expect_event(envelope: &Envelope, expected: &str) -> GameResult<()> {
        if envelope.event != expected {
            return Err(DuetError::Validation {
                message: format!("Expected '{}' event, got '{}'", expected, envelope.event),
                field: Some("event".to_string()),
            });
        }
        Ok(())
    }
}
