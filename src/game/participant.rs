//! Participant identifiers

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{DuetError, GameResult};

/// Reserved by the wire encoding of [`crate::game::Winner::Tie`]
const TIE_LITERAL: &str = "tie";

/// How a replica generates its own identifier at start-up.
///
/// Identifiers are never checked for collisions against peers. On a
/// [`crate::LocalRelay`] a `Short` collision replaces the earlier
/// subscription: the earlier replica stops and the later one keeps waiting,
/// so the two never pair with each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityScheme {
    /// Random number in `0..1000`
    Short,
    /// Random 128-bit UUID
    #[default]
    Uuid,
}

/// Opaque identifier of one connected participant.
///
/// Doubles as the presence key on the channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Wrap an identifier supplied by an identity provider
    pub fn new(id: impl Into<String>) -> GameResult<Self> {
        let id = id.into();
        if id.is_empty() {
            return Err(DuetError::InvalidParticipant(
                "Participant identifier cannot be empty".to_string()
            ));
        }
        if id == TIE_LITERAL {
            return Err(DuetError::InvalidParticipant(
                format!("'{}' is reserved and cannot identify a participant", TIE_LITERAL)
            ));
        }
        Ok(Self(id))
    }

    /// Generate a fresh local identifier
    pub fn generate(scheme: IdentityScheme) -> Self {
        match scheme {
            IdentityScheme::Short => Self(rand::thread_rng().gen_range(0..1000u32).to_string()),
            IdentityScheme::Uuid => Self(uuid::Uuid::new_v4().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = DuetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ParticipantId {
    type Error = DuetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ParticipantId> for String {
    fn from(id: ParticipantId) -> Self {
        id.0
    }
}
