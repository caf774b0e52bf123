//! Configuration management for duet

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use crate::error::DuetError;
use crate::game::IdentityScheme;

/// Main configuration for a duet replica
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuetConfig {
    /// Channel configuration
    #[serde(default)]
    pub channel: ChannelConfig,
    /// Game configuration
    #[serde(default)]
    pub game: GameConfig,
    /// Local identity configuration
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Channel-related configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Topic shared by both participants of one session
    pub topic: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            topic: "game".to_string(),
        }
    }
}

/// Which replica originates a game once a pair forms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OriginationPolicy {
    /// Every replica that sees the pair originates; the first `start`
    /// processed wins locally, so peers can disagree on marker assignment
    #[default]
    EitherPeer,
    /// Only the lexicographically smaller identifier originates
    LowestId,
}

/// Game-specific configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GameConfig {
    pub origination: OriginationPolicy,
}

/// Local identity configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    pub scheme: IdentityScheme,
}

impl DuetConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, DuetError> {
        let content = fs::read_to_string(path).map_err(|e| {
            DuetError::Configuration {
                message: format!("Failed to read config file: {}", e),
                field: "config_file".to_string(),
            }
        })?;

        let config: DuetConfig = toml::from_str(&content).map_err(|e| {
            DuetError::Configuration {
                message: format!("Failed to parse config file: {}", e),
                field: "config_format".to_string(),
            }
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), DuetError> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            DuetError::Configuration {
                message: format!("Failed to serialize config: {}", e),
                field: "config_serialization".to_string(),
            }
        })?;

        fs::write(path, content).map_err(|e| {
            DuetError::Configuration {
                message: format!("Failed to write config file: {}", e),
                field: "config_write".to_string(),
            }
        })?;

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), DuetError> {
        if self.channel.topic.is_empty() {
            return Err(DuetError::Configuration {
                message: "Channel topic cannot be empty".to_string(),
                field: "channel.topic".to_string(),
            });
        }

        if self.channel.topic.chars().any(char::is_whitespace) {
            return Err(DuetError::Configuration {
                message: format!("Channel topic '{}' contains whitespace", self.channel.topic),
                field: "channel.topic".to_string(),
            });
        }

        Ok(())
    }

    /// Relaxed settings for local play: single originator, short identifiers
    pub fn development() -> Self {
        Self {
            channel: ChannelConfig::default(),
            game: GameConfig {
                origination: OriginationPolicy::LowestId,
            },
            identity: IdentityConfig {
                scheme: IdentityScheme::Short,
            },
        }
    }
}
