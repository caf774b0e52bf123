//! Error types for duet

use thiserror::Error;

/// Main error type for duet
#[derive(Debug, Clone, Error)]
pub enum DuetError {
    #[error("Channel error: {source}")]
    Channel {
        source: ChannelError,
        context: String,
    },

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: String,
    },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Invalid participant identifier: {0}")]
    InvalidParticipant(String),

    #[error("No opponent identifier available")]
    MissingOpponent,

    #[error("Replica is no longer running")]
    ReplicaStopped,
}

/// Transport-level error types
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("Channel closed: {topic}")]
    Closed { topic: String },

    #[error("Participant {participant} is not subscribed to {topic}")]
    NotSubscribed { topic: String, participant: String },
}

impl From<ChannelError> for DuetError {
    fn from(err: ChannelError) -> Self {
        DuetError::Channel {
            source: err,
            context: String::new(),
        }
    }
}

impl From<serde_json::Error> for DuetError {
    fn from(err: serde_json::Error) -> Self {
        DuetError::Serialization {
            message: err.to_string(),
        }
    }
}

impl DuetError {
    /// Attach context to a channel error, leaving other variants untouched
    pub fn with_context(self, context: &str) -> Self {
        match self {
            DuetError::Channel { source, .. } => DuetError::Channel {
                source,
                context: context.to_string(),
            },
            other => other,
        }
    }
}

/// Type alias for the main result type used throughout the library
pub type GameResult<T> = Result<T, DuetError>;

/// Logging configuration and initialization
pub mod logging {
    use tracing::Level;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};
    use std::env;

    /// Logging output format
    #[derive(Debug, Clone)]
    pub enum LogFormat {
        Human,
        Json,
    }

    /// Logging output destination
    #[derive(Debug, Clone)]
    pub enum LogOutput {
        Stdout,
        Stderr,
    }

    /// Logging configuration
    #[derive(Debug, Clone)]
    pub struct LoggingConfig {
        pub level: Level,
        pub format: LogFormat,
        pub output: LogOutput,
    }

    impl Default for LoggingConfig {
        fn default() -> Self {
            Self {
                level: Level::INFO,
                format: LogFormat::Human,
                output: LogOutput::Stdout,
            }
        }
    }

    /// Initialize structured logging with the given configuration
    pub fn init_logging(config: LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let env_filter = EnvFilter::builder()
            .with_default_directive(config.level.into())
            .from_env_lossy()
            .add_directive("tokio=info".parse()?);

        let registry = tracing_subscriber::registry()
            .with(env_filter);

        match config.format {
            LogFormat::Human => {
                let fmt_layer = fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true);

                match config.output {
                    LogOutput::Stdout => registry.with(fmt_layer.with_writer(std::io::stdout)).try_init()?,
                    LogOutput::Stderr => registry.with(fmt_layer.with_writer(std::io::stderr)).try_init()?,
                }
            }
            LogFormat::Json => {
                let fmt_layer = fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_span_events(fmt::format::FmtSpan::CLOSE);

                match config.output {
                    LogOutput::Stdout => registry.with(fmt_layer.with_writer(std::io::stdout)).try_init()?,
                    LogOutput::Stderr => registry.with(fmt_layer.with_writer(std::io::stderr)).try_init()?,
                }
            }
        }

        Ok(())
    }

    /// Initialize logging with environment-based configuration
    pub fn init_from_env() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let level = env::var("DUET_LOG_LEVEL")
            .unwrap_or_else(|_| "info".to_string())
            .parse::<Level>()
            .unwrap_or(Level::INFO);

        let format = match env::var("DUET_LOG_FORMAT").as_ref().map(|s| s.as_str()) {
            Ok("json") => LogFormat::Json,
            _ => LogFormat::Human,
        };

        let output = match env::var("DUET_LOG_OUTPUT").as_ref().map(|s| s.as_str()) {
            Ok("stderr") => LogOutput::Stderr,
            _ => LogOutput::Stdout,
        };

        let config = LoggingConfig { level, format, output };
        init_logging(config)
    }
}
