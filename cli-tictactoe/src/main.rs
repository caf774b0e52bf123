use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use duet::error::logging::{init_logging, LogFormat, LogOutput, LoggingConfig};
use duet::{DuetConfig, LocalRelay, OriginationPolicy};
use tracing::Level;

mod config;
mod repl;

use config::ReplConfig;
use repl::ReplInterface;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Origination {
    /// Both replicas start a game when paired
    EitherPeer,
    /// Only the participant with the smaller id starts the game
    LowestId,
}

impl From<Origination> for OriginationPolicy {
    fn from(value: Origination) -> Self {
        match value {
            Origination::EitherPeer => OriginationPolicy::EitherPeer,
            Origination::LowestId => OriginationPolicy::LowestId,
        }
    }
}

#[derive(Parser)]
#[command(name = "duet-ttt")]
#[command(about = "Hot-seat tic-tac-toe between duet replicas sharing one relay")]
#[command(version)]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<String>,

    /// Channel topic the replicas join
    #[arg(short, long)]
    topic: Option<String>,

    /// Who starts a game once two participants are present [default: lowest-id without --config]
    #[arg(short, long, value_enum)]
    origination: Option<Origination>,

    /// Disable command history
    #[arg(long)]
    no_history: bool,

    /// Log level for replica diagnostics (written to stderr)
    #[arg(long, default_value = "warn")]
    log_level: Level,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // stdout belongs to the board
    init_logging(LoggingConfig {
        level: cli.log_level,
        format: if cli.json_logs { LogFormat::Json } else { LogFormat::Human },
        output: LogOutput::Stderr,
    })
    .map_err(|e| anyhow!(e))?;

    let mut config = match &cli.config {
        Some(path) => DuetConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => DuetConfig::development(),
    };
    if let Some(topic) = cli.topic {
        config.channel.topic = topic;
    }
    if let Some(origination) = cli.origination {
        config.game.origination = origination.into();
    }
    config.validate().context("Invalid configuration")?;

    let mut repl_config = ReplConfig::default();
    if cli.no_history {
        repl_config.history_file = None;
    }

    let relay = LocalRelay::new();
    let mut repl = ReplInterface::new(relay, config, repl_config)?;
    repl.run().await
}
