use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use colored::*;
use duet::{
    connect, DuetConfig, DuetError, GameView, LocalRelay, ParticipantId, ReplicaHandle, Status,
};
use rustyline::{DefaultEditor, Result as RustylineResult};
use tokio::time::timeout;

use crate::config::ReplConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    // Membership
    /// Join under `name`, or a generated identifier when absent
    Join { name: Option<String> },
    Leave { name: String },

    // Gameplay
    Move { name: String, cell: usize },
    Again { name: String },
    Board { name: Option<String> },

    Help,
    Quit,
}

/// Status line shown to a participant for their current view
pub fn status_line(view: Option<&GameView>) -> &'static str {
    match view.map(|view| view.status) {
        None => "Waiting for opponent to join",
        Some(Status::YourTurn) => "Your turn",
        Some(Status::OpponentsTurn) => "Waiting for opponent",
        Some(Status::Won) => "You win!",
        Some(Status::Lost) => "You lose!",
        Some(Status::Tie) => "It's a tie!",
        Some(Status::Observing) => "Watching someone else's game",
    }
}

pub fn parse_command(input: &str) -> Result<ReplCommand> {
    let parts: Vec<&str> = input.split_whitespace().collect();

    match parts.as_slice() {
        ["join"] => Ok(ReplCommand::Join { name: None }),
        ["join", name] => Ok(ReplCommand::Join { name: Some(name.to_string()) }),
        ["leave", name] => Ok(ReplCommand::Leave { name: name.to_string() }),
        ["move", name, cell] | ["m", name, cell] => Ok(ReplCommand::Move {
            name: name.to_string(),
            cell: cell
                .parse()
                .map_err(|_| anyhow!("Cell must be a number from 0 to 8, got '{}'", cell))?,
        }),
        ["again", name] => Ok(ReplCommand::Again { name: name.to_string() }),
        ["board"] => Ok(ReplCommand::Board { name: None }),
        ["board", name] => Ok(ReplCommand::Board { name: Some(name.to_string()) }),
        ["help"] => Ok(ReplCommand::Help),
        ["quit"] | ["exit"] => Ok(ReplCommand::Quit),
        [] => Err(anyhow!("Empty command")),
        _ => Err(anyhow!(
            "Unknown command: '{}'. Type 'help' for available commands.",
            input.trim()
        )),
    }
}

/// Replicas hosted by this process, keyed by participant name
pub struct Session {
    relay: LocalRelay,
    duet_config: DuetConfig,
    settle_timeout: Duration,
    players: BTreeMap<String, ReplicaHandle>,
}

impl Session {
    pub fn new(relay: LocalRelay, duet_config: DuetConfig, settle_timeout: Duration) -> Self {
        Self {
            relay,
            duet_config,
            settle_timeout,
            players: BTreeMap::new(),
        }
    }

    pub async fn handle(&mut self, command: ReplCommand) -> Result<()> {
        match command {
            ReplCommand::Join { name } => self.join(name).await,
            ReplCommand::Leave { name } => self.leave(&name).await,
            ReplCommand::Move { name, cell } => self.make_move(&name, cell).await,
            ReplCommand::Again { name } => self.play_again(&name).await,
            ReplCommand::Board { name: Some(name) } => {
                display_player(&name, self.player(&name)?);
                Ok(())
            }
            ReplCommand::Board { name: None } => {
                if self.players.is_empty() {
                    println!("{}", "No one has joined yet".dimmed());
                }
                self.display_all();
                Ok(())
            }
            ReplCommand::Help => {
                display_help();
                Ok(())
            }
            ReplCommand::Quit => Ok(()),
        }
    }

    async fn join(&mut self, name: Option<String>) -> Result<()> {
        let id = match name {
            Some(name) => ParticipantId::new(name)?,
            None => ParticipantId::generate(self.duet_config.identity.scheme),
        };
        let name = id.to_string();
        if self.players.contains_key(&name) {
            bail!("{} has already joined", name);
        }

        let handle = connect(&self.relay, id, &self.duet_config)?;
        println!("{} joined {}", name.green().bold(), self.duet_config.channel.topic.cyan());

        // give pairing a moment so the board shows up right away
        let mut snapshots = handle.snapshots();
        let _ = timeout(self.settle_timeout, snapshots.changed()).await;

        display_player(&name, &handle);
        self.players.insert(name, handle);
        Ok(())
    }

    async fn leave(&mut self, name: &str) -> Result<()> {
        let handle = self
            .players
            .remove(name)
            .ok_or_else(|| anyhow!("{} is not playing", name))?;
        handle.leave().await?;
        println!("{} left", name.yellow());

        // remaining replicas react to the departure
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.display_all();
        Ok(())
    }

    async fn make_move(&self, name: &str, cell: usize) -> Result<()> {
        let handle = self.player(name)?;
        let mut snapshots = handle.snapshots();
        snapshots.borrow_and_update();

        handle.request_move(cell)?;

        if timeout(self.settle_timeout, snapshots.changed()).await.is_err() {
            println!("{}", format!("Move {} by {} was ignored", cell, name).yellow());
            return Ok(());
        }
        display_player(name, handle);
        Ok(())
    }

    async fn play_again(&self, name: &str) -> Result<()> {
        let handle = self.player(name)?;
        match handle.request_play_again().await {
            Ok(true) => {
                println!("{}", "New game started".green());
                display_player(name, handle);
            }
            Ok(false) => println!("{}", "The current game is still in progress".yellow()),
            Err(DuetError::MissingOpponent) => println!("{}", status_line(None).yellow()),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    pub async fn leave_all(&mut self) {
        for (name, handle) in std::mem::take(&mut self.players) {
            if let Err(e) = handle.leave().await {
                tracing::warn!(player = %name, error = %e, "Replica did not stop cleanly");
            }
        }
    }

    fn player(&self, name: &str) -> Result<&ReplicaHandle> {
        self.players
            .get(name)
            .ok_or_else(|| anyhow!("{} is not playing; try 'join {}'", name, name))
    }

    fn display_all(&self) {
        for (name, handle) in &self.players {
            display_player(name, handle);
        }
    }
}

fn display_player(name: &str, handle: &ReplicaHandle) {
    let view = handle.current();
    let marker = view
        .as_ref()
        .and_then(|view| view.your_marker)
        .map(|marker| format!(" ({})", marker))
        .unwrap_or_default();

    println!("{}{}", name.bold(), marker);
    if let Some(view) = &view {
        println!("{}", view.board);
    }

    let status = status_line(view.as_ref());
    let status = match view.as_ref().map(|view| view.status) {
        Some(Status::YourTurn) | Some(Status::Won) => status.green(),
        Some(Status::Lost) => status.red(),
        _ => status.dimmed(),
    };
    println!("{}", status);
    println!();
}

fn display_help() {
    println!("{}", "Commands:".bold());
    println!("  join [name]          add a participant, with a generated id if unnamed");
    println!("  leave <name>         remove a participant");
    println!("  move <name> <cell>   mark cell 0-8 for a participant");
    println!("  again <name>         start a new game after one finishes");
    println!("  board [name]         show one or every participant's board");
    println!("  help                 show this message");
    println!("  quit                 leave and exit");
}

/// Line-oriented front end driving a [`Session`]
pub struct ReplInterface {
    editor: DefaultEditor,
    session: Session,
    config: ReplConfig,
}

impl ReplInterface {
    pub fn new(relay: LocalRelay, duet_config: DuetConfig, config: ReplConfig) -> Result<Self> {
        let mut editor = DefaultEditor::new()?;

        if let Some(history_file) = &config.history_file {
            let _ = editor.load_history(history_file);
        }

        Ok(Self {
            editor,
            session: Session::new(relay, duet_config, config.settle_timeout),
            config,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        self.display_welcome();

        loop {
            let input = match self.read_input() {
                Ok(input) => input,
                Err(_) => {
                    println!("\nGoodbye!");
                    break;
                }
            };
            if !input.trim().is_empty() {
                let _ = self.editor.add_history_entry(input.as_str());
            }

            match parse_command(&input) {
                Ok(ReplCommand::Quit) => {
                    println!("Goodbye!");
                    break;
                }
                Ok(command) => {
                    if let Err(e) = self.session.handle(command).await {
                        eprintln!("{}", format!("Error: {}", e).red());
                    }
                }
                Err(e) => {
                    eprintln!("{}", format!("Error: {}", e).red());
                }
            }
        }

        self.session.leave_all().await;

        if let Some(history_file) = &self.config.history_file {
            let _ = self.editor.save_history(history_file);
        }

        Ok(())
    }

    fn display_welcome(&self) {
        println!("{}", "duet tic-tac-toe".bright_blue().bold());
        println!("{}", "Two replicas, one broadcast channel, no referee".cyan());
        println!("{}", "Type 'help' for available commands".dimmed());
        println!();
    }

    fn read_input(&mut self) -> RustylineResult<String> {
        self.editor.readline(&self.config.prompt)
    }
}
