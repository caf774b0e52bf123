//! Game synchronizer: sole writer and publisher of this replica's game state

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::channel::Channel;
use crate::config::OriginationPolicy;
use crate::error::{DuetError, GameResult};
use crate::events::{ChannelMessage, Envelope, EventParser};
use crate::game::{GameState, MoveRejection, ParticipantId, Phase, Square, Winner};
use super::view::GameView;

const OUTCOME_CAPACITY: usize = 16;

/// Result of a locally requested move
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Adopted locally and published
    Applied(GameState),
    /// Nothing changed and nothing was published
    Ignored(MoveRejection),
}

/// Owns the local replica's `Option<GameState>`.
///
/// Local moves are applied optimistically and then published; inbound
/// `move` messages replace local state wholesale. Every change is pushed to
/// snapshot subscribers, and transitions into a finished game are announced
/// on the outcome stream.
#[derive(Debug)]
pub struct GameSynchronizer<C> {
    self_id: ParticipantId,
    channel: C,
    policy: OriginationPolicy,
    rng: StdRng,
    state: Option<GameState>,
    snapshots: watch::Sender<Option<GameView>>,
    outcomes: broadcast::Sender<Winner>,
}

impl<C: Channel> GameSynchronizer<C> {
    pub fn new(self_id: ParticipantId, channel: C, policy: OriginationPolicy) -> Self {
        let (snapshots, _) = watch::channel(None);
        let (outcomes, _) = broadcast::channel(OUTCOME_CAPACITY);
        Self {
            self_id,
            channel,
            policy,
            rng: StdRng::from_entropy(),
            state: None,
            snapshots,
            outcomes,
        }
    }

    /// Replace the marker-assignment RNG, for reproducible games
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn self_id(&self) -> &ParticipantId {
        &self.self_id
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn has_game(&self) -> bool {
        self.state.is_some()
    }

    pub fn phase(&self) -> Phase {
        self.state.as_ref().map_or(Phase::Idle, GameState::phase)
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<GameView>> {
        self.snapshots.subscribe()
    }

    pub fn outcomes(&self) -> broadcast::Receiver<Winner> {
        self.outcomes.subscribe()
    }

    pub(crate) fn outcome_sender(&self) -> broadcast::Sender<Winner> {
        self.outcomes.clone()
    }

    /// Whether this replica originates when paired with `opponent`
    pub fn should_originate(&self, opponent: &ParticipantId) -> bool {
        match self.policy {
            OriginationPolicy::EitherPeer => true,
            OriginationPolicy::LowestId => self.self_id < *opponent,
        }
    }

    /// Start a fresh game against `opponent`, adopt it and publish `start`
    pub fn originate(&mut self, opponent: &ParticipantId) -> GameResult<GameState> {
        let state = GameState::originate(&self.self_id, opponent, &mut self.rng)?;
        debug_assert!(state.validate().is_ok());

        info!(
            participant = %self.self_id,
            using_x = %state.using_x,
            using_o = %state.using_o,
            "Originating game"
        );

        self.adopt(Some(state.clone()));
        self.publish(ChannelMessage::Start(state.clone()))?;
        Ok(state)
    }

    /// React to a pair forming; returns the new game if this replica started one
    pub fn on_pair_formed(&mut self, opponent: &ParticipantId) -> GameResult<Option<GameState>> {
        if self.has_game() {
            debug!(participant = %self.self_id, "Pair formed with a game already active");
            return Ok(None);
        }
        if !self.should_originate(opponent) {
            debug!(participant = %self.self_id, opponent = %opponent, "Waiting for opponent to originate");
            return Ok(None);
        }
        self.originate(opponent).map(Some)
    }

    /// Discard the game; back to waiting for an opponent
    pub fn on_peer_left(&mut self) {
        if self.state.is_some() {
            info!(participant = %self.self_id, "Opponent left, discarding game");
        }
        self.adopt(None);
    }

    /// Local move by cell index; out-of-range indices are ignored
    pub fn request_move(&mut self, index: usize) -> GameResult<MoveOutcome> {
        match Square::try_from(index) {
            Ok(square) => self.apply_local_move(square),
            Err(_) => Ok(self.ignore(MoveRejection::OutOfRange(index))),
        }
    }

    /// Apply a move by the local participant.
    ///
    /// Invalid intents leave the state untouched and publish nothing.
    pub fn apply_local_move(&mut self, square: Square) -> GameResult<MoveOutcome> {
        let Some(current) = self.state.as_ref() else {
            return Ok(self.ignore(MoveRejection::NoGame));
        };

        let next = match current.apply_move(&self.self_id, square) {
            Ok(next) => next,
            Err(rejection) => return Ok(self.ignore(rejection)),
        };

        debug!(
            participant = %self.self_id,
            square = ?square,
            whose_turn = %next.whose_turn,
            winner = %next.winner,
            "Applying local move"
        );

        self.adopt(Some(next.clone()));
        self.publish(ChannelMessage::Move(next.clone()))?;
        Ok(MoveOutcome::Applied(next))
    }

    /// Start another game against the current opponent.
    ///
    /// Fails with [`DuetError::MissingOpponent`] when there is no game to
    /// take the opponent from. Returns `None` while a game is still running.
    pub fn play_again(&mut self) -> GameResult<Option<GameState>> {
        let state = self.state.as_ref().ok_or(DuetError::MissingOpponent)?;
        let opponent = state
            .opponent_of(&self.self_id)
            .cloned()
            .ok_or(DuetError::MissingOpponent)?;

        if !state.is_finished() {
            debug!(participant = %self.self_id, "Play again ignored, game still in progress");
            return Ok(None);
        }

        self.originate(&opponent).map(Some)
    }

    /// Consume a message from the peer; returns whether it was adopted
    pub fn on_remote_message(&mut self, message: ChannelMessage) -> bool {
        match message {
            ChannelMessage::Start(state) => {
                let accept = self.state.as_ref().map_or(true, GameState::is_finished);
                if !accept {
                    warn!(
                        participant = %self.self_id,
                        "Dropping start message, a game is already in progress"
                    );
                    return false;
                }
                info!(participant = %self.self_id, using_x = %state.using_x, "Adopting remote start");
                self.adopt(Some(state));
                true
            }
            ChannelMessage::Move(state) => {
                debug!(participant = %self.self_id, whose_turn = %state.whose_turn, "Adopting remote move");
                self.adopt(Some(state));
                true
            }
        }
    }

    /// Decode and consume an inbound envelope
    pub fn on_envelope(&mut self, envelope: &Envelope) -> GameResult<bool> {
        let message = EventParser::parse(envelope)?;
        Ok(self.on_remote_message(message))
    }

    fn ignore(&self, rejection: MoveRejection) -> MoveOutcome {
        debug!(participant = %self.self_id, reason = %rejection, "Ignoring move request");
        MoveOutcome::Ignored(rejection)
    }

    fn publish(&self, message: ChannelMessage) -> GameResult<()> {
        let envelope = message.to_envelope(&self.self_id)?;
        self.channel
            .publish(envelope)
            .map_err(|e| e.with_context(&format!("publish {}", message.event_name())))
    }

    fn adopt(&mut self, next: Option<GameState>) {
        let was_finished = self.state.as_ref().map_or(false, GameState::is_finished);

        if let Some(state) = next.as_ref() {
            if state.is_finished() && !was_finished {
                info!(participant = %self.self_id, winner = %state.winner, "Game finished");
                // no receivers is fine
                let _ = self.outcomes.send(state.winner.clone());
            }
        }

        let view = next.as_ref().map(|state| GameView::project(state, &self.self_id));
        self.state = next;
        self.snapshots.send_replace(view);
    }
}
