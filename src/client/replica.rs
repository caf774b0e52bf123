//! Replica driver: one event loop per participant

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::channel::{Channel, LocalRelay};
use crate::config::DuetConfig;
use crate::error::{DuetError, GameResult};
use crate::events::{ChannelEvent, EventParser};
use crate::game::{ParticipantId, Winner};
use crate::membership::{MembershipSignal, MembershipTracker};
use super::synchronizer::{GameSynchronizer, MoveOutcome};
use super::view::GameView;

/// Local user intents fed into the replica's timeline
#[derive(Debug)]
enum Intent {
    Move(usize),
    PlayAgain(oneshot::Sender<GameResult<bool>>),
}

/// Single-consumer event loop combining membership tracking and game
/// synchronization for one participant.
///
/// Channel events and local intents are handled strictly one at a time, so
/// no locking is needed around the game state.
pub struct Replica<C> {
    tracker: MembershipTracker,
    synchronizer: GameSynchronizer<C>,
    events: mpsc::UnboundedReceiver<ChannelEvent>,
    intents: mpsc::UnboundedReceiver<Intent>,
    cancel: CancellationToken,
}

impl<C: Channel + 'static> Replica<C> {
    /// Spawn the event loop on the current tokio runtime.
    ///
    /// `channel` must already be subscribed and `events` must be its inbound
    /// stream. Presence is tracked once the loop starts.
    pub fn spawn(
        synchronizer: GameSynchronizer<C>,
        events: mpsc::UnboundedReceiver<ChannelEvent>,
    ) -> ReplicaHandle {
        let self_id = synchronizer.self_id().clone();
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let snapshots = synchronizer.subscribe();
        let outcomes = synchronizer.outcome_sender();

        let replica = Replica {
            tracker: MembershipTracker::new(self_id.clone()),
            synchronizer,
            events,
            intents: intent_rx,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(replica.run());

        ReplicaHandle {
            self_id,
            intents: intent_tx,
            snapshots,
            outcomes,
            cancel,
            task,
        }
    }

    async fn run(mut self) -> GameResult<()> {
        self.tracker.track(self.synchronizer.channel())?;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(participant = %self.tracker.self_id(), "Replica cancelled");
                    break;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        warn!(participant = %self.tracker.self_id(), "Channel closed underneath replica");
                        break;
                    }
                },
                intent = self.intents.recv() => match intent {
                    Some(intent) => self.handle_intent(intent),
                    None => {
                        debug!(participant = %self.tracker.self_id(), "All handles dropped");
                        break;
                    }
                },
            }
        }

        self.shutdown()
    }

    fn handle_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Presence(presence) => {
                let signal = self.tracker.on_presence(&presence, self.synchronizer.has_game());
                match signal {
                    Some(MembershipSignal::PairFormed { opponent }) => {
                        if let Err(e) = self.synchronizer.on_pair_formed(&opponent) {
                            warn!(error = %e, "Failed to originate game");
                        }
                    }
                    Some(MembershipSignal::PeerLeft) => self.synchronizer.on_peer_left(),
                    None => {}
                }
            }
            ChannelEvent::Broadcast(envelope) => {
                if !EventParser::is_game_event(&envelope) {
                    debug!(event = %envelope.event, "Ignoring non-game broadcast");
                    return;
                }
                if let Err(e) = self.synchronizer.on_envelope(&envelope) {
                    warn!(
                        sender = %envelope.sender,
                        event = %envelope.event,
                        error = %e,
                        "Dropping malformed broadcast"
                    );
                }
            }
        }
    }

    fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Move(index) => match self.synchronizer.request_move(index) {
                Ok(MoveOutcome::Applied(_)) | Ok(MoveOutcome::Ignored(_)) => {}
                Err(e) => warn!(cell = index, error = %e, "Move applied locally but not published"),
            },
            Intent::PlayAgain(reply) => {
                let result = self.synchronizer.play_again().map(|state| state.is_some());
                // caller may have given up waiting
                let _ = reply.send(result);
            }
        }
    }

    fn shutdown(self) -> GameResult<()> {
        let channel = self.synchronizer.channel();
        if let Err(e) = self.tracker.untrack(channel) {
            warn!(error = %e, "Failed to retract presence");
        }
        channel.unsubscribe()?;
        info!(participant = %self.tracker.self_id(), "Replica stopped");
        Ok(())
    }
}

/// Presentation-side handle on a running replica
#[derive(Debug)]
pub struct ReplicaHandle {
    self_id: ParticipantId,
    intents: mpsc::UnboundedSender<Intent>,
    snapshots: watch::Receiver<Option<GameView>>,
    outcomes: broadcast::Sender<Winner>,
    cancel: CancellationToken,
    task: JoinHandle<GameResult<()>>,
}

impl ReplicaHandle {
    pub fn id(&self) -> &ParticipantId {
        &self.self_id
    }

    /// Ask to mark cell `index` (0..=8). Invalid requests are ignored by the
    /// replica; this only fails once the replica has stopped.
    pub fn request_move(&self, index: usize) -> GameResult<()> {
        self.intents
            .send(Intent::Move(index))
            .map_err(|_| DuetError::ReplicaStopped)
    }

    /// Ask for a rematch against the current opponent.
    ///
    /// `Ok(false)` means the current game is still running and nothing happened.
    pub async fn request_play_again(&self) -> GameResult<bool> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.intents
            .send(Intent::PlayAgain(reply_tx))
            .map_err(|_| DuetError::ReplicaStopped)?;
        reply_rx.await.map_err(|_| DuetError::ReplicaStopped)?
    }

    /// Stream of snapshots, one per state change
    pub fn snapshots(&self) -> watch::Receiver<Option<GameView>> {
        self.snapshots.clone()
    }

    pub fn current(&self) -> Option<GameView> {
        self.snapshots.borrow().clone()
    }

    /// Winners of games as they finish
    pub fn outcomes(&self) -> broadcast::Receiver<Winner> {
        self.outcomes.subscribe()
    }

    /// Stop the replica, retracting presence so the peer sees a leave
    pub async fn leave(self) -> GameResult<()> {
        self.cancel.cancel();
        self.task.await.map_err(|_| DuetError::ReplicaStopped)?
    }
}

/// Subscribe to `relay` with the configured topic and start a replica
pub fn connect(relay: &LocalRelay, self_id: ParticipantId, config: &DuetConfig) -> GameResult<ReplicaHandle> {
    config.validate()?;
    let (channel, events) = relay.subscribe(&config.channel.topic, &self_id);
    let synchronizer = GameSynchronizer::new(self_id, channel, config.game.origination);
    Ok(Replica::spawn(synchronizer, events))
}
