//! In-process relay hosting any number of topics

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::error::{ChannelError, GameResult};
use crate::events::{ChannelEvent, Envelope, PresenceEvent, PresenceMeta};
use crate::game::ParticipantId;
use super::Channel;

/// One live subscription; `token` tells it apart from earlier ones under the
/// same identifier
#[derive(Debug)]
struct Subscriber {
    token: u64,
    sender: mpsc::UnboundedSender<ChannelEvent>,
}

#[derive(Debug, Default)]
struct Topic {
    subscribers: HashMap<ParticipantId, Subscriber>,
    presence: BTreeMap<ParticipantId, PresenceMeta>,
}

impl Topic {
    fn is_current(&self, participant: &ParticipantId, token: u64) -> bool {
        self.subscribers
            .get(participant)
            .map_or(false, |subscriber| subscriber.token == token)
    }

    fn keys(&self) -> BTreeSet<ParticipantId> {
        self.presence.keys().cloned().collect()
    }

    /// Deliver to every subscriber except `except`; returns subscribers whose
    /// receiver is gone
    fn fan_out(&self, event: &ChannelEvent, except: Option<&ParticipantId>) -> Vec<ParticipantId> {
        let mut dead = Vec::new();
        for (participant, subscriber) in &self.subscribers {
            if Some(participant) == except {
                continue;
            }
            if subscriber.sender.send(event.clone()).is_err() {
                dead.push(participant.clone());
            }
        }
        dead
    }

    fn announce_join(&mut self, key: &ParticipantId) {
        let mut dead = self.fan_out(&ChannelEvent::Presence(PresenceEvent::Join { key: key.clone() }), None);
        dead.extend(self.fan_out(&ChannelEvent::Presence(PresenceEvent::Sync { keys: self.keys() }), None));
        self.reap(dead);
    }

    fn announce_leave(&mut self, key: &ParticipantId) {
        let leave = PresenceEvent::Leave {
            key: key.clone(),
            remaining: self.presence.len(),
        };
        let mut dead = self.fan_out(&ChannelEvent::Presence(leave), None);
        dead.extend(self.fan_out(&ChannelEvent::Presence(PresenceEvent::Sync { keys: self.keys() }), None));
        self.reap(dead);
    }

    /// Drop subscribers whose receiver went away, as if they disconnected
    fn reap(&mut self, dead: Vec<ParticipantId>) {
        for participant in dead {
            if self.subscribers.remove(&participant).is_none() {
                continue;
            }
            debug!(participant = %participant, "Reaping disconnected subscriber");
            if self.presence.remove(&participant).is_some() {
                self.announce_leave(&participant);
            }
        }
    }
}

/// In-memory relay delivering presence and broadcast events between
/// subscribers of the same topic.
///
/// Each subscriber receives events in the order the relay accepted them, so
/// messages from one sender are always seen FIFO.
#[derive(Debug, Clone, Default)]
pub struct LocalRelay {
    topics: Arc<Mutex<HashMap<String, Topic>>>,
    next_token: Arc<AtomicU64>,
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `participant` to `topic`.
    ///
    /// Subscribing again under the same identifier replaces the earlier
    /// subscription: its event stream ends and its handle can no longer
    /// track, publish or unsubscribe anything.
    pub fn subscribe(
        &self,
        topic: &str,
        participant: &ParticipantId,
    ) -> (LocalChannel, mpsc::UnboundedReceiver<ChannelEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        {
            let mut topics = self.lock();
            let entry = topics.entry(topic.to_string()).or_default();
            let previous = entry.subscribers.insert(participant.clone(), Subscriber { token, sender });
            if previous.is_some() {
                warn!(topic = topic, participant = %participant, "Identifier already subscribed, replacing earlier subscription");
            }
        }
        debug!(topic = topic, participant = %participant, token, "Subscribed to topic");

        let channel = LocalChannel {
            relay: self.clone(),
            topic: topic.to_string(),
            participant: participant.clone(),
            token,
            closed: AtomicBool::new(false),
        };
        (channel, receiver)
    }

    /// Current presence set of a topic
    pub fn presence_state(&self, topic: &str) -> BTreeMap<ParticipantId, PresenceMeta> {
        self.lock()
            .get(topic)
            .map(|t| t.presence.clone())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.lock().get(topic).map(|t| t.subscribers.len()).unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Topic>> {
        self.topics.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A participant's handle on one [`LocalRelay`] topic
#[derive(Debug)]
pub struct LocalChannel {
    relay: LocalRelay,
    topic: String,
    participant: ParticipantId,
    token: u64,
    closed: AtomicBool,
}

impl LocalChannel {
    pub fn participant(&self) -> &ParticipantId {
        &self.participant
    }

    fn with_topic<T>(&self, f: impl FnOnce(&mut Topic) -> GameResult<T>) -> GameResult<T> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ChannelError::Closed { topic: self.topic.clone() }.into());
        }
        let mut topics = self.relay.lock();
        let topic = topics
            .get_mut(&self.topic)
            .filter(|t| t.is_current(&self.participant, self.token))
            .ok_or_else(|| ChannelError::NotSubscribed {
                topic: self.topic.clone(),
                participant: self.participant.to_string(),
            })?;
        f(topic)
    }
}

impl Channel for LocalChannel {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn track(&self, participant: &ParticipantId) -> GameResult<()> {
        self.with_topic(|topic| {
            topic.presence.insert(participant.clone(), PresenceMeta::now());
            topic.announce_join(participant);
            Ok(())
        })
    }

    fn untrack(&self, participant: &ParticipantId) -> GameResult<()> {
        self.with_topic(|topic| {
            if topic.presence.remove(participant).is_some() {
                topic.announce_leave(participant);
            }
            Ok(())
        })
    }

    fn publish(&self, envelope: Envelope) -> GameResult<()> {
        let participant = self.participant.clone();
        self.with_topic(|topic| {
            trace!(event = %envelope.event, id = %envelope.id, "Relaying broadcast");
            let dead = topic.fan_out(&ChannelEvent::Broadcast(envelope), Some(&participant));
            topic.reap(dead);
            Ok(())
        })
    }

    fn unsubscribe(&self) -> GameResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut topics = self.relay.lock();
        if let Some(topic) = topics.get_mut(&self.topic) {
            if !topic.is_current(&self.participant, self.token) {
                debug!(topic = %self.topic, participant = %self.participant, "Subscription already superseded");
                return Ok(());
            }
            topic.subscribers.remove(&self.participant);
            if topic.presence.remove(&self.participant).is_some() {
                topic.announce_leave(&self.participant);
            }
        }
        debug!(topic = %self.topic, participant = %self.participant, "Unsubscribed from topic");
        Ok(())
    }
}
