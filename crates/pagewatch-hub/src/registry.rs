use pagewatch_core::{HubMsg, InterestFilter};
use std::collections::{hash_map::Entry, HashMap};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::Instant;

/// Identity plus outbound queue of one attached tab.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    conn_id: String,
    outbound: mpsc::Sender<HubMsg>,
}

impl PeerHandle {
    pub fn new(conn_id: impl Into<String>, outbound: mpsc::Sender<HubMsg>) -> Self {
        Self {
            conn_id: conn_id.into(),
            outbound,
        }
    }

    pub fn conn_id(&self) -> &str {
        &self.conn_id
    }

    /// Never waits: a full queue hands the message back as `TrySendError::Full`.
    pub fn try_send(&self, msg: HubMsg) -> Result<(), TrySendError<HubMsg>> {
        self.outbound.try_send(msg)
    }
}

#[derive(Debug)]
pub struct Subscriber {
    pub peer: PeerHandle,
    pub filter: InterestFilter,
    pub attached_at: Instant,
    pub last_ping_sent_at: Instant,
    pub last_pong_received_at: Instant,
}

impl Subscriber {
    pub fn conn_id(&self) -> &str {
        self.peer.conn_id()
    }

    /// Alive iff the most recent sweep ping has been answered.
    pub fn is_alive(&self) -> bool {
        self.last_pong_received_at >= self.last_ping_sent_at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("subscriber already attached: {conn_id}")]
    DuplicateSubscriber { conn_id: String },
}

#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub alive: Vec<PeerHandle>,
    pub evicted: Vec<Subscriber>,
}

#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    entries: HashMap<String, Subscriber>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(
        &mut self,
        peer: PeerHandle,
        filter: InterestFilter,
        now: Instant,
    ) -> Result<&Subscriber, RegistryError> {
        match self.entries.entry(peer.conn_id.clone()) {
            Entry::Occupied(existing) => Err(RegistryError::DuplicateSubscriber {
                conn_id: existing.key().clone(),
            }),
            Entry::Vacant(slot) => Ok(slot.insert(Subscriber {
                peer,
                filter,
                attached_at: now,
                last_ping_sent_at: now,
                last_pong_received_at: now,
            })),
        }
    }

    /// Returns false for unknown handles; late pongs from evicted tabs land here.
    pub fn record_pong(&mut self, conn_id: &str, now: Instant) -> bool {
        match self.entries.get_mut(conn_id) {
            Some(subscriber) => {
                subscriber.last_pong_received_at = now;
                true
            }
            None => false,
        }
    }

    pub fn detach(&mut self, conn_id: &str) -> Option<Subscriber> {
        self.entries.remove(conn_id)
    }

    /// Stamps the ping that was just queued for `conn_id`.
    pub fn record_ping(&mut self, conn_id: &str, now: Instant) -> bool {
        match self.entries.get_mut(conn_id) {
            Some(subscriber) => {
                subscriber.last_ping_sent_at = now;
                true
            }
            None => false,
        }
    }

    /// Removes subscribers that missed the previous ping. Survivors are not
    /// re-armed here; the caller does that per delivered ping.
    pub fn sweep(&mut self) -> SweepOutcome {
        let dead = self
            .entries
            .iter()
            .filter(|(_, subscriber)| !subscriber.is_alive())
            .map(|(conn_id, _)| conn_id.clone())
            .collect::<Vec<_>>();
        let evicted = dead
            .iter()
            .filter_map(|conn_id| self.entries.remove(conn_id))
            .collect();
        let alive = self
            .entries
            .values()
            .map(|subscriber| subscriber.peer.clone())
            .collect();
        SweepOutcome { alive, evicted }
    }

    pub fn all(&self) -> impl Iterator<Item = &Subscriber> {
        self.entries.values()
    }

    pub fn get(&self, conn_id: &str) -> Option<&Subscriber> {
        self.entries.get(conn_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
