//! Subscriber registry for state-change broadcasts.
//!
//! Maps a stable connection identifier to that connection's outbound sink.
//! Membership is keyed by the identifier, never by sink identity, so a
//! connection appears at most once no matter how often it subscribes.
//!
//! The map sits behind its own mutex, independent of the room state lock.
//! The lock is never held across an await point or while writing to a sink:
//! [`SubscriberRegistry::publish`] copies the sinks out first and delivers to
//! the copy.

use std::{
    collections::HashMap,
    fmt,
    net::SocketAddr,
    sync::{Mutex, MutexGuard, PoisonError},
};

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::SinkError;

/// Stable identifier of one connection (remote `address:port`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create an identifier from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<SocketAddr> for ConnectionId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sending half of a connection's outbound line queue.
///
/// Only the owning connection handler drains the queue and writes to the
/// socket. Everyone else (broadcasts) enqueues without blocking.
#[derive(Debug, Clone)]
pub struct LineSink {
    tx: mpsc::Sender<String>,
}

impl LineSink {
    /// Create a sink and the receiver its handler drains.
    ///
    /// `capacity` is clamped to at least one slot.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Queue a line without waiting.
    pub fn try_send(&self, line: String) -> Result<(), SinkError> {
        self.tx.try_send(line).map_err(|e| match e {
            TrySendError::Full(_) => SinkError::Full,
            TrySendError::Closed(_) => SinkError::Closed,
        })
    }

    /// Whether the receiving handler has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Outcome of one [`SubscriberRegistry::publish`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Sinks the line was queued on
    pub delivered: usize,
    /// Sinks that were closed or full
    pub failed: usize,
}

/// Set of connections subscribed to state-change broadcasts.
#[derive(Debug, Default)]
pub struct SubscriberRegistry {
    /// Connection ID → outbound sink
    subscribers: Mutex<HashMap<ConnectionId, LineSink>>,
}

impl SubscriberRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a connection.
    ///
    /// Returns `false` if it was already subscribed; the existing entry is
    /// kept and nothing is duplicated.
    pub fn subscribe(&self, id: ConnectionId, sink: LineSink) -> bool {
        let mut subscribers = self.lock();
        if subscribers.contains_key(&id) {
            return false;
        }
        subscribers.insert(id, sink);
        true
    }

    /// Unsubscribe a connection.
    ///
    /// Returns `true` if it was subscribed and is now removed. Removing an
    /// absent connection is a no-op, so racing disconnect and unsubscribe
    /// paths remove the entry exactly once between them.
    pub fn unsubscribe(&self, id: &ConnectionId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Check if a connection is subscribed.
    pub fn is_subscribed(&self, id: &ConnectionId) -> bool {
        self.lock().contains_key(id)
    }

    /// Number of subscribed connections.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Point-in-time copy of the subscriber set.
    pub fn snapshot(&self) -> Vec<(ConnectionId, LineSink)> {
        self.lock().iter().map(|(id, sink)| (id.clone(), sink.clone())).collect()
    }

    /// Queue `line` on every subscriber's sink.
    ///
    /// Delivery is best-effort. A closed or full sink is logged and skipped;
    /// its entry stays until the owning handler's cleanup removes it.
    pub fn publish(&self, line: &str) -> PublishReport {
        let mut report = PublishReport::default();

        for (id, sink) in self.snapshot() {
            match sink.try_send(line.to_string()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(connection = %id, "broadcast delivery failed: {}", e);
                    report.failed += 1;
                },
            }
        }

        report
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ConnectionId, LineSink>> {
        // Critical sections are single map operations; a poisoned map is
        // still consistent.
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
