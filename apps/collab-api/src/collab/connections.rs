//! Connection lookup table used to push events to live WebSocket connections.
//!
//! Each connection owns a bounded queue; the coordinator only ever enqueues,
//! so fan-out never waits on a slow socket.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use nuvia_common::id::{prefix, prefixed_ulid};

use super::error::CollabError;
use super::events::ServerEvent;

/// Outbound half of the transport, as seen by the coordinator.
pub trait EventSink: Send + Sync {
    /// Hand `event` to the connection's queue without blocking.
    fn deliver(&self, connection_id: &str, event: Arc<ServerEvent>) -> Result<(), CollabError>;
}

/// Registry of live connections and their outbound queues.
pub struct ConnectionTable {
    senders: DashMap<String, mpsc::Sender<Arc<ServerEvent>>>,
    capacity: usize,
}

impl ConnectionTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            senders: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Mint a connection ID and its outbound queue.
    pub fn register(&self) -> (String, mpsc::Receiver<Arc<ServerEvent>>) {
        let connection_id = prefixed_ulid(prefix::CONNECTION);
        let rx = self.register_as(&connection_id);
        (connection_id, rx)
    }

    /// Register a connection under a caller-chosen ID, replacing any previous queue.
    pub fn register_as(&self, connection_id: &str) -> mpsc::Receiver<Arc<ServerEvent>> {
        let (tx, rx) = mpsc::channel(self.capacity);
        self.senders.insert(connection_id.to_string(), tx);
        rx
    }

    pub fn unregister(&self, connection_id: &str) {
        self.senders.remove(connection_id);
    }

    pub fn is_registered(&self, connection_id: &str) -> bool {
        self.senders.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }
}

impl EventSink for ConnectionTable {
    fn deliver(&self, connection_id: &str, event: Arc<ServerEvent>) -> Result<(), CollabError> {
        let failure = |reason: &str| CollabError::TransportFailure {
            connection_id: connection_id.to_string(),
            reason: reason.to_string(),
        };

        let sender = self
            .senders
            .get(connection_id)
            .ok_or_else(|| failure("connection not registered"))?;

        match sender.try_send(event) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(failure("outbound queue full")),
            Err(TrySendError::Closed(_)) => Err(failure("connection closed")),
        }
    }
}
