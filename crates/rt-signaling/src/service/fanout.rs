//! Event fanout hub.
//!
//! Every attached connection is an actor with a bounded mailbox. The hub
//! keeps the sending half; the transport's writer task drains the receiving
//! half ([`ConnectionMailbox`]). Delivery uses `try_send` and never awaits,
//! so a slow or vanished peer can't stall the signal that triggered it.

use dashmap::DashMap;
use std::collections::HashSet;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_stream::Stream;
use tracing::{debug, warn};

use crate::domain::{ConnectionId, ConnectionRegistry, ServerEvent, UserId};

/// Delivery counters.
#[derive(Debug, Default)]
pub struct FanoutStats {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl FanoutStats {
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Receiving half of a connection's mailbox.
#[derive(Debug)]
pub struct ConnectionMailbox {
    connection_id: ConnectionId,
    receiver: mpsc::Receiver<ServerEvent>,
}

impl ConnectionMailbox {
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Wait for the next event.
    ///
    /// Returns `None` once the connection is detached and the mailbox drained.
    pub async fn recv(&mut self) -> Option<ServerEvent> {
        self.receiver.recv().await
    }

    /// Next event if one is queued.
    pub fn try_recv(&mut self) -> Option<ServerEvent> {
        self.receiver.try_recv().ok()
    }

    /// Drain everything currently queued.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.try_recv() {
            events.push(event);
        }
        events
    }
}

impl Stream for ConnectionMailbox {
    type Item = ServerEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

#[derive(Debug)]
struct Transport {
    user_id: Option<UserId>,
    sender: mpsc::Sender<ServerEvent>,
}

/// Delivers events to every live connection of a user, a room, or everyone.
#[derive(Debug)]
pub struct EventFanout {
    registry: Arc<ConnectionRegistry>,
    transports: DashMap<ConnectionId, Transport>,
    mailbox_capacity: usize,
    stats: FanoutStats,
}

impl EventFanout {
    pub fn new(registry: Arc<ConnectionRegistry>, mailbox_capacity: usize) -> Self {
        Self {
            registry,
            transports: DashMap::new(),
            mailbox_capacity: mailbox_capacity.max(1),
            stats: FanoutStats::default(),
        }
    }

    /// Open a mailbox for a new transport.
    pub fn attach(&self, user_id: Option<UserId>) -> (ConnectionId, ConnectionMailbox) {
        let connection_id = ConnectionId::new();
        let (sender, receiver) = mpsc::channel(self.mailbox_capacity);
        self.transports
            .insert(connection_id, Transport { user_id, sender });
        (
            connection_id,
            ConnectionMailbox {
                connection_id,
                receiver,
            },
        )
    }

    /// Close a transport's mailbox.
    ///
    /// Returns the identity it was attached with, or `None` if it was not
    /// attached. The outer `Option` distinguishes the two.
    pub fn detach(&self, connection_id: &ConnectionId) -> Option<Option<UserId>> {
        self.transports
            .remove(connection_id)
            .map(|(_, transport)| transport.user_id)
    }

    pub fn is_attached(&self, connection_id: &ConnectionId) -> bool {
        self.transports.contains_key(connection_id)
    }

    /// Identity a transport was attached with.
    pub fn user_of(&self, connection_id: &ConnectionId) -> Option<Option<UserId>> {
        self.transports
            .get(connection_id)
            .map(|transport| transport.user_id.clone())
    }

    /// Deliver to every connection the registry lists for `user_id`.
    ///
    /// Returns the number of mailboxes that accepted the event. Zero
    /// connections is a silent no-op.
    pub fn emit_to_user(&self, user_id: &str, event: &ServerEvent) -> usize {
        let connections = self.registry.connections_of(user_id);
        if connections.is_empty() {
            debug!(user_id = %user_id, event = event.name(), "User offline, event dropped");
            return 0;
        }
        self.emit_to_connections(&connections, event)
    }

    /// Deliver to a set of connections.
    pub fn emit_to_connections(
        &self,
        connections: &HashSet<ConnectionId>,
        event: &ServerEvent,
    ) -> usize {
        connections
            .iter()
            .filter(|connection_id| self.emit_to_connection(connection_id, event))
            .count()
    }

    /// Deliver to one connection. Returns `false` if it was dropped.
    pub fn emit_to_connection(&self, connection_id: &ConnectionId, event: &ServerEvent) -> bool {
        let sender = match self.transports.get(connection_id) {
            Some(transport) => transport.sender.clone(),
            None => {
                debug!(connection_id = %connection_id, event = event.name(), "Connection gone, event dropped");
                return false;
            }
        };

        match sender.try_send(event.clone()) {
            Ok(()) => {
                self.stats.record_delivered();
                true
            }
            Err(TrySendError::Full(_)) => {
                self.stats.record_dropped();
                warn!(
                    connection_id = %connection_id,
                    event = event.name(),
                    "Mailbox full, event dropped"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.stats.record_dropped();
                debug!(connection_id = %connection_id, event = event.name(), "Mailbox closed, event dropped");
                false
            }
        }
    }

    /// Deliver to every attached transport, registered or not.
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        let connections: HashSet<ConnectionId> =
            self.transports.iter().map(|t| *t.key()).collect();
        self.emit_to_connections(&connections, event)
    }

    pub fn transport_count(&self) -> usize {
        self.transports.len()
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn stats(&self) -> &FanoutStats {
        &self.stats
    }
}
