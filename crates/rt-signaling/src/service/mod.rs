//! # Signaling Service
//!
//! Composes the registry, fanout hub, presence broadcaster, call state
//! machine, message sync, and typing relay behind [`SignalingApi`].
//!
//! ## Disconnect ordering
//!
//! 1. Detach the transport (no further deliveries to it)
//! 2. Leave every group room
//! 3. Unregister from the connection registry
//! 4. Announce presence if the registry changed
//! 5. If that was the user's last connection, clean up their calls

pub mod calls;
pub mod fanout;
pub mod messaging;
pub mod presence;
pub mod typing;

pub use calls::{CallRequest, CallSignaling};
pub use fanout::{ConnectionMailbox, EventFanout, FanoutStats};
pub use messaging::MessageSync;
pub use presence::PresenceBroadcaster;
pub use typing::TypingRelay;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::{Arc, Weak};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapters::{InMemoryCallLog, InMemoryMessageStore};
use crate::domain::{
    normalize_identity, require_identity, CallLogEntry, ChatMessage, ClientSignal, ConnectionId,
    ConnectionRegistry, GroupMessage, MessagePayload, RoomDirectory, ServerEvent, SignalingConfig,
    SignalingError, TransitionOutcome, TypingScope, UnregisterOutcome, UserId,
};
use crate::ports::{CallLogStore, MessageStore, SignalingApi, SystemTimeSource, TimeSource};

/// Point-in-time counters for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalingStats {
    pub connections: usize,
    pub online_users: usize,
    pub active_calls: usize,
    pub rooms: usize,
    pub events_delivered: u64,
    pub events_dropped: u64,
}

/// The signaling core.
pub struct SignalingService {
    config: SignalingConfig,
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomDirectory>,
    fanout: Arc<EventFanout>,
    presence: PresenceBroadcaster,
    calls: CallSignaling,
    messaging: MessageSync,
    typing: TypingRelay,
    call_log: Arc<dyn CallLogStore>,
}

impl SignalingService {
    pub fn new(
        config: SignalingConfig,
        call_log: Arc<dyn CallLogStore>,
        message_store: Arc<dyn MessageStore>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomDirectory::new());
        let fanout = Arc::new(EventFanout::new(
            Arc::clone(&registry),
            config.mailbox_capacity,
        ));

        Self {
            presence: PresenceBroadcaster::new(Arc::clone(&fanout)),
            calls: CallSignaling::new(Arc::clone(&fanout), Arc::clone(&call_log), clock),
            messaging: MessageSync::new(
                Arc::clone(&fanout),
                Arc::clone(&rooms),
                message_store,
                config.conversation_read_echo,
            ),
            typing: TypingRelay::new(Arc::clone(&fanout), Arc::clone(&rooms)),
            config,
            registry,
            rooms,
            fanout,
            call_log,
        }
    }

    /// Standalone service backed by the in-memory collaborators.
    pub fn in_memory(config: SignalingConfig) -> Self {
        let clock: Arc<dyn TimeSource> = Arc::new(SystemTimeSource);
        Self::new(
            config,
            Arc::new(InMemoryCallLog::with_clock(Arc::clone(&clock))),
            Arc::new(InMemoryMessageStore::with_clock(Arc::clone(&clock))),
            clock,
        )
    }

    pub fn config(&self) -> &SignalingConfig {
        &self.config
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn calls(&self) -> &CallSignaling {
        &self.calls
    }

    pub fn messaging(&self) -> &MessageSync {
        &self.messaging
    }

    /// Deliver an event to one connection only (e.g. an `error` reply).
    pub fn emit_to_connection(&self, connection_id: &ConnectionId, event: &ServerEvent) -> bool {
        self.fanout.emit_to_connection(connection_id, event)
    }

    /// Deliver an event to every connection of a user.
    pub fn emit_to_user(&self, user_id: &str, event: &ServerEvent) -> usize {
        self.fanout.emit_to_user(user_id, event)
    }

    pub fn stats(&self) -> SignalingStats {
        let fanout_stats = self.fanout.stats();
        SignalingStats {
            connections: self.fanout.transport_count(),
            online_users: self.registry.user_count(),
            active_calls: self.calls.active_calls(),
            rooms: self.rooms.room_count(),
            events_delivered: fanout_stats.delivered(),
            events_dropped: fanout_stats.dropped(),
        }
    }

    /// Start the ring-timeout sweeper if a ring timeout is configured.
    ///
    /// The task holds only a weak reference and exits once the service is
    /// dropped. Abort the handle to stop it earlier.
    pub fn spawn_ring_sweeper(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let ttl = self.config.ring_timeout_duration()?;
        let period = self.config.sweep_interval_duration();
        let weak: Weak<Self> = Arc::downgrade(self);

        info!(
            ring_timeout_secs = ttl.as_secs(),
            sweep_interval_secs = period.as_secs(),
            "Starting ring sweeper"
        );

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                let Some(service) = weak.upgrade() else {
                    break;
                };
                let swept = service.calls.sweep_expired(ttl).await;
                if swept > 0 {
                    debug!(swept = swept, "Swept unanswered calls");
                }
            }
        }))
    }

    /// Tear down the user's calls unless a new connection registered since
    /// the unregister that took them offline.
    fn end_calls_if_offline(&self, user_id: &str) -> usize {
        if self.registry.is_online(user_id) {
            debug!(user_id = %user_id, "User reconnected, keeping calls");
            return 0;
        }
        self.calls.on_user_offline(user_id)
    }

    /// Join a room, undoing it if the connection detached meanwhile.
    ///
    /// `disconnect` detaches before `leave_all`, so a join that lands after
    /// the sweep always sees the connection gone.
    fn join_room(&self, group_id: &str, connection_id: ConnectionId) -> TransitionOutcome {
        if !self.rooms.join(group_id, connection_id) {
            return TransitionOutcome::NoOp;
        }
        if !self.fanout.is_attached(&connection_id) {
            self.rooms.leave(group_id, &connection_id);
            debug!(connection_id = %connection_id, group_id = %group_id, "Join raced disconnect, undone");
            return TransitionOutcome::NoOp;
        }
        TransitionOutcome::Applied
    }

    fn identity_of(&self, connection_id: &ConnectionId) -> Result<UserId, SignalingError> {
        match self.fanout.user_of(connection_id) {
            None => Err(SignalingError::UnknownConnection(*connection_id)),
            Some(None) => Err(SignalingError::InvalidIdentity),
            Some(Some(user_id)) => Ok(user_id),
        }
    }
}

#[async_trait]
impl SignalingApi for SignalingService {
    fn connect(&self, raw_identity: Option<&str>) -> (ConnectionId, ConnectionMailbox) {
        let user_id = normalize_identity(raw_identity);
        let (connection_id, mailbox) = self.fanout.attach(user_id.clone());

        match user_id {
            Some(user_id) => {
                info!(user_id = %user_id, connection_id = %connection_id, "Client connected");
                if self.registry.register(&user_id, connection_id) {
                    self.presence.announce();
                }
            }
            None => {
                warn!(
                    connection_id = %connection_id,
                    raw_identity = ?raw_identity,
                    "Connection without valid identity, not registered"
                );
                // Nothing changed, so only this connection needs a snapshot.
                self.fanout.emit_to_connection(
                    &connection_id,
                    &ServerEvent::OnlineUsers(self.presence.snapshot()),
                );
            }
        }

        (connection_id, mailbox)
    }

    fn disconnect(&self, connection_id: ConnectionId) {
        let Some(user_id) = self.fanout.detach(&connection_id) else {
            debug!(connection_id = %connection_id, "Disconnect for unknown connection");
            return;
        };

        self.rooms.leave_all(&connection_id);

        let Some(user_id) = user_id else {
            debug!(connection_id = %connection_id, "Anonymous connection closed");
            return;
        };

        let outcome = self.registry.unregister(&user_id, &connection_id);
        info!(
            user_id = %user_id,
            connection_id = %connection_id,
            outcome = ?outcome,
            "Client disconnected"
        );

        if outcome.mutated() {
            self.presence.announce();
        }
        if outcome == UnregisterOutcome::WentOffline {
            self.end_calls_if_offline(&user_id);
        }
    }

    async fn handle_signal(
        &self,
        connection_id: ConnectionId,
        signal: ClientSignal,
    ) -> Result<TransitionOutcome, SignalingError> {
        let user_id = self.identity_of(&connection_id)?;
        debug!(
            user_id = %user_id,
            connection_id = %connection_id,
            signal = signal.name(),
            "Signal received"
        );

        let outcome = match signal {
            ClientSignal::CallRequest {
                receiver_id,
                channel_id,
                call_kind,
                caller_name,
                caller_avatar,
            } => self.calls.request(
                &user_id,
                CallRequest {
                    channel_id,
                    receiver_id,
                    kind: call_kind,
                    caller_name,
                    caller_avatar,
                },
            )?,
            ClientSignal::CallAccepted { channel_id } => self.calls.accept(&user_id, &channel_id),
            ClientSignal::CallRejected { channel_id } => {
                self.calls.reject(&user_id, &channel_id).await
            }
            ClientSignal::CallEnd {
                channel_id,
                terminal_status,
                duration_seconds,
            } => {
                self.calls
                    .end(&user_id, &channel_id, terminal_status, duration_seconds)
                    .await
            }
            ClientSignal::UserTyping { receiver_id } => {
                let receiver_id = require_identity(&receiver_id, "receiverId")?;
                self.typing
                    .set_typing(&TypingScope::Direct(receiver_id), &user_id, true);
                TransitionOutcome::Applied
            }
            ClientSignal::UserStopTyping { receiver_id } => {
                let receiver_id = require_identity(&receiver_id, "receiverId")?;
                self.typing
                    .set_typing(&TypingScope::Direct(receiver_id), &user_id, false);
                TransitionOutcome::Applied
            }
            ClientSignal::GroupJoin { group_id } => self.join_room(&group_id, connection_id),
            ClientSignal::GroupLeave { group_id } => {
                if self.rooms.leave(&group_id, &connection_id) {
                    TransitionOutcome::Applied
                } else {
                    TransitionOutcome::NoOp
                }
            }
            ClientSignal::GroupTyping { group_id } => {
                self.typing
                    .set_typing(&TypingScope::Group(group_id), &user_id, true);
                TransitionOutcome::Applied
            }
            ClientSignal::GroupStopTyping { group_id } => {
                self.typing
                    .set_typing(&TypingScope::Group(group_id), &user_id, false);
                TransitionOutcome::Applied
            }
        };

        Ok(outcome)
    }

    async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        payload: MessagePayload,
    ) -> Result<ChatMessage, SignalingError> {
        self.messaging
            .send_message(sender_id, receiver_id, payload)
            .await
    }

    async fn mark_read(&self, reader_id: &str, partner_id: &str) -> Result<usize, SignalingError> {
        self.messaging.mark_read(reader_id, partner_id).await
    }

    async fn react(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> Result<ChatMessage, SignalingError> {
        self.messaging.react(message_id, user_id, emoji).await
    }

    async fn send_group_message(
        &self,
        group_id: &str,
        sender_id: &str,
        payload: MessagePayload,
    ) -> Result<GroupMessage, SignalingError> {
        self.messaging
            .send_group_message(group_id, sender_id, payload)
            .await
    }

    fn online_users(&self) -> Vec<UserId> {
        self.presence.snapshot()
    }

    async fn call_history(&self, user_id: &str) -> Result<Vec<CallLogEntry>, SignalingError> {
        Ok(self.call_log.history(user_id).await?)
    }

    async fn conversation(&self, a: &str, b: &str) -> Result<Vec<ChatMessage>, SignalingError> {
        self.messaging.conversation(a, b).await
    }
}
