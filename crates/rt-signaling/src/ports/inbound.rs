//! # Inbound Port - SignalingApi
//!
//! Primary driving port exposing the signaling core to the transport
//! boundary.
//!
//! | Method | Driven by |
//! |--------|-----------|
//! | `connect` / `disconnect` | WebSocket upgrade and close |
//! | `handle_signal` | Inbound WebSocket frames |
//! | `send_message` / `mark_read` / `react` / `send_group_message` | HTTP message controllers |
//! | `online_users` / `call_history` / `conversation` | HTTP introspection |

use async_trait::async_trait;

use crate::domain::{
    CallLogEntry, ChatMessage, ClientSignal, ConnectionId, GroupMessage, MessagePayload,
    SignalingError, TransitionOutcome, UserId,
};
use crate::service::ConnectionMailbox;

/// Primary API of the signaling core.
///
/// # Example
///
/// ```rust,ignore
/// use rt_signaling::{ClientSignal, SignalingApi};
///
/// async fn example(api: &impl SignalingApi) {
///     let (conn, mut mailbox) = api.connect(Some("alice"));
///     api.handle_signal(conn, ClientSignal::GroupJoin { group_id: "g1".into() })
///         .await
///         .ok();
///     while let Some(event) = mailbox.recv().await {
///         println!("{}", event.name());
///     }
///     api.disconnect(conn);
/// }
/// ```
#[async_trait]
pub trait SignalingApi: Send + Sync {
    /// Attach a transport and register it under the normalized identity.
    ///
    /// Connections with a missing or sentinel identity are attached (they
    /// receive presence snapshots) but never registered.
    fn connect(&self, raw_identity: Option<&str>) -> (ConnectionId, ConnectionMailbox);

    /// Detach a transport. Drops room membership, unregisters it, and runs
    /// call cleanup when it was the user's last connection.
    fn disconnect(&self, connection_id: ConnectionId);

    /// Apply one client-issued signal.
    ///
    /// # Errors
    /// - `UnknownConnection`: the connection is not attached
    /// - `InvalidIdentity`: the connection has no registered identity
    /// - `DuplicateChannel`: a call record already exists for the channel
    async fn handle_signal(
        &self,
        connection_id: ConnectionId,
        signal: ClientSignal,
    ) -> Result<TransitionOutcome, SignalingError>;

    /// Persist a direct message and push it to the receiver.
    async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        payload: MessagePayload,
    ) -> Result<ChatMessage, SignalingError>;

    /// Mark the partner's messages to the reader as read and notify both.
    async fn mark_read(&self, reader_id: &str, partner_id: &str) -> Result<usize, SignalingError>;

    /// Toggle a reaction and notify both conversation parties.
    async fn react(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> Result<ChatMessage, SignalingError>;

    /// Persist a group message and push it to the room.
    async fn send_group_message(
        &self,
        group_id: &str,
        sender_id: &str,
        payload: MessagePayload,
    ) -> Result<GroupMessage, SignalingError>;

    /// Current presence snapshot, sorted.
    fn online_users(&self) -> Vec<UserId>;

    /// Persisted call history for a user.
    async fn call_history(&self, user_id: &str) -> Result<Vec<CallLogEntry>, SignalingError>;

    /// Persisted direct conversation between two users.
    async fn conversation(&self, a: &str, b: &str) -> Result<Vec<ChatMessage>, SignalingError>;
}
