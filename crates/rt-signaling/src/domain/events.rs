//! Real-time boundary events.
//!
//! Frames on the wire are `{"event": <name>, "data": <payload>}`. Inbound
//! frames decode into [`ClientSignal`], outbound frames encode from
//! [`ServerEvent`]. Payload fields are camelCase.

use serde::{Deserialize, Serialize};

use super::entities::{
    CallKind, CallStatus, CallerInfo, ChannelId, ChatMessage, GroupId, GroupMessage, MessageId,
    Reaction, UserId,
};

/// Signals issued by a client connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientSignal {
    #[serde(rename = "call:request", rename_all = "camelCase")]
    CallRequest {
        receiver_id: UserId,
        channel_id: ChannelId,
        #[serde(alias = "callType")]
        call_kind: CallKind,
        #[serde(default)]
        caller_name: String,
        #[serde(default)]
        caller_avatar: Option<String>,
    },

    #[serde(rename = "call:accepted", rename_all = "camelCase")]
    CallAccepted { channel_id: ChannelId },

    #[serde(rename = "call:rejected", rename_all = "camelCase")]
    CallRejected { channel_id: ChannelId },

    #[serde(rename = "call:end", rename_all = "camelCase")]
    CallEnd {
        channel_id: ChannelId,
        #[serde(alias = "status")]
        terminal_status: CallStatus,
        #[serde(default, alias = "duration")]
        duration_seconds: u64,
    },

    #[serde(rename = "user:typing", rename_all = "camelCase")]
    UserTyping { receiver_id: UserId },

    #[serde(rename = "user:stop-typing", rename_all = "camelCase")]
    UserStopTyping { receiver_id: UserId },

    #[serde(rename = "group:join", rename_all = "camelCase")]
    GroupJoin { group_id: GroupId },

    #[serde(rename = "group:leave", rename_all = "camelCase")]
    GroupLeave { group_id: GroupId },

    #[serde(rename = "group:typing", rename_all = "camelCase")]
    GroupTyping { group_id: GroupId },

    #[serde(rename = "group:stop-typing", rename_all = "camelCase")]
    GroupStopTyping { group_id: GroupId },
}

impl ClientSignal {
    /// Wire name of the signal, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ClientSignal::CallRequest { .. } => "call:request",
            ClientSignal::CallAccepted { .. } => "call:accepted",
            ClientSignal::CallRejected { .. } => "call:rejected",
            ClientSignal::CallEnd { .. } => "call:end",
            ClientSignal::UserTyping { .. } => "user:typing",
            ClientSignal::UserStopTyping { .. } => "user:stop-typing",
            ClientSignal::GroupJoin { .. } => "group:join",
            ClientSignal::GroupLeave { .. } => "group:leave",
            ClientSignal::GroupTyping { .. } => "group:typing",
            ClientSignal::GroupStopTyping { .. } => "group:stop-typing",
        }
    }
}

/// Events pushed by the server to client connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    /// Full presence snapshot, sent on every registry mutation.
    #[serde(rename = "getOnlineUsers")]
    OnlineUsers(Vec<UserId>),

    #[serde(rename = "incomingCall", rename_all = "camelCase")]
    IncomingCall {
        caller_info: CallerInfo,
        channel_id: ChannelId,
        call_type: CallKind,
    },

    #[serde(rename = "callAccepted", rename_all = "camelCase")]
    CallAccepted { channel_id: ChannelId },

    #[serde(rename = "callCancelled")]
    CallCancelled { reason: String },

    #[serde(rename = "call:ended")]
    CallEnded {},

    #[serde(rename = "call:history_updated")]
    CallHistoryUpdated {},

    #[serde(rename = "newMessage")]
    NewMessage(ChatMessage),

    #[serde(rename = "messagesRead", rename_all = "camelCase")]
    MessagesRead { conversation_id: UserId },

    #[serde(rename = "conversationRead", rename_all = "camelCase")]
    ConversationRead { partner_id: UserId },

    #[serde(rename = "messageReaction", rename_all = "camelCase")]
    MessageReaction {
        message_id: MessageId,
        reactions: Vec<Reaction>,
    },

    #[serde(rename = "user:typing", rename_all = "camelCase")]
    UserTyping { sender_id: UserId },

    #[serde(rename = "user:stop-typing", rename_all = "camelCase")]
    UserStopTyping { sender_id: UserId },

    #[serde(rename = "group:typing", rename_all = "camelCase")]
    GroupTyping { group_id: GroupId, sender_id: UserId },

    #[serde(rename = "group:stop-typing", rename_all = "camelCase")]
    GroupStopTyping { group_id: GroupId, sender_id: UserId },

    #[serde(rename = "group:newMessage")]
    GroupNewMessage(GroupMessage),

    /// Reply to the issuing connection only.
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::OnlineUsers(_) => "getOnlineUsers",
            ServerEvent::IncomingCall { .. } => "incomingCall",
            ServerEvent::CallAccepted { .. } => "callAccepted",
            ServerEvent::CallCancelled { .. } => "callCancelled",
            ServerEvent::CallEnded {} => "call:ended",
            ServerEvent::CallHistoryUpdated {} => "call:history_updated",
            ServerEvent::NewMessage(_) => "newMessage",
            ServerEvent::MessagesRead { .. } => "messagesRead",
            ServerEvent::ConversationRead { .. } => "conversationRead",
            ServerEvent::MessageReaction { .. } => "messageReaction",
            ServerEvent::UserTyping { .. } => "user:typing",
            ServerEvent::UserStopTyping { .. } => "user:stop-typing",
            ServerEvent::GroupTyping { .. } => "group:typing",
            ServerEvent::GroupStopTyping { .. } => "group:stop-typing",
            ServerEvent::GroupNewMessage(_) => "group:newMessage",
            ServerEvent::Error { .. } => "error",
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Encode as a JSON text frame.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Where a typing indicator is relayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingScope {
    /// Direct chat: the single partner.
    Direct(UserId),
    /// Group chat: every room member except the sender.
    Group(GroupId),
}
