//! Core entities: identities, call records, persisted messages and call logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::errors::SignalingError;

/// Logical user identity, as issued by the external auth collaborator.
pub type UserId = String;

/// Caller-chosen call identifier, unique per call attempt.
pub type ChannelId = String;

/// Group (room) identifier.
pub type GroupId = String;

/// Persisted message identifier.
pub type MessageId = String;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// Sentinel strings that transports send when the client had no identity.
const IDENTITY_SENTINELS: [&str; 2] = ["undefined", "null"];

/// Normalize an untrusted identity from handshake metadata.
///
/// Returns `None` for missing, blank, `"undefined"` and `"null"` values.
pub fn normalize_identity(raw: Option<&str>) -> Option<UserId> {
    let trimmed = raw?.trim();
    if is_valid_identity(trimmed) {
        Some(trimmed.to_string())
    } else {
        None
    }
}

/// Normalize an identity carried in a signal or request payload.
///
/// Same rules as [`normalize_identity`]; a rejected value is reported as an
/// invalid `field`.
pub fn require_identity(raw: &str, field: &str) -> Result<UserId, SignalingError> {
    normalize_identity(Some(raw))
        .ok_or_else(|| SignalingError::InvalidPayload(format!("invalid {field}")))
}

/// Whether `id` is usable as a registry key.
pub fn is_valid_identity(id: &str) -> bool {
    let id = id.trim();
    !id.is_empty()
        && !IDENTITY_SENTINELS
            .iter()
            .any(|sentinel| id.eq_ignore_ascii_case(sentinel))
}

/// Identifier of one live transport session.
///
/// UUID v7, so connection ids sort by creation time in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generate a fresh connection id.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parse from string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConnectionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Media kind of a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallKind {
    Audio,
    Video,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Audio => "audio",
            CallKind::Video => "video",
        }
    }
}

impl fmt::Display for CallKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final outcome recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Answered,
    Missed,
    Rejected,
    Busy,
    Unavailable,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Answered => "answered",
            CallStatus::Missed => "missed",
            CallStatus::Rejected => "rejected",
            CallStatus::Busy => "busy",
            CallStatus::Unavailable => "unavailable",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live (non-terminal) phase of a call record.
///
/// Terminal phases are never stored: reaching one removes the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallState {
    Ringing,
    Connected,
}

/// Ephemeral bookkeeping for one in-progress call attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallRecord {
    pub channel_id: ChannelId,
    pub caller: UserId,
    pub receiver: UserId,
    pub kind: CallKind,
    pub state: CallState,
    pub created_at: Timestamp,
}

impl CallRecord {
    /// New record in the RINGING phase.
    pub fn ringing(
        channel_id: impl Into<ChannelId>,
        caller: impl Into<UserId>,
        receiver: impl Into<UserId>,
        kind: CallKind,
        created_at: Timestamp,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            caller: caller.into(),
            receiver: receiver.into(),
            kind,
            state: CallState::Ringing,
            created_at,
        }
    }

    /// Whether `user` is the caller or the receiver.
    pub fn involves(&self, user: &str) -> bool {
        self.caller == user || self.receiver == user
    }

    /// The other party, if `user` is one of the two.
    pub fn counterpart(&self, user: &str) -> Option<&UserId> {
        if self.caller == user {
            Some(&self.receiver)
        } else if self.receiver == user {
            Some(&self.caller)
        } else {
            None
        }
    }

    pub fn is_ringing(&self) -> bool {
        self.state == CallState::Ringing
    }
}

/// Caller identity shown on the receiving side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerInfo {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// Write contract of the persisted call log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCallLog {
    pub caller: UserId,
    pub receiver: UserId,
    pub kind: CallKind,
    pub status: CallStatus,
    pub duration_secs: u64,
}

impl NewCallLog {
    pub fn from_record(record: &CallRecord, status: CallStatus, duration_secs: u64) -> Self {
        Self {
            caller: record.caller.clone(),
            receiver: record.receiver.clone(),
            kind: record.kind,
            status,
            duration_secs,
        }
    }
}

/// A persisted call log entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallLogEntry {
    pub id: String,
    pub caller: UserId,
    pub receiver: UserId,
    pub call_type: CallKind,
    pub status: CallStatus,
    pub duration: u64,
    pub created_at: Timestamp,
}

/// Optional content of a message. At least one part must be present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub audio: Option<String>,
}

impl MessagePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        let blank = |part: &Option<String>| part.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.text) && blank(&self.image) && blank(&self.audio)
    }
}

/// One user's reaction on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub user_id: UserId,
    pub emoji: String,
}

/// A persisted direct message. Owned by the message store collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    #[serde(flatten)]
    pub payload: MessagePayload,
    pub read: bool,
    pub reactions: Vec<Reaction>,
    pub created_at: Timestamp,
}

/// A persisted group message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessage {
    pub id: MessageId,
    pub group_id: GroupId,
    pub sender_id: UserId,
    #[serde(flatten)]
    pub payload: MessagePayload,
    pub created_at: Timestamp,
}
