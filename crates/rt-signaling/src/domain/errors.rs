//! # Domain Errors
//!
//! Error types for the signaling core and its collaborators.

use super::entities::ChannelId;
use super::entities::ConnectionId;
use thiserror::Error;

/// Signaling error types.
///
/// Stale or late termination signals are not errors: they are reported as
/// `TransitionOutcome::NoOp` by the call service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignalingError {
    /// A call record already exists for this channel.
    #[error("Channel already has an active call: {0}")]
    DuplicateChannel(ChannelId),

    /// Missing or sentinel user identity.
    #[error("Invalid user identity")]
    InvalidIdentity,

    /// The connection is not attached to the fanout hub.
    #[error("Unknown connection: {0}")]
    UnknownConnection(ConnectionId),

    /// Inbound payload failed validation.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// An external collaborator rejected or failed a write.
    #[error("Collaborator failure: {0}")]
    Collaborator(#[from] StoreError),
}

impl SignalingError {
    /// Stable machine-readable code carried in `error` frames.
    pub fn code(&self) -> &'static str {
        match self {
            SignalingError::DuplicateChannel(_) => "duplicate_channel",
            SignalingError::InvalidIdentity => "invalid_identity",
            SignalingError::UnknownConnection(_) => "unknown_connection",
            SignalingError::InvalidPayload(_) => "invalid_payload",
            SignalingError::Collaborator(_) => "collaborator_failure",
        }
    }
}

/// Errors reported by the persistence collaborators.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Backend unreachable or failing.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Referenced entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Backend refused the write.
    #[error("Write rejected: {0}")]
    Rejected(String),
}
