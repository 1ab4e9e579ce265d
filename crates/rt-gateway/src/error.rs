//! Gateway error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rt_signaling::{SignalingError, StoreError};
use serde::Serialize;

/// Gateway-level errors (startup and transport)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// I/O error while serving
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed or oversized inbound frame
    #[error("protocol error: {0}")]
    Protocol(String),
}

/// HTTP error response body: `{"code": ..., "message": ...}`
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_payload", message)
    }
}

impl From<SignalingError> for ApiError {
    fn from(err: SignalingError) -> Self {
        let status = match &err {
            SignalingError::InvalidPayload(_) | SignalingError::InvalidIdentity => {
                StatusCode::BAD_REQUEST
            }
            SignalingError::DuplicateChannel(_) => StatusCode::CONFLICT,
            SignalingError::UnknownConnection(_) => StatusCode::NOT_FOUND,
            SignalingError::Collaborator(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            SignalingError::Collaborator(StoreError::Rejected(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SignalingError::Collaborator(StoreError::Unavailable(_)) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        };
        Self::new(status, err.code(), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}
