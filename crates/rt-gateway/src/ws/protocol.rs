//! Frame decoding and encoding for the `{"event", "data"}` protocol.

use rt_signaling::{ClientSignal, ServerEvent};

use crate::error::GatewayError;

/// Error codes sent in `error` frames for transport-level refusals.
pub mod codes {
    pub const MESSAGE_TOO_LARGE: &str = "message_too_large";
    pub const RATE_LIMITED: &str = "rate_limited";
}

/// Decode one inbound text frame.
pub fn decode_frame(text: &str) -> Result<ClientSignal, GatewayError> {
    serde_json::from_str(text).map_err(|e| GatewayError::Protocol(e.to_string()))
}

/// Encode one outbound event.
pub fn encode_frame(event: &ServerEvent) -> Result<String, GatewayError> {
    event
        .to_frame()
        .map_err(|e| GatewayError::Protocol(e.to_string()))
}
