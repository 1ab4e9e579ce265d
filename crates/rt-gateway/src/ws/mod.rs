//! WebSocket boundary: one socket per client connection.
//!
//! - `GET /ws?userId=<id>` upgrades and attaches the connection to the core
//! - Frames are JSON `{"event": <name>, "data": <payload>}`
//! - Message size limits and rate limiting

pub mod handler;
pub mod protocol;

pub use handler::{FrameOutcome, WebSocketConfig, WebSocketHandler};
pub use protocol::{decode_frame, encode_frame};
