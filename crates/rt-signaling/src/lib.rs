//! # RT Signaling
//!
//! Presence, event fanout, and call signaling core for the real-time chat
//! service. All state in this crate is in-process and volatile: a restart
//! forgets every connection, room membership, and in-flight call.
//!
//! ## Purpose
//!
//! - Track which of a user's concurrent connections are live
//! - Deliver events to every live connection a user owns (multi-device)
//! - Broadcast the online-user set whenever it changes
//! - Run the two-party call state machine across independently failing peers
//! - Relay new-message, read-receipt, reaction, and typing events
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement Location |
//! |-----------|---------------------|
//! | A user is registered iff it owns at least one connection | `domain/registry.rs` - `unregister()` removes empty sets under the shard lock |
//! | At most one call record per channel | `domain/calls.rs` - `open()` uses the vacant entry |
//! | A call record is removed exactly once | `domain/calls.rs` - every terminal path goes through `DashMap::remove_if` |
//! | Fanout never blocks the caller | `service/fanout.rs` - bounded mailboxes with `try_send` |
//!
//! ## Call State Machine
//!
//! ```text
//!                request                accept
//!   [NONE] ─────────────→ [RINGING] ─────────────→ [CONNECTED]
//!                            │  │                      │   │
//!                   reject   │  │ disconnect/timeout   │   │ end / disconnect
//!                            ↓  ↓                      ↓   ↓
//!                      [REJECTED] [ENDED / CANCELLED_BY_DISCONNECT]
//! ```
//!
//! Whichever terminal transition removes the record first wins; the others
//! observe an empty slot and become no-ops.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      OUTER LAYER                                │
//! │  adapters/ - in-memory message store and call log              │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      MIDDLE LAYER                               │
//! │  ports/inbound.rs  - SignalingApi trait                        │
//! │  ports/outbound.rs - CallLogStore, MessageStore, TimeSource    │
//! │  service/          - fanout, presence, calls, messaging, typing│
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      INNER LAYER                                │
//! │  domain/registry.rs - ConnectionRegistry                       │
//! │  domain/calls.rs    - CallTable (remove-once records)          │
//! │  domain/rooms.rs    - RoomDirectory (group membership)         │
//! │  domain/events.rs   - ClientSignal / ServerEvent wire types    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryCallLog, InMemoryMessageStore};
pub use domain::*;
pub use ports::{CallLogStore, MessageStore, SignalingApi, SystemTimeSource, TimeSource};
pub use service::{
    CallRequest, CallSignaling, ConnectionMailbox, EventFanout, FanoutStats, MessageSync,
    PresenceBroadcaster, SignalingService, SignalingStats, TypingRelay,
};

/// Test doubles (mock clock, failing call log).
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub use adapters::FailingCallLog;
#[cfg(any(test, feature = "test-utils"))]
pub use ports::MockTimeSource;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default per-connection mailbox capacity.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;
