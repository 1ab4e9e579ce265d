//! Domain layer for the signaling core.
//!
//! Pure in-memory structures. Nothing in here performs I/O or awaits.

pub mod calls;
pub mod config;
pub mod entities;
pub mod errors;
pub mod events;
pub mod registry;
pub mod rooms;

pub use calls::{CallTable, TransitionOutcome};
pub use config::SignalingConfig;
pub use entities::*;
pub use errors::{SignalingError, StoreError};
pub use events::{ClientSignal, ServerEvent, TypingScope};
pub use registry::{ConnectionRegistry, UnregisterOutcome};
pub use rooms::RoomDirectory;
