//! Ports layer for the signaling core.
//!
//! - Inbound (Driving) port: the API the transport boundary calls
//! - Outbound (Driven) ports: persisted call log, message store, clock

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
