//! Adapters layer for the signaling core.
//!
//! In-memory implementations of the outbound collaborator ports. They let
//! the gateway run standalone and double as test fixtures.

pub mod memory;

pub use memory::{InMemoryCallLog, InMemoryMessageStore};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::FailingCallLog;
