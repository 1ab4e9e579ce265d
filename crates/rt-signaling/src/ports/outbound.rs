//! Outbound (Driven) ports for the signaling core.
//!
//! These traits define the persistence collaborators the core hands data to.
//! The core never holds a registry or call-table lock across any of these
//! calls.

use async_trait::async_trait;
#[cfg(any(test, feature = "test-utils"))]
use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{
    CallLogEntry, ChatMessage, GroupMessage, MessagePayload, NewCallLog, StoreError, Timestamp,
};

/// Persisted call log.
#[async_trait]
pub trait CallLogStore: Send + Sync {
    /// Persist a terminal call outcome.
    async fn write(&self, entry: NewCallLog) -> Result<CallLogEntry, StoreError>;

    /// Call history in which `user_id` is caller or receiver, newest first.
    async fn history(&self, user_id: &str) -> Result<Vec<CallLogEntry>, StoreError>;
}

/// Persisted message store.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Durably persist a direct message.
    async fn create(
        &self,
        sender_id: &str,
        receiver_id: &str,
        payload: MessagePayload,
    ) -> Result<ChatMessage, StoreError>;

    /// Mark every unread message from `sender_id` to `receiver_id` as read.
    ///
    /// Returns how many messages flipped. Already-read messages are untouched,
    /// so repeated calls return 0.
    async fn mark_read(&self, sender_id: &str, receiver_id: &str) -> Result<usize, StoreError>;

    /// Add the user's reaction, or remove it if the same emoji is already there.
    async fn toggle_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> Result<ChatMessage, StoreError>;

    /// Both directions of a direct conversation, oldest first.
    async fn conversation(&self, a: &str, b: &str) -> Result<Vec<ChatMessage>, StoreError>;

    /// Durably persist a group message.
    async fn create_group_message(
        &self,
        group_id: &str,
        sender_id: &str,
        payload: MessagePayload,
    ) -> Result<GroupMessage, StoreError>;
}

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current timestamp in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as Timestamp
    }
}

/// Manually driven clock for tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct MockTimeSource {
    now: AtomicU64,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockTimeSource {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: AtomicU64::new(start),
        }
    }

    pub fn set(&self, now: Timestamp) {
        self.now.store(now, Ordering::SeqCst);
    }

    pub fn advance(&self, millis: u64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
