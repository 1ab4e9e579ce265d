//! In-memory message store and call log.

use async_trait::async_trait;
use parking_lot::RwLock;
#[cfg(any(test, feature = "test-utils"))]
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{
    CallLogEntry, ChatMessage, GroupMessage, MessagePayload, NewCallLog, Reaction, StoreError,
};
use crate::ports::{CallLogStore, MessageStore, SystemTimeSource, TimeSource};

/// Call log kept in process memory.
pub struct InMemoryCallLog {
    entries: RwLock<Vec<CallLogEntry>>,
    clock: Arc<dyn TimeSource>,
}

impl InMemoryCallLog {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemTimeSource))
    }

    pub fn with_clock(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            clock,
        }
    }

    /// Every entry, in write order.
    pub fn entries(&self) -> Vec<CallLogEntry> {
        self.entries.read().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for InMemoryCallLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallLogStore for InMemoryCallLog {
    async fn write(&self, entry: NewCallLog) -> Result<CallLogEntry, StoreError> {
        let record = CallLogEntry {
            id: Uuid::now_v7().to_string(),
            caller: entry.caller,
            receiver: entry.receiver,
            call_type: entry.kind,
            status: entry.status,
            duration: entry.duration_secs,
            created_at: self.clock.now(),
        };
        self.entries.write().push(record.clone());
        Ok(record)
    }

    async fn history(&self, user_id: &str) -> Result<Vec<CallLogEntry>, StoreError> {
        Ok(self
            .entries
            .read()
            .iter()
            .rev()
            .filter(|e| e.caller == user_id || e.receiver == user_id)
            .cloned()
            .collect())
    }
}

/// Call log whose writes always fail. Counts attempts.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Default)]
pub struct FailingCallLog {
    attempts: AtomicU64,
}

#[cfg(any(test, feature = "test-utils"))]
impl FailingCallLog {
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl CallLogStore for FailingCallLog {
    async fn write(&self, _entry: NewCallLog) -> Result<CallLogEntry, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Unavailable("call log offline".into()))
    }

    async fn history(&self, _user_id: &str) -> Result<Vec<CallLogEntry>, StoreError> {
        Err(StoreError::Unavailable("call log offline".into()))
    }
}

/// Message store kept in process memory.
pub struct InMemoryMessageStore {
    messages: RwLock<Vec<ChatMessage>>,
    group_messages: RwLock<Vec<GroupMessage>>,
    clock: Arc<dyn TimeSource>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemTimeSource))
    }

    pub fn with_clock(clock: Arc<dyn TimeSource>) -> Self {
        Self {
            messages: RwLock::new(Vec::new()),
            group_messages: RwLock::new(Vec::new()),
            clock,
        }
    }

    pub fn group_history(&self, group_id: &str) -> Vec<GroupMessage> {
        self.group_messages
            .read()
            .iter()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create(
        &self,
        sender_id: &str,
        receiver_id: &str,
        payload: MessagePayload,
    ) -> Result<ChatMessage, StoreError> {
        let message = ChatMessage {
            id: Uuid::now_v7().to_string(),
            sender_id: sender_id.to_string(),
            receiver_id: receiver_id.to_string(),
            payload,
            read: false,
            reactions: Vec::new(),
            created_at: self.clock.now(),
        };
        self.messages.write().push(message.clone());
        Ok(message)
    }

    async fn mark_read(&self, sender_id: &str, receiver_id: &str) -> Result<usize, StoreError> {
        let mut messages = self.messages.write();
        let mut updated = 0;
        for message in messages
            .iter_mut()
            .filter(|m| m.sender_id == sender_id && m.receiver_id == receiver_id && !m.read)
        {
            message.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn toggle_reaction(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> Result<ChatMessage, StoreError> {
        let mut messages = self.messages.write();
        let message = messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or_else(|| StoreError::NotFound(format!("message {message_id}")))?;

        if message.sender_id != user_id && message.receiver_id != user_id {
            return Err(StoreError::Rejected(format!(
                "{user_id} is not part of this conversation"
            )));
        }

        // One reaction per user: same emoji removes it, another replaces it.
        match message.reactions.iter().position(|r| r.user_id == user_id) {
            Some(index) if message.reactions[index].emoji == emoji => {
                message.reactions.remove(index);
            }
            Some(index) => {
                message.reactions[index].emoji = emoji.to_string();
            }
            None => message.reactions.push(Reaction {
                user_id: user_id.to_string(),
                emoji: emoji.to_string(),
            }),
        }

        Ok(message.clone())
    }

    async fn conversation(&self, a: &str, b: &str) -> Result<Vec<ChatMessage>, StoreError> {
        Ok(self
            .messages
            .read()
            .iter()
            .filter(|m| {
                (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
            })
            .cloned()
            .collect())
    }

    async fn create_group_message(
        &self,
        group_id: &str,
        sender_id: &str,
        payload: MessagePayload,
    ) -> Result<GroupMessage, StoreError> {
        let message = GroupMessage {
            id: Uuid::now_v7().to_string(),
            group_id: group_id.to_string(),
            sender_id: sender_id.to_string(),
            payload,
            created_at: self.clock.now(),
        };
        self.group_messages.write().push(message.clone());
        Ok(message)
    }
}
