//! Messaging and read-receipt sync.
//!
//! Persistence always happens first through the [`MessageStore`]
//! collaborator; fanout only ever announces state the store already holds.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::fanout::EventFanout;
use crate::domain::{
    require_identity, ChatMessage, ConnectionId, GroupMessage, MessagePayload, RoomDirectory,
    ServerEvent, SignalingError,
};
use crate::ports::MessageStore;

pub struct MessageSync {
    fanout: Arc<EventFanout>,
    rooms: Arc<RoomDirectory>,
    store: Arc<dyn MessageStore>,
    read_echo: bool,
}

impl MessageSync {
    pub fn new(
        fanout: Arc<EventFanout>,
        rooms: Arc<RoomDirectory>,
        store: Arc<dyn MessageStore>,
        read_echo: bool,
    ) -> Self {
        Self {
            fanout,
            rooms,
            store,
            read_echo,
        }
    }

    /// Persist, then deliver.
    pub async fn send_message(
        &self,
        sender_id: &str,
        receiver_id: &str,
        payload: MessagePayload,
    ) -> Result<ChatMessage, SignalingError> {
        let sender_id = require_identity(sender_id, "senderId")?;
        let receiver_id = require_identity(receiver_id, "receiverId")?;
        if payload.is_empty() {
            return Err(SignalingError::InvalidPayload("empty message".into()));
        }

        let message = self.store.create(&sender_id, &receiver_id, payload).await?;
        self.deliver_new_message(&message);
        Ok(message)
    }

    /// Push an already-persisted message to the receiver's connections.
    pub fn deliver_new_message(&self, message: &ChatMessage) -> usize {
        let delivered = self
            .fanout
            .emit_to_user(&message.receiver_id, &ServerEvent::NewMessage(message.clone()));
        debug!(
            message_id = %message.id,
            receiver = %message.receiver_id,
            delivered = delivered,
            "New message delivered"
        );
        delivered
    }

    /// Mark the partner's messages to the reader as read.
    ///
    /// The partner is told `messagesRead`; with read echo enabled the
    /// reader's own connections get `conversationRead`. Safe to repeat.
    pub async fn mark_read(&self, reader_id: &str, partner_id: &str) -> Result<usize, SignalingError> {
        let reader_id = require_identity(reader_id, "readerId")?;
        let partner_id = require_identity(partner_id, "partnerId")?;

        let updated = self.store.mark_read(&partner_id, &reader_id).await?;

        self.fanout.emit_to_user(
            &partner_id,
            &ServerEvent::MessagesRead {
                conversation_id: reader_id.clone(),
            },
        );
        if self.read_echo {
            self.fanout.emit_to_user(
                &reader_id,
                &ServerEvent::ConversationRead {
                    partner_id: partner_id.clone(),
                },
            );
        }

        info!(reader = %reader_id, partner = %partner_id, updated = updated, "Messages marked read");
        Ok(updated)
    }

    /// Toggle a reaction and tell both conversation parties.
    pub async fn react(
        &self,
        message_id: &str,
        user_id: &str,
        emoji: &str,
    ) -> Result<ChatMessage, SignalingError> {
        let user_id = require_identity(user_id, "userId")?;
        if emoji.trim().is_empty() {
            return Err(SignalingError::InvalidPayload("empty emoji".into()));
        }

        let message = self
            .store
            .toggle_reaction(message_id, &user_id, emoji)
            .await?;
        let event = ServerEvent::MessageReaction {
            message_id: message.id.clone(),
            reactions: message.reactions.clone(),
        };
        self.fanout.emit_to_user(&message.sender_id, &event);
        self.fanout.emit_to_user(&message.receiver_id, &event);
        Ok(message)
    }

    /// Persist a group message, then push it to the room.
    pub async fn send_group_message(
        &self,
        group_id: &str,
        sender_id: &str,
        payload: MessagePayload,
    ) -> Result<GroupMessage, SignalingError> {
        let sender_id = require_identity(sender_id, "senderId")?;
        if group_id.trim().is_empty() {
            return Err(SignalingError::InvalidPayload("empty groupId".into()));
        }
        if payload.is_empty() {
            return Err(SignalingError::InvalidPayload("empty message".into()));
        }

        let message = self
            .store
            .create_group_message(group_id, &sender_id, payload)
            .await?;
        self.deliver_group_message(&message);
        Ok(message)
    }

    /// Push a persisted group message to every room member except the sender.
    pub fn deliver_group_message(&self, message: &GroupMessage) -> usize {
        let recipients = room_recipients(
            &self.fanout,
            &self.rooms,
            &message.group_id,
            &message.sender_id,
        );
        self.fanout
            .emit_to_connections(&recipients, &ServerEvent::GroupNewMessage(message.clone()))
    }

    pub async fn conversation(&self, a: &str, b: &str) -> Result<Vec<ChatMessage>, SignalingError> {
        Ok(self.store.conversation(a.trim(), b.trim()).await?)
    }
}

/// Room members minus every connection the sender owns.
pub(crate) fn room_recipients(
    fanout: &EventFanout,
    rooms: &RoomDirectory,
    group_id: &str,
    sender_id: &str,
) -> HashSet<ConnectionId> {
    let sender_connections = fanout.registry().connections_of(sender_id);
    rooms
        .members(group_id)
        .into_iter()
        .filter(|conn| !sender_connections.contains(conn))
        .collect()
}
