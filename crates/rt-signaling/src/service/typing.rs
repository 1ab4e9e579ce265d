//! Typing indicator relay. Stateless: every signal is forwarded as-is.

use std::sync::Arc;
use tracing::trace;

use super::fanout::EventFanout;
use super::messaging::room_recipients;
use crate::domain::{RoomDirectory, ServerEvent, TypingScope};

pub struct TypingRelay {
    fanout: Arc<EventFanout>,
    rooms: Arc<RoomDirectory>,
}

impl TypingRelay {
    pub fn new(fanout: Arc<EventFanout>, rooms: Arc<RoomDirectory>) -> Self {
        Self { fanout, rooms }
    }

    /// Forward a typing or stop-typing signal. Returns the recipient count.
    pub fn set_typing(&self, scope: &TypingScope, sender_id: &str, is_typing: bool) -> usize {
        let delivered = match scope {
            TypingScope::Direct(partner_id) => {
                let sender_id = sender_id.to_string();
                let event = if is_typing {
                    ServerEvent::UserTyping { sender_id }
                } else {
                    ServerEvent::UserStopTyping { sender_id }
                };
                self.fanout.emit_to_user(partner_id, &event)
            }
            TypingScope::Group(group_id) => {
                let recipients = room_recipients(&self.fanout, &self.rooms, group_id, sender_id);
                let group_id = group_id.clone();
                let sender_id = sender_id.to_string();
                let event = if is_typing {
                    ServerEvent::GroupTyping { group_id, sender_id }
                } else {
                    ServerEvent::GroupStopTyping { group_id, sender_id }
                };
                self.fanout.emit_to_connections(&recipients, &event)
            }
        };

        trace!(?scope, is_typing = is_typing, delivered = delivered, "Typing relayed");
        delivered
    }
}
