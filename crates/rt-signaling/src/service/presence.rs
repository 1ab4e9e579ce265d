//! Presence broadcaster.
//!
//! After every registry mutation the full online-user set is recomputed and
//! pushed to every attached transport as `getOnlineUsers`.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use super::fanout::EventFanout;
use crate::domain::{ServerEvent, UserId};

pub struct PresenceBroadcaster {
    fanout: Arc<EventFanout>,
    // Snapshot and send happen under one lock so two racing announcements
    // cannot deliver an older snapshot after a newer one.
    announce_lock: Mutex<()>,
}

impl PresenceBroadcaster {
    pub fn new(fanout: Arc<EventFanout>) -> Self {
        Self {
            fanout,
            announce_lock: Mutex::new(()),
        }
    }

    /// Current online-user set, sorted.
    pub fn snapshot(&self) -> Vec<UserId> {
        self.fanout.registry().online_user_ids()
    }

    /// Broadcast the current snapshot. Returns the number of recipients.
    pub fn announce(&self) -> usize {
        let _guard = self.announce_lock.lock();
        let online = self.snapshot();
        let online_count = online.len();
        let recipients = self.fanout.broadcast(&ServerEvent::OnlineUsers(online));
        debug!(online = online_count, recipients = recipients, "Presence announced");
        recipients
    }
}
