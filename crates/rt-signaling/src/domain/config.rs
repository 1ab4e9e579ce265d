//! Signaling core configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::DEFAULT_MAILBOX_CAPACITY;

/// Runtime knobs for the signaling core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingConfig {
    /// Ring timeout in seconds. `None` keeps unanswered calls ringing until
    /// an explicit reject/end or a party disconnects.
    pub ring_timeout_secs: Option<u64>,

    /// How often the ring sweeper runs when a ring timeout is set.
    pub sweep_interval_secs: u64,

    /// Per-connection outbound mailbox capacity.
    pub mailbox_capacity: usize,

    /// Echo `conversationRead` to the reader's own connections on mark-read.
    pub conversation_read_echo: bool,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            ring_timeout_secs: None,
            sweep_interval_secs: 5,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
            conversation_read_echo: true,
        }
    }
}

impl SignalingConfig {
    /// Set the ring timeout
    pub fn ring_timeout(mut self, timeout: Duration) -> Self {
        self.ring_timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    /// Set the sweep interval
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval_secs = interval.as_secs().max(1);
        self
    }

    /// Set mailbox capacity
    pub fn mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }

    /// Disable the multi-device read echo
    pub fn without_read_echo(mut self) -> Self {
        self.conversation_read_echo = false;
        self
    }

    pub fn ring_timeout_duration(&self) -> Option<Duration> {
        self.ring_timeout_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval_duration(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
