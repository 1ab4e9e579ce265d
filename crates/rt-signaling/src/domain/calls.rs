//! Call record table keyed by channel id.
//!
//! Every terminal transition removes its record through `DashMap::remove_if`,
//! which checks and deletes under one shard lock. Whichever of reject, end,
//! disconnect cleanup, or ring timeout gets there first receives the record;
//! later callers receive `None`.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::debug;

use super::entities::{CallRecord, CallState, ChannelId, Timestamp};
use super::errors::SignalingError;

/// Result of applying a signal to the call state machine.
///
/// Stale and late signals are absorbed as `NoOp` rather than surfaced as
/// errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The signal changed state and notified the parties.
    Applied,
    /// Nothing to do: the record was absent, already terminal, or the
    /// issuer is not allowed to make this transition.
    NoOp,
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied)
    }
}

/// In-memory table of live (RINGING or CONNECTED) calls.
#[derive(Debug, Default)]
pub struct CallTable {
    records: DashMap<ChannelId, CallRecord>,
}

impl CallTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record. Fails if the channel already has one.
    pub fn open(&self, record: CallRecord) -> Result<(), SignalingError> {
        match self.records.entry(record.channel_id.clone()) {
            Entry::Occupied(_) => Err(SignalingError::DuplicateChannel(record.channel_id)),
            Entry::Vacant(slot) => {
                debug!(
                    channel_id = %record.channel_id,
                    caller = %record.caller,
                    receiver = %record.receiver,
                    "Call record opened"
                );
                slot.insert(record);
                Ok(())
            }
        }
    }

    /// RINGING → CONNECTED, only when requested by the receiver.
    ///
    /// Returns the updated record, or `None` if nothing changed.
    pub fn accept(&self, channel_id: &str, by: &str) -> Option<CallRecord> {
        let mut record = self.records.get_mut(channel_id)?;
        if record.state != CallState::Ringing || record.receiver != by {
            return None;
        }
        record.state = CallState::Connected;
        Some(record.clone())
    }

    /// Remove the record if `by` is one of its parties.
    pub fn take_for_party(&self, channel_id: &str, by: &str) -> Option<CallRecord> {
        self.records
            .remove_if(channel_id, |_, record| record.involves(by))
            .map(|(_, record)| record)
    }

    /// Remove the record if it is still ringing and `by` is its receiver.
    pub fn take_ringing_for_receiver(&self, channel_id: &str, by: &str) -> Option<CallRecord> {
        self.records
            .remove_if(channel_id, |_, record| {
                record.is_ringing() && record.receiver == by
            })
            .map(|(_, record)| record)
    }

    /// Remove every record in which `user` is caller or receiver.
    pub fn take_involving(&self, user: &str) -> Vec<CallRecord> {
        let channels: Vec<ChannelId> = self
            .records
            .iter()
            .filter(|r| r.value().involves(user))
            .map(|r| r.key().clone())
            .collect();

        channels
            .into_iter()
            .filter_map(|channel| {
                self.records
                    .remove_if(&channel, |_, record| record.involves(user))
                    .map(|(_, record)| record)
            })
            .collect()
    }

    /// Remove ringing records created at or before `now - ttl_ms`.
    pub fn take_expired_ringing(&self, now: Timestamp, ttl_ms: u64) -> Vec<CallRecord> {
        let expired = |record: &CallRecord| {
            record.is_ringing() && now.saturating_sub(record.created_at) >= ttl_ms
        };

        let channels: Vec<ChannelId> = self
            .records
            .iter()
            .filter(|r| expired(r.value()))
            .map(|r| r.key().clone())
            .collect();

        channels
            .into_iter()
            .filter_map(|channel| {
                self.records
                    .remove_if(&channel, |_, record| expired(record))
                    .map(|(_, record)| record)
            })
            .collect()
    }

    pub fn get(&self, channel_id: &str) -> Option<CallRecord> {
        self.records.get(channel_id).map(|r| r.clone())
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.records.contains_key(channel_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
