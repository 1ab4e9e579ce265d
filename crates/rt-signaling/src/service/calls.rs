//! Call signaling state machine.
//!
//! Records live in [`CallTable`]; every terminal transition removes its
//! record first and only then notifies parties and persists the outcome, so
//! a lost race never produces a second log entry or a second `call:ended`.
//! Persistence runs after the table lock is released.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::fanout::EventFanout;
use crate::domain::{
    require_identity, CallKind, CallRecord, CallStatus, CallTable, CallerInfo, NewCallLog,
    ServerEvent, SignalingError, TransitionOutcome,
};
use crate::ports::{CallLogStore, TimeSource};

/// Reason carried by `callCancelled` when the receiver declines.
pub const REJECTED_REASON: &str = "rejected";

/// Parameters of a `call:request`.
#[derive(Debug, Clone)]
pub struct CallRequest {
    pub channel_id: String,
    pub receiver_id: String,
    pub kind: CallKind,
    pub caller_name: String,
    pub caller_avatar: Option<String>,
}

pub struct CallSignaling {
    table: CallTable,
    fanout: Arc<EventFanout>,
    call_log: Arc<dyn CallLogStore>,
    clock: Arc<dyn TimeSource>,
}

impl CallSignaling {
    pub fn new(
        fanout: Arc<EventFanout>,
        call_log: Arc<dyn CallLogStore>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            table: CallTable::new(),
            fanout,
            call_log,
            clock,
        }
    }

    /// NONE → RINGING. Notifies the receiver with `incomingCall`.
    pub fn request(
        &self,
        caller_id: &str,
        request: CallRequest,
    ) -> Result<TransitionOutcome, SignalingError> {
        if request.channel_id.trim().is_empty() {
            return Err(SignalingError::InvalidPayload("empty channelId".into()));
        }
        let receiver_id = require_identity(&request.receiver_id, "receiverId")?;

        let record = CallRecord::ringing(
            request.channel_id.clone(),
            caller_id,
            receiver_id.clone(),
            request.kind,
            self.clock.now(),
        );
        self.table.open(record)?;

        let caller_name = if request.caller_name.trim().is_empty() {
            caller_id.to_string()
        } else {
            request.caller_name
        };
        let event = ServerEvent::IncomingCall {
            caller_info: CallerInfo {
                id: caller_id.to_string(),
                name: caller_name,
                avatar: request.caller_avatar,
            },
            channel_id: request.channel_id.clone(),
            call_type: request.kind,
        };
        let delivered = self.fanout.emit_to_user(&receiver_id, &event);

        info!(
            channel_id = %request.channel_id,
            caller = %caller_id,
            receiver = %receiver_id,
            kind = %request.kind,
            delivered = delivered,
            "Call ringing"
        );
        Ok(TransitionOutcome::Applied)
    }

    /// RINGING → CONNECTED, by the receiver only. Notifies the caller.
    pub fn accept(&self, by: &str, channel_id: &str) -> TransitionOutcome {
        let Some(record) = self.table.accept(channel_id, by) else {
            debug!(channel_id = %channel_id, by = %by, "Ignoring accept");
            return TransitionOutcome::NoOp;
        };

        self.fanout.emit_to_user(
            &record.caller,
            &ServerEvent::CallAccepted {
                channel_id: record.channel_id.clone(),
            },
        );
        info!(channel_id = %channel_id, "Call connected");
        TransitionOutcome::Applied
    }

    /// RINGING → REJECTED, by the receiver only.
    ///
    /// Tells the caller `callCancelled` and logs `rejected` with zero duration.
    pub async fn reject(&self, by: &str, channel_id: &str) -> TransitionOutcome {
        let Some(record) = self.table.take_ringing_for_receiver(channel_id, by) else {
            debug!(channel_id = %channel_id, by = %by, "Ignoring reject");
            return TransitionOutcome::NoOp;
        };

        self.fanout.emit_to_user(
            &record.caller,
            &ServerEvent::CallCancelled {
                reason: REJECTED_REASON.to_string(),
            },
        );
        self.persist(&record, CallStatus::Rejected, 0).await;

        info!(channel_id = %channel_id, "Call rejected");
        TransitionOutcome::Applied
    }

    /// RINGING|CONNECTED → ENDED, by either party.
    ///
    /// The client-supplied status and duration are logged as given.
    pub async fn end(
        &self,
        by: &str,
        channel_id: &str,
        status: CallStatus,
        duration_secs: u64,
    ) -> TransitionOutcome {
        let Some(record) = self.table.take_for_party(channel_id, by) else {
            debug!(channel_id = %channel_id, by = %by, "Ignoring end");
            return TransitionOutcome::NoOp;
        };

        self.finish(&record, status, duration_secs).await;
        info!(
            channel_id = %channel_id,
            status = %status,
            duration = duration_secs,
            "Call ended"
        );
        TransitionOutcome::Applied
    }

    /// Cleanup after a user's last connection closed.
    ///
    /// Tells the other party `call:ended`. Writes no call log entry.
    pub fn on_user_offline(&self, user_id: &str) -> usize {
        let records = self.table.take_involving(user_id);
        for record in &records {
            if let Some(other) = record.counterpart(user_id) {
                self.fanout.emit_to_user(other, &ServerEvent::CallEnded {});
            }
            info!(
                channel_id = %record.channel_id,
                user_id = %user_id,
                "Call cancelled by disconnect"
            );
        }
        records.len()
    }

    /// Remove ringing calls older than `ttl`, logging them as `missed`.
    pub async fn sweep_expired(&self, ttl: Duration) -> usize {
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX);
        let expired = self.table.take_expired_ringing(self.clock.now(), ttl_ms);
        for record in &expired {
            self.finish(record, CallStatus::Missed, 0).await;
            info!(channel_id = %record.channel_id, "Unanswered call timed out");
        }
        expired.len()
    }

    pub fn active_calls(&self) -> usize {
        self.table.len()
    }

    pub fn record(&self, channel_id: &str) -> Option<CallRecord> {
        self.table.get(channel_id)
    }

    async fn finish(&self, record: &CallRecord, status: CallStatus, duration_secs: u64) {
        let parties = [&record.caller, &record.receiver];
        for party in parties {
            self.fanout.emit_to_user(party, &ServerEvent::CallEnded {});
        }
        self.persist(record, status, duration_secs).await;
        for party in parties {
            self.fanout
                .emit_to_user(party, &ServerEvent::CallHistoryUpdated {});
        }
    }

    async fn persist(&self, record: &CallRecord, status: CallStatus, duration_secs: u64) {
        let entry = NewCallLog::from_record(record, status, duration_secs);
        if let Err(e) = self.call_log.write(entry).await {
            warn!(
                channel_id = %record.channel_id,
                status = %status,
                error = %e,
                "Failed to persist call log"
            );
        }
    }
}
