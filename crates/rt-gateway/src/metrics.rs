//! Gateway counters, exported as JSON on `GET /metrics`.

use rt_signaling::SignalingStats;
use std::sync::atomic::{AtomicU64, Ordering};

/// Transport-level counters. Core counters come from [`SignalingStats`].
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    // WebSocket sessions
    pub ws_sessions_total: AtomicU64,
    pub ws_sessions_active: AtomicU64,

    // Frames
    pub frames_in: AtomicU64,
    pub frames_out: AtomicU64,
    pub frames_malformed: AtomicU64,
    pub frames_oversized: AtomicU64,
    pub frames_rate_limited: AtomicU64,

    // Signals the core refused (duplicate channel, bad payload, ...)
    pub signals_refused: AtomicU64,

    // HTTP
    pub http_requests: AtomicU64,
    pub http_errors: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_ws_connect(&self) {
        self.ws_sessions_total.fetch_add(1, Ordering::Relaxed);
        self.ws_sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ws_disconnect(&self) {
        self.ws_sessions_active.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_frame_in(&self) {
        self.frames_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_frame_out(&self) {
        self.frames_out.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed(&self) {
        self.frames_malformed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_oversized(&self) {
        self.frames_oversized.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.frames_rate_limited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_signal_refused(&self) {
        self.signals_refused.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_http(&self, success: bool) {
        self.http_requests.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.http_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Export metrics as JSON
    pub fn to_json(&self, core: &SignalingStats) -> serde_json::Value {
        serde_json::json!({
            "websocket": {
                "sessions_total": self.ws_sessions_total.load(Ordering::Relaxed),
                "sessions_active": self.ws_sessions_active.load(Ordering::Relaxed),
            },
            "frames": {
                "in": self.frames_in.load(Ordering::Relaxed),
                "out": self.frames_out.load(Ordering::Relaxed),
                "malformed": self.frames_malformed.load(Ordering::Relaxed),
                "oversized": self.frames_oversized.load(Ordering::Relaxed),
                "rate_limited": self.frames_rate_limited.load(Ordering::Relaxed),
            },
            "signals": {
                "refused": self.signals_refused.load(Ordering::Relaxed),
            },
            "http": {
                "requests": self.http_requests.load(Ordering::Relaxed),
                "errors": self.http_errors.load(Ordering::Relaxed),
            },
            "core": core,
        })
    }
}
