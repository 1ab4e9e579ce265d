//! WebSocket session handler.
//!
//! One handler per upgraded socket. The socket is split: a writer task
//! drains the connection's mailbox into the sink, while the read loop
//! decodes frames and hands them to the signaling core.
//!
//! Security features:
//! - Message size limits (default 1MB)
//! - Rate limiting per connection

use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use rt_signaling::{
    ConnectionId, ConnectionMailbox, ServerEvent, SignalingApi, SignalingService,
    TransitionOutcome,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::protocol::{codes, decode_frame, encode_frame};
use crate::config::{ServerConfig, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_RATE_LIMIT};
use crate::metrics::GatewayMetrics;

/// WebSocket configuration
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Maximum message size in bytes
    pub max_message_size: usize,
    /// Rate limit (messages per second per connection)
    pub rate_limit: u32,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

impl From<&ServerConfig> for WebSocketConfig {
    fn from(server: &ServerConfig) -> Self {
        Self {
            max_message_size: server.max_message_size,
            rate_limit: server.rate_limit,
        }
    }
}

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The core applied the signal.
    Applied,
    /// The core absorbed the signal without a state change.
    NoOp,
    /// Refused; an `error` frame with this code went back to the issuer.
    Refused(&'static str),
    /// Undecodable; logged and dropped.
    Dropped,
}

impl From<TransitionOutcome> for FrameOutcome {
    fn from(outcome: TransitionOutcome) -> Self {
        match outcome {
            TransitionOutcome::Applied => FrameOutcome::Applied,
            TransitionOutcome::NoOp => FrameOutcome::NoOp,
        }
    }
}

/// WebSocket connection handler
pub struct WebSocketHandler {
    service: Arc<SignalingService>,
    metrics: Arc<GatewayMetrics>,
    connection_id: ConnectionId,
    config: WebSocketConfig,
    /// Message counter for rate limiting
    message_count: u32,
    /// Rate limit window start
    rate_limit_window: Instant,
}

impl WebSocketHandler {
    /// Attach a new connection to the core.
    pub fn connect(
        service: Arc<SignalingService>,
        metrics: Arc<GatewayMetrics>,
        config: WebSocketConfig,
        raw_identity: Option<&str>,
    ) -> (Self, ConnectionMailbox) {
        let (connection_id, mailbox) = service.connect(raw_identity);
        metrics.record_ws_connect();

        let handler = Self {
            service,
            metrics,
            connection_id,
            config,
            message_count: 0,
            rate_limit_window: Instant::now(),
        };
        (handler, mailbox)
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    /// Drive the socket until either side closes.
    pub async fn run(mut self, socket: WebSocket, mailbox: ConnectionMailbox) {
        info!(connection_id = %self.connection_id, "New WebSocket connection");

        let (sink, mut stream) = socket.split();
        let writer = spawn_writer(sink, mailbox, Arc::clone(&self.metrics), self.connection_id);

        while let Some(result) = stream.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    self.process_text(&text).await;
                }
                Ok(Message::Binary(data)) => match String::from_utf8(data) {
                    Ok(text) => {
                        self.process_text(&text).await;
                    }
                    Err(_) => {
                        self.metrics.record_malformed();
                        warn!(connection_id = %self.connection_id, "Dropping non-UTF-8 binary frame");
                    }
                },
                Ok(Message::Close(_)) => break,
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
                Err(e) => {
                    debug!(connection_id = %self.connection_id, error = %e, "WebSocket read error");
                    break;
                }
            }
        }

        self.close();

        // The mailbox closes once the core drops the sender, which ends the writer.
        if let Err(e) = writer.await {
            debug!(error = %e, "Writer task ended abnormally");
        }
    }

    /// Validate, decode, and apply one text frame.
    pub async fn process_text(&mut self, text: &str) -> FrameOutcome {
        self.metrics.record_frame_in();

        if text.len() > self.config.max_message_size {
            self.metrics.record_oversized();
            warn!(
                connection_id = %self.connection_id,
                size = text.len(),
                max = self.config.max_message_size,
                "Message exceeds size limit"
            );
            return self.refuse(
                codes::MESSAGE_TOO_LARGE,
                format!(
                    "Message too large: {} bytes (max: {})",
                    text.len(),
                    self.config.max_message_size
                ),
            );
        }

        if !self.check_rate_limit() {
            self.metrics.record_rate_limited();
            return self.refuse(codes::RATE_LIMITED, "Rate limit exceeded".to_string());
        }

        let signal = match decode_frame(text) {
            Ok(signal) => signal,
            Err(e) => {
                self.metrics.record_malformed();
                warn!(connection_id = %self.connection_id, error = %e, "Dropping malformed frame");
                return FrameOutcome::Dropped;
            }
        };

        let name = signal.name();
        match self.service.handle_signal(self.connection_id, signal).await {
            Ok(outcome) => outcome.into(),
            Err(e) => {
                self.metrics.record_signal_refused();
                warn!(
                    connection_id = %self.connection_id,
                    signal = name,
                    error = %e,
                    "Signal refused"
                );
                self.refuse(e.code(), e.to_string())
            }
        }
    }

    /// Detach from the core.
    pub fn close(self) {
        self.service.disconnect(self.connection_id);
        self.metrics.record_ws_disconnect();
        info!(connection_id = %self.connection_id, "WebSocket connection closed");
    }

    /// Check rate limit, returns true if request is allowed
    fn check_rate_limit(&mut self) -> bool {
        let now = Instant::now();
        let elapsed = now.duration_since(self.rate_limit_window);

        // Reset window every second
        if elapsed >= Duration::from_secs(1) {
            self.rate_limit_window = now;
            self.message_count = 0;
        }

        self.message_count += 1;
        self.message_count <= self.config.rate_limit
    }

    fn refuse(&self, code: &'static str, message: String) -> FrameOutcome {
        self.service
            .emit_to_connection(&self.connection_id, &ServerEvent::error(code, message));
        FrameOutcome::Refused(code)
    }
}

fn spawn_writer(
    mut sink: SplitSink<WebSocket, Message>,
    mut mailbox: ConnectionMailbox,
    metrics: Arc<GatewayMetrics>,
    connection_id: ConnectionId,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = mailbox.recv().await {
            let frame = match encode_frame(&event) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!(connection_id = %connection_id, event = event.name(), error = %e, "Failed to encode event");
                    continue;
                }
            };
            if let Err(e) = sink.send(Message::Text(frame)).await {
                debug!(connection_id = %connection_id, error = %e, "Socket closed while writing");
                break;
            }
            metrics.record_frame_out();
        }
        let _ = sink.close().await;
    })
}
