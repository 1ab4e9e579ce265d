//! Gateway configuration with validation.
//!
//! Defaults, then environment overrides, then `validate()`.

use rt_signaling::SignalingConfig;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use crate::error::GatewayError;

/// Default maximum inbound frame size (1 MiB)
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1024 * 1024;

/// Default inbound frame rate limit per connection (frames per second)
pub const DEFAULT_RATE_LIMIT: u32 = 100;

/// Main gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP and WebSocket listener
    pub server: ServerConfig,
    /// Signaling core knobs
    pub signaling: SignalingConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 5001)
    pub port: u16,
    /// Largest inbound WebSocket frame accepted, in bytes
    pub max_message_size: usize,
    /// Inbound frames per second per connection
    pub rate_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 5001,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (trace, debug, info, warn, error, or a full EnvFilter)
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl GatewayConfig {
    /// Defaults overlaid with environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `RT_HOST`: Bind address (default: 0.0.0.0)
    /// - `RT_PORT`: Port (default: 5001)
    /// - `RT_MAX_MESSAGE_SIZE`: Largest inbound frame in bytes (default: 1 MiB)
    /// - `RT_RATE_LIMIT`: Inbound frames per second per connection (default: 100)
    /// - `RT_OUTBOUND_BUFFER`: Per-connection outbound mailbox bound (default: 256)
    /// - `RT_RING_TIMEOUT_SECS`: Ring timeout; unset or 0 disables it
    /// - `RT_SWEEP_INTERVAL_SECS`: Ring sweeper period (default: 5)
    /// - `RT_READ_ECHO`: Echo `conversationRead` to the reader (default: true)
    /// - `RT_LOG_LEVEL` or `RUST_LOG`: Log filter (default: info)
    /// - `RT_JSON_LOGS`: JSON log output (default: false)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(host) = lookup("RT_HOST").and_then(|v| v.parse().ok()) {
            config.server.host = host;
        }
        if let Some(port) = lookup("RT_PORT").and_then(|v| v.parse().ok()) {
            config.server.port = port;
        }
        if let Some(size) = lookup("RT_MAX_MESSAGE_SIZE").and_then(|v| v.parse().ok()) {
            config.server.max_message_size = size;
        }
        if let Some(limit) = lookup("RT_RATE_LIMIT").and_then(|v| v.parse().ok()) {
            config.server.rate_limit = limit;
        }
        if let Some(capacity) = lookup("RT_OUTBOUND_BUFFER").and_then(|v| v.parse().ok()) {
            config.signaling.mailbox_capacity = capacity;
        }
        if let Some(secs) = lookup("RT_SWEEP_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            config.signaling.sweep_interval_secs = secs;
        }
        if let Some(echo) = lookup("RT_READ_ECHO") {
            config.signaling.conversation_read_echo = parse_flag(&echo);
        }
        if let Some(secs) = lookup("RT_RING_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            config.signaling.ring_timeout_secs = (secs > 0).then_some(secs);
        }
        if let Some(level) = lookup("RT_LOG_LEVEL").or_else(|| lookup("RUST_LOG")) {
            config.logging.level = level;
        }
        if let Some(json) = lookup("RT_JSON_LOGS") {
            config.logging.json = parse_flag(&json);
        }

        config
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.server.max_message_size == 0 {
            return Err(GatewayError::Config("max_message_size cannot be 0".into()));
        }
        if self.server.rate_limit == 0 {
            return Err(GatewayError::Config("rate_limit cannot be 0".into()));
        }
        if self.signaling.mailbox_capacity == 0 {
            return Err(GatewayError::Config("mailbox_capacity cannot be 0".into()));
        }
        if self.signaling.ring_timeout_secs == Some(0) {
            return Err(GatewayError::Config(
                "ring_timeout_secs must be positive when set".into(),
            ));
        }
        if self.signaling.sweep_interval_secs == 0 {
            return Err(GatewayError::Config(
                "sweep_interval_secs cannot be 0".into(),
            ));
        }
        Ok(())
    }

    /// Listener bind address
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}

fn parse_flag(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
