//! # rt-gateway
//!
//! WebSocket and HTTP boundary for the real-time chat signaling core.
//!
//! ```text
//!   client ──ws──▶ /ws?userId=..  ──▶ WebSocketHandler ──▶ SignalingService
//!                                         ▲                      │
//!                                         └──── mailbox ◀────────┘
//!   client ─http─▶ /messages, /online, /calls/.. ──▶ SignalingApi
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use rt_gateway::{GatewayConfig, GatewayService};
//!
//! let config = GatewayConfig::from_env();
//! let service = GatewayService::new(config)?;
//! service.run_until(async { tokio::signal::ctrl_c().await.ok(); }).await?;
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod service;
pub mod telemetry;
pub mod ws;

pub use config::{GatewayConfig, LoggingConfig, ServerConfig};
pub use error::{ApiError, GatewayError};
pub use metrics::GatewayMetrics;
pub use service::GatewayService;
pub use telemetry::init_logging;
pub use ws::{FrameOutcome, WebSocketConfig, WebSocketHandler};
