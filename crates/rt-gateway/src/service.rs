//! Gateway service: owns the signaling core and serves HTTP + WebSocket.

use axum::routing::{get, post};
use axum::Router;
use rt_signaling::SignalingService;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::http::{self, AppState};
use crate::metrics::GatewayMetrics;
use crate::ws::WebSocketConfig;

/// Gateway service state
pub struct GatewayService {
    config: GatewayConfig,
    signaling: Arc<SignalingService>,
    metrics: Arc<GatewayMetrics>,
}

impl GatewayService {
    /// Create a gateway backed by the in-memory collaborators.
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;
        let signaling = Arc::new(SignalingService::in_memory(config.signaling.clone()));
        Ok(Self::with_signaling(config, signaling))
    }

    /// Create a gateway around an existing core.
    pub fn with_signaling(config: GatewayConfig, signaling: Arc<SignalingService>) -> Self {
        Self {
            config,
            signaling,
            metrics: Arc::new(GatewayMetrics::new()),
        }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn signaling(&self) -> Arc<SignalingService> {
        Arc::clone(&self.signaling)
    }

    pub fn metrics(&self) -> Arc<GatewayMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Build the HTTP router, WebSocket upgrade included.
    pub fn router(&self) -> Router {
        let state = AppState {
            signaling: Arc::clone(&self.signaling),
            metrics: Arc::clone(&self.metrics),
            ws_config: WebSocketConfig::from(&self.config.server),
        };

        let middleware = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive());

        Router::new()
            .route("/ws", get(http::ws_upgrade))
            .route("/health", get(http::health_check))
            .route("/metrics", get(http::metrics))
            .route("/online", get(http::online_users))
            .route("/calls/:user_id", get(http::call_history))
            .route("/conversations/:user_id/:partner_id", get(http::conversation))
            .route("/messages", post(http::send_message))
            .route("/messages/read", post(http::mark_read))
            .route("/messages/:message_id/reactions", post(http::react))
            .route("/groups/:group_id/messages", post(http::send_group_message))
            .layer(middleware)
            .with_state(state)
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(format!("{addr}: {e}")))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local: SocketAddr = listener.local_addr()?;
        info!(addr = %local, "Gateway listening");

        let sweeper = self.signaling.spawn_ring_sweeper();
        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        if let Some(handle) = sweeper {
            handle.abort();
        }
        result?;

        info!("Gateway stopped");
        Ok(())
    }
}
