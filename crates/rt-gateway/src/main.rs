//! rt-gateway binary.
//!
//! Configuration comes from `RT_*` environment variables; see
//! [`GatewayConfig::from_env`].

use anyhow::{Context, Result};
use rt_gateway::{init_logging, GatewayConfig, GatewayService};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env();
    init_logging(&config.logging).context("Failed to initialize logging")?;

    info!(
        addr = %config.bind_addr(),
        ring_timeout_secs = ?config.signaling.ring_timeout_secs,
        version = rt_signaling::VERSION,
        "Starting rt-gateway"
    );

    let service = GatewayService::new(config).context("Invalid gateway configuration")?;
    service
        .run_until(shutdown_signal())
        .await
        .context("Gateway terminated with an error")?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
