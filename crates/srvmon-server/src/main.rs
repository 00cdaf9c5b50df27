//! srvmon-server binary

use srvmon_server::{Config, init_tracing, serve, shutdown_signal};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> common::Result<()> {
    // Tracing is not up yet, so configuration errors go to stderr.
    let config = Config::load()
        .inspect_err(|e| eprintln!("Configuration error: {e}"))
        .map_err(common::Error::config)?;

    let _telemetry_guard = init_tracing(&config.logging, &config.telemetry)?;

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    if let Err(e) = serve(&config, shutdown).await {
        tracing::error!(error = %e, "srvmon-server failed");
        return Err(e);
    }

    // Telemetry guard will flush spans on drop
    Ok(())
}
