//! Process wiring: monitor construction, readiness delay and signals.

use crate::config::Config;
use srvmon::{Lifecycle, Monitor};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Build the monitor described by `config`
pub fn build_monitor(config: &Config) -> common::Result<Monitor> {
    let checkers = config.build_checkers().map_err(common::Error::checker)?;

    let mut monitor = Monitor::new(config.monitor_config());
    monitor.add_dependencies(checkers);
    Ok(monitor)
}

/// Serve until `shutdown` is cancelled
///
/// The service is marked ready `ready_delay` after both listeners are up.
pub async fn serve(config: &Config, shutdown: CancellationToken) -> common::Result<()> {
    let monitor = Arc::new(build_monitor(config)?);
    info!(
        version = %monitor.version(),
        dependencies = monitor.dependencies().len(),
        "Starting srvmon-server"
    );

    tokio::spawn(mark_ready(
        monitor.clone(),
        config.service.ready_delay,
        shutdown.clone(),
    ));

    monitor.run(shutdown).await.map_err(common::Error::monitor)
}

/// Mark `monitor` ready once it is running and `delay` has passed
pub async fn mark_ready(monitor: Arc<Monitor>, delay: Duration, shutdown: CancellationToken) {
    tokio::select! {
        _ = shutdown.cancelled() => {}
        _ = async {
            // A failed run reports Stopped here and skips the delay.
            if monitor.wait_until(Lifecycle::Running).await == Lifecycle::Running {
                tokio::time::sleep(delay).await;
            }
        } => {
            // Never flip readiness on a monitor that is already going away.
            if monitor.lifecycle() == Lifecycle::Running {
                monitor.set_ready();
            }
        }
    }
}

/// Cancel `token` on SIGINT or SIGTERM
pub async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
    token.cancel();
}
