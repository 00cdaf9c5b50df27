//! Dependency monitor and its dual-protocol serving lifecycle.

use crate::aggregate::{evaluate_health, evaluate_readiness};
use crate::checker::{CheckContext, Checker};
use crate::error::{EvaluationError, MonitorError};
use crate::grpc::GrpcServer;
use crate::rest::RestServer;
use crate::types::{HealthResponse, MonitorConfig, ReadinessResponse};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Serving lifecycle of a [`Monitor`]. Only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Lifecycle {
    /// Constructed; checkers may still be registered
    Created,
    /// Listeners are up
    Running,
    /// Cancellation observed, servers shutting down
    Stopping,
    /// Both listeners closed, or `run` failed before serving
    Stopped,
}

/// Owns the registered checkers, the readiness flag and both servers.
///
/// Checkers are registered through `&mut self` before the monitor is
/// wrapped in an `Arc` for [`Monitor::run`], so the checker list is
/// read-only while requests are served.
pub struct Monitor {
    dependencies: Vec<Arc<dyn Checker>>,
    config: MonitorConfig,
    ready: AtomicBool,
    started: AtomicBool,
    lifecycle: watch::Sender<Lifecycle>,
    grpc_addr: OnceLock<SocketAddr>,
    rest_addr: OnceLock<SocketAddr>,
}

impl Monitor {
    /// Create a new monitor without dependencies
    pub fn new(config: MonitorConfig) -> Self {
        let (lifecycle, _) = watch::channel(Lifecycle::Created);
        Self {
            dependencies: Vec::new(),
            config,
            ready: AtomicBool::new(false),
            started: AtomicBool::new(false),
            lifecycle,
            grpc_addr: OnceLock::new(),
            rest_addr: OnceLock::new(),
        }
    }

    /// Register a dependency, builder style
    pub fn with_dependency(mut self, checker: Arc<dyn Checker>) -> Self {
        self.dependencies.push(checker);
        self
    }

    /// Register a dependency
    pub fn add_dependency(&mut self, checker: Arc<dyn Checker>) -> &mut Self {
        self.dependencies.push(checker);
        self
    }

    /// Register several dependencies, keeping their order
    pub fn add_dependencies<I>(&mut self, checkers: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn Checker>>,
    {
        self.dependencies.extend(checkers);
        self
    }

    pub fn dependencies(&self) -> &[Arc<dyn Checker>] {
        &self.dependencies
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    /// Mark the service ready. One-way; later calls are no-ops.
    pub fn set_ready(&self) {
        if self
            .ready
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            info!("Service marked ready");
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Evaluate service health
    pub async fn health(&self, ctx: &CheckContext) -> Result<HealthResponse, EvaluationError> {
        evaluate_health(&self.dependencies, self.version(), self.config.policy, ctx).await
    }

    /// Evaluate readiness
    pub async fn ready(&self, ctx: &CheckContext) -> Result<ReadinessResponse, EvaluationError> {
        evaluate_readiness(&self.dependencies, self.is_ready(), ctx).await
    }

    /// Current lifecycle state
    pub fn lifecycle(&self) -> Lifecycle {
        *self.lifecycle.borrow()
    }

    /// Watch lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<Lifecycle> {
        self.lifecycle.subscribe()
    }

    /// Wait until the lifecycle reaches `state` or a later one, returning
    /// the state observed.
    ///
    /// A `run` that fails to bind gRPC moves straight to
    /// [`Lifecycle::Stopped`], so waiting for `Running` returns `Stopped`
    /// instead of hanging.
    pub async fn wait_until(&self, state: Lifecycle) -> Lifecycle {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so the channel cannot close here.
        match rx.wait_for(|current| *current >= state).await {
            Ok(current) => *current,
            Err(_) => self.lifecycle(),
        }
    }

    /// Bound gRPC address, once running
    pub fn grpc_local_addr(&self) -> Option<SocketAddr> {
        self.grpc_addr.get().copied()
    }

    /// Bound REST address, once running. `None` if the REST listener failed.
    pub fn rest_local_addr(&self) -> Option<SocketAddr> {
        self.rest_addr.get().copied()
    }

    /// Serve both protocols until `shutdown` is cancelled.
    ///
    /// A gRPC bind failure is returned and is meant to be fatal; the
    /// lifecycle moves to [`Lifecycle::Stopped`] without serving. A REST bind
    /// failure is logged and the monitor keeps serving gRPC only. On
    /// cancellation the gRPC server is dropped without grace, then the REST
    /// server is drained; REST shutdown errors are logged.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<(), MonitorError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(MonitorError::AlreadyStarted);
        }

        let grpc = match GrpcServer::bind(self.clone()).await {
            Ok(server) => server,
            Err(e) => {
                self.lifecycle.send_replace(Lifecycle::Stopped);
                return Err(e);
            }
        };
        let _ = self.grpc_addr.set(grpc.local_addr());

        let rest = match RestServer::bind(self.clone()).await {
            Ok(server) => {
                let _ = self.rest_addr.set(server.local_addr());
                Some(server)
            }
            Err(e) => {
                error!(error = %e, "REST server unavailable, serving gRPC only");
                None
            }
        };

        let grpc = grpc.start().await;
        let rest = rest.map(RestServer::start);

        self.lifecycle.send_replace(Lifecycle::Running);
        info!(
            version = %self.version(),
            dependencies = self.dependencies.len(),
            "srvmon running"
        );

        shutdown.cancelled().await;

        self.lifecycle.send_replace(Lifecycle::Stopping);
        info!("Stopping srvmon");

        grpc.stop().await;
        if let Some(rest) = rest {
            if let Err(e) = rest.shutdown().await {
                error!(error = %e, "Shutdown REST server");
            }
        }

        self.lifecycle.send_replace(Lifecycle::Stopped);
        info!("srvmon stopped");
        Ok(())
    }
}

/// Resolve a listen address: a bare `:port` means all interfaces.
pub(crate) fn listen_address(address: &str) -> String {
    if address.starts_with(':') {
        format!("0.0.0.0{address}")
    } else {
        address.to_string()
    }
}

/// Host part for log URLs: unspecified addresses are shown as localhost.
pub(crate) fn display_host(addr: SocketAddr) -> String {
    if addr.ip().is_unspecified() {
        format!("localhost:{}", addr.port())
    } else {
        addr.to_string()
    }
}
