//! Service health and readiness monitor.
//!
//! A [`Monitor`] owns an ordered set of dependency [`Checker`]s and a
//! one-way readiness flag, and exposes one aggregated verdict over two
//! protocols at the same time:
//! - gRPC: `srvmon.v1.Srvmon/Health` and `/Ready`, plus the standard
//!   `grpc.health.v1.Health` service reporting liveness of the process
//! - REST: `GET /health`, `/healthz`, `/ready`, `/readyz` returning JSON
//!
//! Each request runs every checker once, sequentially, in registration
//! order. See [`aggregate`] for how results are folded.
//!
//! # Example
//!
//! ```no_run
//! use srvmon::{CheckContext, CheckError, CheckResult, Checker, Monitor, MonitorConfig};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! struct AlwaysUp;
//!
//! #[async_trait::async_trait]
//! impl Checker for AlwaysUp {
//!     fn is_critical(&self, _ctx: &CheckContext) -> bool {
//!         true
//!     }
//!
//!     async fn check(&self, _ctx: &CheckContext) -> Result<CheckResult, CheckError> {
//!         Ok(CheckResult::up("always", "ok"))
//!     }
//! }
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = MonitorConfig {
//!     version: "1.0.0".to_string(),
//!     ..MonitorConfig::default()
//! };
//! let monitor = Arc::new(Monitor::new(config).with_dependency(Arc::new(AlwaysUp)));
//!
//! let shutdown = CancellationToken::new();
//! monitor.set_ready();
//! monitor.run(shutdown).await?;
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod checker;
pub mod error;
pub mod grpc;
pub mod monitor;
pub mod rest;
pub mod types;

pub use checker::{CheckContext, Checker};
pub use error::{BoxError, CheckError, EvaluationError, Interrupted, MonitorError};
pub use monitor::{Lifecycle, Monitor};
pub use types::{
    AggregationPolicy, CheckResult, HealthResponse, MonitorConfig, NOT_READY_REASON,
    ReadinessResponse, Status,
};
