//! srvmon-server: a standalone srvmon monitor driven by a YAML file.
//!
//! # Components
//!
//! - **config**: YAML loading, validation and probe construction
//! - **telemetry**: tracing subscriber with optional OTLP export
//! - **server**: monitor wiring, delayed readiness and signal handling

pub mod config;
pub mod server;
pub mod telemetry;

pub use config::{Config, ConfigError};
pub use server::{build_monitor, mark_ready, serve, shutdown_signal};
pub use telemetry::{TelemetryGuard, init_tracing};
