//! Error types for checkers, evaluation and the monitor lifecycle.

use thiserror::Error;

/// Boxed error used as the source of a checker fault.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A checker could not run at all.
///
/// This is not a DOWN dependency: probes report unreachable dependencies
/// as a DOWN [`CheckResult`](crate::CheckResult). A `CheckError` aborts the
/// whole evaluation.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CheckError {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl CheckError {
    /// Create a new checker fault
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Create a checker fault caused by another error
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Fault description
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A Health or Ready evaluation was aborted.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("dependency check: {0}")]
    Dependency(#[from] CheckError),
}

/// The caller gave up on an evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    #[error("context canceled")]
    Cancelled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Monitor lifecycle errors
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("listen grpc {address}: {source}")]
    GrpcBind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Never returned by `Monitor::run`, which logs it and keeps serving gRPC.
    #[error("listen rest {address}: {source}")]
    RestBind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("monitor already started")]
    AlreadyStarted,
}
