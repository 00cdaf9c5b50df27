//! Health report types and monitor configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime};

/// Reason reported by readiness while the service has not been marked ready.
pub const NOT_READY_REASON: &str = "service is not ready";

/// Status of a single dependency or of the whole service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Dependency answered as expected
    #[serde(rename = "STATUS_UP")]
    Up,
    /// Dependency is unreachable or misbehaving
    #[serde(rename = "STATUS_DOWN")]
    Down,
    /// Service works, but a non-critical dependency is down
    #[serde(rename = "STATUS_DEGRADED")]
    Degraded,
    /// No verdict could be made
    #[serde(rename = "STATUS_UNKNOWN")]
    #[serde(other)]
    Unknown,
}

impl Status {
    /// Wire name of the status, as used by both transports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Up => "STATUS_UP",
            Status::Down => "STATUS_DOWN",
            Status::Degraded => "STATUS_DEGRADED",
            Status::Unknown => "STATUS_UNKNOWN",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one dependency probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Dependency name
    pub name: String,

    /// Observed status
    pub status: Status,

    /// Human-readable summary
    #[serde(default)]
    pub message: String,

    /// Underlying probe error, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// When the probe finished
    #[serde(with = "humantime_serde")]
    pub timestamp: SystemTime,
}

impl CheckResult {
    /// Create a result stamped with the current time
    pub fn new(name: impl Into<String>, status: Status, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status,
            message: message.into(),
            error: None,
            timestamp: SystemTime::now(),
        }
    }

    /// Create an UP result
    pub fn up(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, Status::Up, message)
    }

    /// Create a DOWN result
    pub fn down(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, Status::Down, message)
    }

    /// Attach the underlying probe error
    pub fn with_error(mut self, error: impl fmt::Display) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Check if the dependency was observed DOWN
    pub fn is_down(&self) -> bool {
        self.status == Status::Down
    }
}

/// Aggregated service health.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: Status,
    pub version: String,
    /// One entry per registered checker, in registration order
    pub checks: Vec<CheckResult>,
    #[serde(with = "humantime_serde")]
    pub timestamp: SystemTime,
}

/// Whether the service should receive traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub reason: String,
    pub checks: Vec<CheckResult>,
    #[serde(with = "humantime_serde")]
    pub timestamp: SystemTime,
}

impl ReadinessResponse {
    /// Response given before the service has been marked ready
    pub fn not_ready() -> Self {
        Self {
            ready: false,
            reason: NOT_READY_REASON.to_string(),
            checks: Vec::new(),
            timestamp: SystemTime::now(),
        }
    }
}

/// How DOWN results are folded into the service status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationPolicy {
    /// The first DOWN result in registration order fixes the verdict:
    /// DOWN when that checker is critical, DEGRADED otherwise.
    #[default]
    FirstDown,

    /// Order-independent: DOWN if any critical checker is DOWN, else
    /// DEGRADED if any checker is DOWN, else UP.
    Classify,
}

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Service version reported by health
    #[serde(default)]
    pub version: String,

    /// gRPC listen address (`host:port`, or `:port` for all interfaces)
    #[serde(default = "default_grpc_address")]
    pub grpc_address: String,

    /// REST listen address (`host:port`, or `:port` for all interfaces)
    #[serde(default = "default_http_address")]
    pub http_address: String,

    /// Upper bound for one REST request, also the evaluation deadline
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Status aggregation policy
    #[serde(default)]
    pub policy: AggregationPolicy,
}

fn default_grpc_address() -> String {
    ":50051".to_string()
}

fn default_http_address() -> String {
    ":8080".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            version: String::new(),
            grpc_address: default_grpc_address(),
            http_address: default_http_address(),
            request_timeout: default_request_timeout(),
            policy: AggregationPolicy::default(),
        }
    }
}
