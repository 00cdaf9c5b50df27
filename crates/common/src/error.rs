//! Common error types for srvmon binaries.

use std::fmt;

/// A specialized Result type for srvmon operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for srvmon operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Monitor error: {0}")]
    Monitor(String),

    #[error("Checker error: {0}")]
    Checker(String),

    #[error("Telemetry error: {0}")]
    Telemetry(String),
}

impl Error {
    /// Create a new configuration error.
    pub fn config(msg: impl fmt::Display) -> Self {
        Error::Config(msg.to_string())
    }

    /// Create a new monitor error.
    pub fn monitor(msg: impl fmt::Display) -> Self {
        Error::Monitor(msg.to_string())
    }

    /// Create a new checker error.
    pub fn checker(msg: impl fmt::Display) -> Self {
        Error::Checker(msg.to_string())
    }

    /// Create a new telemetry error.
    pub fn telemetry(msg: impl fmt::Display) -> Self {
        Error::Telemetry(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::config("missing version").to_string(),
            "Configuration error: missing version"
        );
        assert_eq!(
            Error::monitor("listen :50051").to_string(),
            "Monitor error: listen :50051"
        );
    }

    #[test]
    fn test_helpers_pick_variant() {
        assert!(matches!(Error::checker("invalid url"), Error::Checker(_)));
        assert!(matches!(Error::telemetry("exporter"), Error::Telemetry(_)));
    }
}
