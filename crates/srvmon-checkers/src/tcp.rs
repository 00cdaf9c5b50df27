//! TCP dial probe.

use crate::{DEFAULT_TIMEOUT, connection_result, probe};
use async_trait::async_trait;
use srvmon::{CheckContext, CheckError, CheckResult, Checker};
use std::time::Duration;
use tokio::net::TcpStream;
use tracing::debug;

/// Reports UP when a TCP connection to `address` can be opened
#[derive(Debug, Clone)]
pub struct TcpChecker {
    name: String,
    address: String,
    critical: bool,
    timeout: Duration,
}

impl TcpChecker {
    /// Create a new TCP checker for `host:port`
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            critical: false,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }
}

#[async_trait]
impl Checker for TcpChecker {
    fn is_critical(&self, _ctx: &CheckContext) -> bool {
        self.critical
    }

    async fn check(&self, ctx: &CheckContext) -> Result<CheckResult, CheckError> {
        let outcome = probe(ctx, self.timeout, async {
            TcpStream::connect(self.address.as_str()).await.map(drop)
        })
        .await;
        debug!(name = %self.name, address = %self.address, ok = outcome.is_ok(), "TCP probe");

        Ok(connection_result(&self.name, outcome))
    }
}
