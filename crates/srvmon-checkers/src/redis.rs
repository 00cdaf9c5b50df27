//! Redis PING probe.

use crate::{DEFAULT_TIMEOUT, connection_result, probe};
use async_trait::async_trait;
use redis::{ErrorKind, IntoConnectionInfo, RedisError};
use srvmon::{CheckContext, CheckError, CheckResult, Checker};
use std::time::Duration;
use tracing::debug;

/// Reports UP when the server answers `PING` with `PONG`, after an
/// optional `AUTH`
#[derive(Clone)]
pub struct RedisChecker {
    name: String,
    address: String,
    password: Option<String>,
    critical: bool,
    timeout: Duration,
}

impl RedisChecker {
    /// Create a new Redis checker for `host:port`
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            password: None,
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

    /// Authenticate with `password` before pinging
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    async fn ping(&self) -> Result<(), RedisError> {
        let mut info = format!("redis://{}", self.address).into_connection_info()?;
        // Set after parsing so the password needs no URL escaping.
        info.redis.password = self.password.clone();

        let client = redis::Client::open(info)?;
        let mut conn = client.get_multiplexed_async_connection().await?;

        let reply: String = redis::cmd("PING").query_async(&mut conn).await?;
        if reply != "PONG" {
            return Err((ErrorKind::ResponseError, "unexpected PING reply", reply).into());
        }
        Ok(())
    }
}

impl std::fmt::Debug for RedisChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisChecker")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("critical", &self.critical)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl Checker for RedisChecker {
    fn is_critical(&self, _ctx: &CheckContext) -> bool {
        self.critical
    }

    async fn check(&self, ctx: &CheckContext) -> Result<CheckResult, CheckError> {
        let outcome = probe(ctx, self.timeout, self.ping()).await;
        debug!(name = %self.name, address = %self.address, ok = outcome.is_ok(), "Redis probe");

        Ok(connection_result(&self.name, outcome))
    }
}
