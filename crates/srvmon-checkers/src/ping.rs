//! Adapter for clients that already know how to ping their backend.

use crate::{DEFAULT_TIMEOUT, connection_result, probe};
use async_trait::async_trait;
use srvmon::{BoxError, CheckContext, CheckError, CheckResult, Checker};
use std::time::Duration;

/// Something that can check its own connection, such as a database pool.
///
/// Implemented for closures returning a future, so
/// `PingChecker::new("db", move || { let pool = pool.clone(); async move { ... } })`
/// works without a wrapper type.
#[async_trait]
pub trait Pinger: Send + Sync {
    async fn ping(&self) -> Result<(), BoxError>;
}

#[async_trait]
impl<F, Fut> Pinger for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), BoxError>> + Send,
{
    async fn ping(&self) -> Result<(), BoxError> {
        self().await
    }
}

/// Turns a [`Pinger`] into a [`Checker`]
pub struct PingChecker<P> {
    name: String,
    pinger: P,
    critical: bool,
    timeout: Duration,
}

impl<P: Pinger> PingChecker<P> {
    /// Create a new ping checker
    pub fn new(name: impl Into<String>, pinger: P) -> Self {
        Self {
            name: name.into(),
            pinger,
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
}

#[async_trait]
impl<P: Pinger> Checker for PingChecker<P> {
    fn is_critical(&self, _ctx: &CheckContext) -> bool {
        self.critical
    }

    async fn check(&self, ctx: &CheckContext) -> Result<CheckResult, CheckError> {
        let outcome = probe(ctx, self.timeout, self.pinger.ping()).await;
        Ok(connection_result(&self.name, outcome))
    }
}
