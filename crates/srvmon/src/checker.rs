//! The dependency probe contract.

use crate::error::{CheckError, Interrupted};
use crate::types::CheckResult;
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A probe for one dependency.
///
/// `check` reports what the probe observed: refused dials, failed pings and
/// bad responses are a DOWN [`CheckResult`], never an `Err`. An `Err` means
/// the probe itself could not run and aborts the whole evaluation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Checker: Send + Sync {
    /// Whether a DOWN result takes the service DOWN rather than DEGRADED
    fn is_critical(&self, ctx: &CheckContext) -> bool;

    /// Probe the dependency
    async fn check(&self, ctx: &CheckContext) -> Result<CheckResult, CheckError>;
}

/// Per-evaluation context handed to every checker.
///
/// Carries the caller's cancellation and deadline so a probe can give up
/// early. The evaluation loop itself adds no timeout.
#[derive(Debug, Clone, Default)]
pub struct CheckContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl CheckContext {
    /// Context without deadline that is never cancelled
    pub fn new() -> Self {
        Self::default()
    }

    /// Context cancelled together with `token`
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            deadline: None,
        }
    }

    /// Tighten the deadline; an earlier existing deadline is kept
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Tighten the deadline to `timeout` from now
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, if there is one
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drive `fut` until it completes, the context is cancelled or the
    /// deadline passes, whichever comes first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Interrupted> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Interrupted::Cancelled),
            _ = deadline => Err(Interrupted::DeadlineExceeded),
            output = fut => Ok(output),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_completes() {
        let ctx = CheckContext::new();
        let output = tokio_test::block_on(ctx.run(async { 42 }));
        assert_eq!(output, Ok(42));
    }

    #[tokio::test]
    async fn test_run_cancelled() {
        let token = CancellationToken::new();
        let ctx = CheckContext::with_cancellation(token.clone());
        token.cancel();

        assert!(ctx.is_cancelled());
        let output = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(output, Err(Interrupted::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_deadline_exceeded() {
        let ctx = CheckContext::new().with_timeout(Duration::from_millis(50));
        let output = ctx
            .run(tokio::time::sleep(Duration::from_secs(10)))
            .await;
        assert_eq!(output, Err(Interrupted::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_only_tightens() {
        let ctx = CheckContext::new().with_timeout(Duration::from_millis(100));
        let first = ctx.deadline().unwrap();

        let ctx = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(first));

        let ctx = ctx.with_timeout(Duration::from_millis(10));
        assert!(ctx.deadline().unwrap() < first);
        assert!(ctx.remaining().unwrap() <= Duration::from_millis(10));
    }
}
