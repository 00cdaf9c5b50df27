//! Ready-made dependency probes for srvmon.
//!
//! Each probe implements [`srvmon::Checker`] and follows the same rules:
//! it is named, optionally critical, and bounded by its own timeout on top
//! of whatever deadline the caller's [`CheckContext`] carries. Anything the
//! probe observes, including a timeout or a cancelled request, is reported
//! as a DOWN result. Only construction can fail.
//!
//! ```no_run
//! use srvmon::{Monitor, MonitorConfig};
//! use srvmon_checkers::{HttpChecker, TcpChecker};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn build() -> Result<Monitor, srvmon_checkers::ProbeBuildError> {
//! let monitor = Monitor::new(MonitorConfig::default())
//!     .with_dependency(Arc::new(TcpChecker::new("redis", "127.0.0.1:6379").critical(true)))
//!     .with_dependency(Arc::new(
//!         HttpChecker::new("billing", "http://billing:8080/healthz")?
//!             .timeout(Duration::from_secs(1)),
//!     ));
//! # Ok(monitor)
//! # }
//! ```

pub mod error;
pub mod http;
pub mod peer;
pub mod ping;
pub mod redis;
pub mod tcp;

pub use error::ProbeBuildError;
pub use http::HttpChecker;
pub use peer::PeerHealthChecker;
pub use ping::{PingChecker, Pinger};
pub use redis::RedisChecker;
pub use tcp::TcpChecker;

use srvmon::{CheckContext, CheckResult};
use std::fmt::Display;
use std::time::Duration;

/// Probe timeout used when none is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

pub(crate) const CONNECTION_SUCCESSFUL: &str = "connection successful";
pub(crate) const CONNECTION_FAILED: &str = "connection failed";

/// Run `fut` under the caller's context narrowed by the probe timeout,
/// folding an interruption into the probe's own error text.
pub(crate) async fn probe<F, T, E>(ctx: &CheckContext, timeout: Duration, fut: F) -> Result<T, String>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    let scoped = ctx.clone().with_timeout(timeout);
    match scoped.run(fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(interrupted) => Err(interrupted.to_string()),
    }
}

/// Connection-style result shared by the dial and ping probes
pub(crate) fn connection_result(name: &str, outcome: Result<(), String>) -> CheckResult {
    match outcome {
        Ok(()) => CheckResult::up(name, CONNECTION_SUCCESSFUL),
        Err(error) => CheckResult::down(name, CONNECTION_FAILED).with_error(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use srvmon::Status;
    use std::io;
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn test_probe_completes() {
        let ctx = CheckContext::new();
        let outcome = probe(&ctx, DEFAULT_TIMEOUT, async { Ok::<_, io::Error>(7) }).await;
        assert_eq!(outcome, Ok(7));
    }

    #[tokio::test]
    async fn test_probe_error_text() {
        let ctx = CheckContext::new();
        let outcome = probe(&ctx, DEFAULT_TIMEOUT, async {
            Err::<(), _>(io::Error::new(io::ErrorKind::ConnectionRefused, "refused"))
        })
        .await;
        assert_eq!(outcome, Err("refused".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_timeout() {
        let ctx = CheckContext::new();
        let outcome = probe(
            &ctx,
            Duration::from_millis(10),
            std::future::pending::<Result<(), io::Error>>(),
        )
        .await;
        assert_eq!(outcome, Err("context deadline exceeded".to_string()));
    }

    #[tokio::test]
    async fn test_probe_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let ctx = CheckContext::with_cancellation(token);

        let outcome = probe(
            &ctx,
            DEFAULT_TIMEOUT,
            std::future::pending::<Result<(), io::Error>>(),
        )
        .await;
        assert_eq!(outcome, Err("context canceled".to_string()));
    }

    #[test]
    fn test_connection_result() {
        let up = connection_result("redis", Ok(()));
        assert_eq!(up.status, Status::Up);
        assert_eq!(up.message, "connection successful");
        assert_eq!(up.error, None);

        let down = connection_result("redis", Err("refused".to_string()));
        assert_eq!(down.status, Status::Down);
        assert_eq!(down.message, "connection failed");
        assert_eq!(down.error.as_deref(), Some("refused"));
    }
}
