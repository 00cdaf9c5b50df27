//! REST adapter: JSON health and readiness endpoints.

use crate::checker::CheckContext;
use crate::error::MonitorError;
use crate::monitor::{Monitor, display_host, listen_address};
use axum::{
    Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

/// Headroom of the request timeout over the evaluation deadline, so a
/// deadline-bound evaluation still produces its report.
const TIMEOUT_MARGIN: Duration = Duration::from_secs(1);

/// Build the REST router: `/health`, `/healthz`, `/ready`, `/readyz`
///
/// Evaluations run under `request_timeout`. Only a checker that ignores its
/// context trips the outer timeout, which answers 503.
pub fn router(monitor: Arc<Monitor>) -> Router {
    let request_timeout = monitor.config().request_timeout + TIMEOUT_MARGIN;

    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/readyz", get(ready_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::SERVICE_UNAVAILABLE,
                    request_timeout,
                )),
        )
        .with_state(monitor)
}

/// Handler for the health endpoints
async fn health_handler(State(monitor): State<Arc<Monitor>>) -> Response {
    let ctx = CheckContext::new().with_timeout(monitor.config().request_timeout);
    match monitor.health(&ctx).await {
        Ok(report) => json_response(&report),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

/// Handler for the readiness endpoints
async fn ready_handler(State(monitor): State<Arc<Monitor>>) -> Response {
    let ctx = CheckContext::new().with_timeout(monitor.config().request_timeout);
    match monitor.ready(&ctx).await {
        Ok(report) => json_response(&report),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

fn json_response<T: Serialize>(body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(data) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            data,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to encode response");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Bound, not yet serving, REST listener.
pub(crate) struct RestServer {
    router: Router,
    listener: TcpListener,
    local_addr: SocketAddr,
}

/// Running REST server.
pub(crate) struct RestHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl RestServer {
    /// Bind the REST listener
    pub(crate) async fn bind(monitor: Arc<Monitor>) -> Result<Self, MonitorError> {
        let address = listen_address(&monitor.config().http_address);
        let bind_err = |source| MonitorError::RestBind {
            address: address.clone(),
            source,
        };

        let listener = TcpListener::bind(&address).await.map_err(bind_err)?;
        let local_addr = listener.local_addr().map_err(bind_err)?;

        Ok(Self {
            router: router(monitor),
            listener,
            local_addr,
        })
    }

    pub(crate) fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Start serving on the bound listener
    pub(crate) fn start(self) -> RestHandle {
        let host = display_host(self.local_addr);
        info!(
            health = %format!("http://{host}/health"),
            ready = %format!("http://{host}/ready"),
            "Starting srvmon REST server"
        );

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        let task = tokio::spawn(async move {
            let serve = axum::serve(self.listener, self.router)
                .with_graceful_shutdown(async move { signal.cancelled().await });
            if let Err(e) = serve.await {
                error!(error = %e, "Serve REST");
            }
        });

        RestHandle { shutdown, task }
    }
}

impl RestHandle {
    /// Stop accepting and wait for in-flight requests to finish
    pub(crate) async fn shutdown(self) -> Result<(), tokio::task::JoinError> {
        self.shutdown.cancel();
        self.task.await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{Checker, MockChecker};
    use crate::error::CheckError;
    use crate::types::{CheckResult, MonitorConfig};
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    /// Sleeps for an hour, optionally giving up at the context deadline
    struct Slow {
        honours_context: bool,
    }

    #[async_trait]
    impl Checker for Slow {
        fn is_critical(&self, _ctx: &CheckContext) -> bool {
            true
        }

        async fn check(&self, ctx: &CheckContext) -> Result<CheckResult, CheckError> {
            let sleep = tokio::time::sleep(Duration::from_secs(3600));
            if !self.honours_context {
                sleep.await;
                return Ok(CheckResult::up("billing", "status code: 200"));
            }
            Ok(match ctx.run(sleep).await {
                Ok(()) => CheckResult::up("billing", "status code: 200"),
                Err(e) => CheckResult::down("billing", "request failed").with_error(e),
            })
        }
    }

    fn monitor_with(checkers: Vec<Arc<dyn Checker>>) -> Arc<Monitor> {
        monitor_with_timeout(checkers, MonitorConfig::default().request_timeout)
    }

    fn monitor_with_timeout(
        checkers: Vec<Arc<dyn Checker>>,
        request_timeout: Duration,
    ) -> Arc<Monitor> {
        let config = MonitorConfig {
            version: "1.0.0".to_string(),
            request_timeout,
            ..MonitorConfig::default()
        };
        let mut monitor = Monitor::new(config);
        monitor.add_dependencies(checkers);
        Arc::new(monitor)
    }

    async fn get(monitor: Arc<Monitor>, path: &str) -> (StatusCode, String) {
        let response = router(monitor)
            .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let mut checker = MockChecker::new();
        checker
            .expect_check()
            .returning(|_| Ok(CheckResult::up("redis", "connection successful")));
        let monitor = monitor_with(vec![Arc::new(checker)]);

        for path in ["/health", "/healthz"] {
            let (status, body) = get(monitor.clone(), path).await;
            assert_eq!(status, StatusCode::OK);

            let json: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(json["status"], "STATUS_UP");
            assert_eq!(json["version"], "1.0.0");
            assert_eq!(json["checks"][0]["name"], "redis");
            assert_eq!(json["checks"][0]["status"], "STATUS_UP");
        }
    }

    #[tokio::test]
    async fn test_ready_endpoints() {
        let monitor = monitor_with(Vec::new());

        for path in ["/ready", "/readyz"] {
            let (status, body) = get(monitor.clone(), path).await;
            assert_eq!(status, StatusCode::OK);

            let json: serde_json::Value = serde_json::from_str(&body).unwrap();
            assert_eq!(json["ready"], false);
            assert_eq!(json["reason"], "service is not ready");
            assert_eq!(json["checks"].as_array().unwrap().len(), 0);
        }

        monitor.set_ready();
        let (_, body) = get(monitor, "/ready").await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["ready"], true);
    }

    #[tokio::test]
    async fn test_execution_fault_is_unavailable() {
        let mut checker = MockChecker::new();
        checker
            .expect_check()
            .returning(|_| Err(CheckError::new("probe misconfigured")));
        let monitor = monitor_with(vec![Arc::new(checker)]);

        let (status, body) = get(monitor, "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body, "dependency check: probe misconfigured");
    }

    #[tokio::test(start_paused = true)]
    async fn test_evaluation_deadline_yields_report() {
        let checker: Arc<dyn Checker> = Arc::new(Slow {
            honours_context: true,
        });
        let monitor = monitor_with_timeout(vec![checker], Duration::from_millis(300));

        let (status, body) = get(monitor, "/health").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "STATUS_DOWN");
        assert_eq!(json["checks"][0]["status"], "STATUS_DOWN");
        assert_eq!(json["checks"][0]["error"], "context deadline exceeded");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stuck_checker_times_out() {
        let checker: Arc<dyn Checker> = Arc::new(Slow {
            honours_context: false,
        });
        let monitor = monitor_with_timeout(vec![checker], Duration::from_millis(300));

        let (status, _) = get(monitor, "/health").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (status, _) = get(monitor_with(Vec::new()), "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
