//! Peer gRPC health probe using the standard `grpc.health.v1` protocol.

use crate::{DEFAULT_TIMEOUT, ProbeBuildError, probe};
use async_trait::async_trait;
use srvmon::{CheckContext, CheckError, CheckResult, Checker};
use std::sync::OnceLock;
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic_health::pb::HealthCheckRequest;
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tracing::debug;

/// Reports UP when a peer's health service answers `SERVING` for `service`.
///
/// The channel is created lazily on the first check and reused afterwards.
#[derive(Debug)]
pub struct PeerHealthChecker {
    name: String,
    endpoint: Endpoint,
    service: String,
    critical: bool,
    timeout: Duration,
    channel: OnceLock<Channel>,
}

impl PeerHealthChecker {
    /// Create a new peer checker for `endpoint`, e.g. `http://orders:50051`
    pub fn new(name: impl Into<String>, endpoint: &str) -> Result<Self, ProbeBuildError> {
        let parsed = Endpoint::from_shared(endpoint.to_string()).map_err(|source| {
            ProbeBuildError::InvalidEndpoint {
                endpoint: endpoint.to_string(),
                source,
            }
        })?;

        Ok(Self {
            name: name.into(),
            endpoint: parsed,
            service: String::new(),
            critical: false,
            timeout: DEFAULT_TIMEOUT,
            channel: OnceLock::new(),
        })
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Service name to ask about; empty means the whole server
    pub fn service(mut self, service: impl Into<String>) -> Self {
        self.service = service.into();
        self
    }

    fn client(&self) -> HealthClient<Channel> {
        let channel = self.channel.get_or_init(|| {
            self.endpoint
                .clone()
                .connect_timeout(self.timeout)
                .connect_lazy()
        });
        HealthClient::new(channel.clone())
    }
}

#[async_trait]
impl Checker for PeerHealthChecker {
    fn is_critical(&self, _ctx: &CheckContext) -> bool {
        self.critical
    }

    async fn check(&self, ctx: &CheckContext) -> Result<CheckResult, CheckError> {
        let mut client = self.client();
        let request = HealthCheckRequest {
            service: self.service.clone(),
        };

        let result = match probe(ctx, self.timeout, client.check(request)).await {
            Ok(response) => {
                let status = response.into_inner().status();
                match status {
                    ServingStatus::Serving => CheckResult::up(&self.name, status.as_str_name()),
                    _ => CheckResult::down(&self.name, status.as_str_name())
                        .with_error(format!("peer reports {}", status.as_str_name())),
                }
            }
            Err(error) => CheckResult::down(&self.name, "health check failed").with_error(error),
        };
        debug!(name = %self.name, service = %self.service, status = %result.status, "Peer health probe");

        Ok(result)
    }
}
