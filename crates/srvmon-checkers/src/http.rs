//! HTTP GET probe.

use crate::{DEFAULT_TIMEOUT, ProbeBuildError, probe};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use srvmon::{CheckContext, CheckError, CheckResult, Checker};
use std::time::Duration;
use tracing::debug;

/// Reports UP when a GET on `url` answers with an expected status code.
///
/// With no expected codes configured any 2xx status is accepted.
#[derive(Debug, Clone)]
pub struct HttpChecker {
    name: String,
    url: Url,
    expected_codes: Vec<u16>,
    critical: bool,
    timeout: Duration,
    client: Client,
}

impl HttpChecker {
    /// Create a new HTTP checker; `url` must be an absolute http(s) URL
    pub fn new(name: impl Into<String>, url: &str) -> Result<Self, ProbeBuildError> {
        let invalid = |reason: String| ProbeBuildError::InvalidUrl {
            url: url.to_string(),
            reason,
        };
        let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {}", parsed.scheme())));
        }

        Ok(Self {
            name: name.into(),
            url: parsed,
            expected_codes: Vec::new(),
            critical: false,
            timeout: DEFAULT_TIMEOUT,
            client: Client::builder().build()?,
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

    /// Accept only these status codes
    pub fn expected_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.expected_codes = codes.into_iter().collect();
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    fn accepts(&self, status: StatusCode) -> bool {
        if self.expected_codes.is_empty() {
            status.is_success()
        } else {
            self.expected_codes.contains(&status.as_u16())
        }
    }
}

#[async_trait]
impl Checker for HttpChecker {
    fn is_critical(&self, _ctx: &CheckContext) -> bool {
        self.critical
    }

    async fn check(&self, ctx: &CheckContext) -> Result<CheckResult, CheckError> {
        let request = self.client.get(self.url.clone()).send();

        let result = match probe(ctx, self.timeout, request).await {
            Ok(response) if self.accepts(response.status()) => {
                CheckResult::up(&self.name, format!("status code: {}", response.status().as_u16()))
            }
            Ok(response) => {
                let status = response.status();
                CheckResult::down(
                    &self.name,
                    format!("unexpected status code: {}", status.as_u16()),
                )
                .with_error(status)
            }
            Err(error) => CheckResult::down(&self.name, "request failed").with_error(error),
        };
        debug!(name = %self.name, url = %self.url, status = %result.status, "HTTP probe");

        Ok(result)
    }
}
