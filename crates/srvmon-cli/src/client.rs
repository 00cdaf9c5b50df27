//! HTTP client for the srvmon REST endpoints.

use crate::view::{HealthView, ReadinessView};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{0}")]
    Unreachable(#[source] reqwest::Error),

    #[error("{status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("parse error: {0}")]
    Decode(#[source] reqwest::Error),
}

impl FetchError {
    /// The server could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, FetchError::Unreachable(_))
    }
}

/// Client bound to one srvmon address
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    addr: String,
}

impl Client {
    /// Create a new client for `host:port`
    pub fn new(addr: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: reqwest::Client::builder().timeout(timeout).build()?,
            addr: addr.into(),
        })
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    pub async fn health(&self) -> Result<HealthView, FetchError> {
        self.get("/health").await
    }

    pub async fn ready(&self) -> Result<ReadinessView, FetchError> {
        self.get("/ready").await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, FetchError> {
        let url = format!("http://{}{}", self.addr, path);
        debug!(url = %url, "Fetching");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(FetchError::Unreachable)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                status,
                body: body.trim().to_string(),
            });
        }

        response.json().await.map_err(FetchError::Decode)
    }
}
