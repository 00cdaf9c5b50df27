//! Probe construction errors.

use thiserror::Error;

/// A probe could not be built from its settings
#[derive(Debug, Error)]
pub enum ProbeBuildError {
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid grpc endpoint {endpoint:?}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: tonic::transport::Error,
    },

    #[error("http client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
