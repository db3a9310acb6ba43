//! Error types for the provider clients.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// "Too many requests"; retried inside the client and never returned to stages.
    #[error("rate limited by provider, retry after {0:?}")]
    RateLimited(Duration),
    #[error("provider returned status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to parse response from {url}")]
    ParseFailed {
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("client is offline after a configuration failure")]
    Offline,
}
