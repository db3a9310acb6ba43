//! HTTP client that waits out provider rate limiting.
//!
//! A `429 Too Many Requests` answer is retried indefinitely after sleeping for
//! the server's `Retry-After` plus one second. Any other failure is logged and
//! surfaces as `None`, so a single bad request never aborts a stage.

use crate::provider::errors::ProviderError;
use crate::utils::fmt_duration;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, StatusCode};
use serde::Serialize;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, trace, warn};
use url::Url;

/// Extra wait added on top of the server-provided backoff.
const BACKOFF_PADDING: Duration = Duration::from_secs(1);

pub struct RateLimitedClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    alive: AtomicBool,
    pacing: Option<DefaultDirectRateLimiter>,
}

impl RateLimitedClient {
    /// A trailing `/` is added to `base_url` so relative paths join beneath it.
    pub fn new(
        mut base_url: Url,
        token: Option<String>,
        timeout: Duration,
        requests_per_second: Option<u32>,
    ) -> Result<Self, ProviderError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("guidebuilder/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| ProviderError::Request {
                url: base_url.to_string(),
                source,
            })?;

        let pacing = requests_per_second
            .and_then(NonZeroU32::new)
            .map(|rps| RateLimiter::direct(Quota::per_second(rps)));

        Ok(Self {
            http,
            base_url,
            token,
            alive: AtomicBool::new(true),
            pacing,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    /// Marks the client as unusable; rate-limited requests are then not retried.
    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Relaxed);
    }

    fn url(&self, path: &str) -> Result<Url, ProviderError> {
        self.base_url
            .join(path)
            .map_err(|e| ProviderError::ParseFailed {
                url: path.to_string(),
                source: anyhow::Error::new(e),
            })
    }

    /// GET `path` relative to the base URL.
    pub async fn get(&self, path: &str) -> Option<String> {
        let url = self.url(path).map_err(log_failure).ok()?;
        self.send_logged(&url, || self.http.get(url.clone())).await
    }

    /// POST a JSON body to `path` relative to the base URL.
    pub async fn post_json<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Option<String> {
        let url = self.url(path).map_err(log_failure).ok()?;
        self.send_logged(&url, || self.http.post(url.clone()).json(body))
            .await
    }

    async fn send_logged<F>(&self, url: &Url, build: F) -> Option<String>
    where
        F: Fn() -> RequestBuilder,
    {
        match self.send(url, build).await {
            Ok(body) => Some(body),
            Err(e) => {
                log_failure(e);
                None
            }
        }
    }

    /// Sends until the provider answers with something other than a rate limit.
    pub async fn send<F>(&self, url: &Url, build: F) -> Result<String, ProviderError>
    where
        F: Fn() -> RequestBuilder,
    {
        let start = Instant::now();
        let mut attempts: u32 = 0;

        loop {
            attempts += 1;
            if let Some(pacing) = &self.pacing {
                pacing.until_ready().await;
            }

            match self.attempt(url, &build).await {
                Err(ProviderError::RateLimited(wait)) if self.is_alive() => {
                    let delay = wait + BACKOFF_PADDING;
                    warn!(
                        url = %url,
                        attempts,
                        delay = fmt_duration(delay),
                        "Provider requested backoff"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(ProviderError::RateLimited(_)) => return Err(ProviderError::Offline),
                Ok(body) => {
                    debug!(
                        url = %url,
                        attempts,
                        bytes = body.len(),
                        duration = fmt_duration(start.elapsed()),
                        "Provider request completed"
                    );
                    return Ok(body);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn attempt<F>(&self, url: &Url, build: &F) -> Result<String, ProviderError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut request = build();
        if let Some(token) = &self.token {
            request = request.header("token", token);
        }
        trace!(url = %url, "Sending provider request");

        let request_err = |source| ProviderError::Request {
            url: url.to_string(),
            source,
        };
        let response = request.send().await.map_err(request_err)?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::RateLimited(retry_after(response.headers())));
        }
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        response.text().await.map_err(request_err)
    }
}

/// Server-provided wait from a `Retry-After` header in whole seconds; zero when absent.
fn retry_after(headers: &HeaderMap) -> Duration {
    headers
        .get(RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or_default()
}

fn log_failure(e: ProviderError) {
    match &e {
        ProviderError::Status { status, url } => {
            error!(status, url, "Provider request failed");
        }
        ProviderError::Offline => warn!("Provider client offline, request dropped"),
        _ => error!(error = ?e, "Provider request failed"),
    }
}
