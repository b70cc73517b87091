//! Main Stackzy API client implementation.

use crate::api::*;
use crate::config::{RateLimitConfig, RetryConfig};
use governor::{Quota, RateLimiter};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use stackzy_core::{Result, StackzyError};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// The Stackzy API base URL
const DEFAULT_BASE_URL: &str = "https://api.stackzy.dev/v1";

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Response envelope shared by every endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    #[serde(default)]
    pub error: bool,

    #[serde(default)]
    pub message: String,

    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Unwrap the payload, turning an error envelope into a transport error
    pub fn into_data(self) -> Result<T> {
        if self.error {
            return Err(StackzyError::Transport(self.message));
        }
        self.data
            .ok_or_else(|| StackzyError::transport("response did not contain any data"))
    }

    /// Check the envelope of a write that returns no payload
    pub fn into_ack(self) -> Result<()> {
        if self.error {
            Err(StackzyError::Transport(self.message))
        } else {
            Ok(())
        }
    }
}

/// A failed attempt and whether repeating it may help
struct Attempt {
    error: StackzyError,
    retryable: bool,
}

impl Attempt {
    const fn fatal(error: StackzyError) -> Self {
        Self {
            error,
            retryable: false,
        }
    }

    const fn transient(error: StackzyError) -> Self {
        Self {
            error,
            retryable: true,
        }
    }
}

/// Client for the remote result cache, library catalog and config
#[derive(Clone)]
pub struct StackzyClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: HttpClient,
    api_key: Option<String>,
    base_url: String,
    retry_config: RetryConfig,
    rate_limiter: DirectLimiter,
}

impl StackzyClient {
    /// Create a new client against the default endpoint
    #[must_use]
    pub fn new() -> Self {
        StackzyClientBuilder::new().build()
    }

    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> StackzyClientBuilder {
        StackzyClientBuilder::new()
    }

    /// Access the result cache endpoints
    #[must_use]
    pub fn results(&self) -> ResultsApi<'_> {
        ResultsApi::new(self)
    }

    /// Access the library catalog endpoints
    #[must_use]
    pub fn libraries(&self) -> LibrariesApi<'_> {
        LibrariesApi::new(self)
    }

    /// Access the untracked library endpoints
    #[must_use]
    pub fn untracked(&self) -> UntrackedApi<'_> {
        UntrackedApi::new(self)
    }

    /// Access the remote configuration endpoint
    #[must_use]
    pub fn config(&self) -> ConfigApi<'_> {
        ConfigApi::new(self)
    }

    /// Perform a GET request, retrying transient failures
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Envelope<T>> {
        let url = self.build_url(path, params)?;
        let retry = &self.inner.retry_config;
        let mut attempt = 0;

        loop {
            debug!(url = %url, attempt, "GET request");
            let request = self.authorized(self.inner.http.get(url.clone()));

            match self.send(request).await {
                Ok(envelope) => return Ok(envelope),
                Err(failed) if failed.retryable && attempt < retry.max_retries => {
                    let backoff = retry.backoff_for(attempt);
                    warn!(url = %url, error = %failed.error, ?backoff, "retrying request");
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(failed) => return Err(failed.error),
            }
        }
    }

    /// Perform a POST request with JSON body; never retried
    pub(crate) async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<Envelope<T>> {
        let url = self.build_url(path, &[])?;
        debug!(url = %url, "POST request");

        let request = self.authorized(self.inner.http.post(url).json(body));
        self.send(request).await.map_err(|failed| failed.error)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.inner.api_key {
            Some(key) => request.header("x-api-key", key),
            None => request,
        }
    }

    /// Build a URL with encoded query parameters
    fn build_url(&self, path: &str, params: &[(&str, &str)]) -> Result<url::Url> {
        let raw = format!("{}{}", self.inner.base_url.trim_end_matches('/'), path);
        let mut url = url::Url::parse(&raw)
            .map_err(|e| StackzyError::Config(format!("invalid URL '{raw}': {e}")))?;

        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }

        Ok(url)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> std::result::Result<Envelope<T>, Attempt> {
        self.inner.rate_limiter.until_ready().await;

        let response = request.send().await.map_err(|e| {
            let retryable = e.is_timeout() || e.is_connect();
            Attempt {
                error: StackzyError::transport(e),
                retryable,
            }
        })?;

        self.handle_response(response).await
    }

    /// Decode the envelope, whatever the status code
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> std::result::Result<Envelope<T>, Attempt> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Attempt::transient(StackzyError::transport(e)))?;

        match serde_json::from_str::<Envelope<T>>(&body) {
            Ok(mut envelope) => {
                if !status.is_success() && !envelope.error {
                    envelope.error = true;
                    if envelope.message.is_empty() {
                        envelope.message = format!("HTTP {}", status.as_u16());
                    }
                }
                Ok(envelope)
            }
            Err(e) if status.is_success() => Err(Attempt::fatal(StackzyError::Json(e))),
            Err(_) => {
                let message = if body.trim().is_empty() {
                    format!("HTTP {}", status.as_u16())
                } else {
                    format!("HTTP {}: {}", status.as_u16(), body.trim())
                };
                let error = StackzyError::Transport(message);
                if status.is_server_error() || status.as_u16() == 429 {
                    Err(Attempt::transient(error))
                } else {
                    Err(Attempt::fatal(error))
                }
            }
        }
    }
}

impl Default for StackzyClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for configuring a [`StackzyClient`]
pub struct StackzyClientBuilder {
    api_key: Option<String>,
    base_url: String,
    timeout: Duration,
    user_agent: String,
    retry_config: RetryConfig,
    rate_limit: RateLimitConfig,
}

impl StackzyClientBuilder {
    /// Create a new builder with default settings
    #[must_use]
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("stackzy-rust/{}", env!("CARGO_PKG_VERSION")),
            retry_config: RetryConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }

    /// Set the API key sent with every request
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the base URL (useful for testing)
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the request timeout
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header
    #[must_use]
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    /// Set retry configuration
    #[must_use]
    pub const fn retry(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    /// Set request pacing
    #[must_use]
    pub const fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = config;
        self
    }

    /// Build the client
    #[must_use]
    pub fn build(self) -> StackzyClient {
        let http = HttpClient::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .gzip(true)
            .build()
            .expect("Failed to build HTTP client");

        let per_second = NonZeroU32::new(self.rate_limit.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(self.rate_limit.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(per_second).allow_burst(burst);

        StackzyClient {
            inner: Arc::new(ClientInner {
                http,
                api_key: self.api_key,
                base_url: self.base_url,
                retry_config: self.retry_config,
                rate_limiter: RateLimiter::direct(quota),
            }),
        }
    }
}

impl Default for StackzyClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
