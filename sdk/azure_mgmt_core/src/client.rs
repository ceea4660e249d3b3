//! HTTP client for Azure Resource Manager.
//!
//! This module provides [`ArmClient`], the main entry point for talking to the
//! management plane. The client handles authentication, HTTP transport,
//! retry of transient failures, and `api-version` handling. It implements
//! [`Transport`], which is what the long-running operation and paging layers
//! depend on.
//!
//! # Examples
//!
//! ## Using a pre-acquired token
//! ```rust,no_run
//! use azure_mgmt_core::client::ArmClient;
//! use azure_mgmt_core::auth::ArmCredential;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArmClient::builder()
//!     .credential(ArmCredential::access_token("eyJ0eXAi..."))
//!     .subscription_id("00000000-0000-0000-0000-000000000000")
//!     .build()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Using the Azure CLI
//! ```rust,no_run
//! use azure_mgmt_core::client::ArmClient;
//! use azure_mgmt_core::auth::ArmCredential;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArmClient::builder()
//!     .credential(ArmCredential::azure_cli()?)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client as HttpClient;
use url::Url;

use std::time::Duration;

use crate::auth::ArmCredential;
use crate::error::{ArmError, ArmResult};
use crate::retry_after;
use crate::transport::{ArmRequest, RawResponse, Transport};

/// Public-cloud Azure Resource Manager endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://management.azure.com";

/// Default `api-version` appended to requests that don't carry one.
pub const DEFAULT_API_VERSION: &str = "2021-04-01";

/// Environment variable overriding the management endpoint.
pub const ENDPOINT_ENV: &str = "AZURE_RESOURCE_MANAGER_ENDPOINT";

/// Environment variable holding the default subscription.
pub const SUBSCRIPTION_ID_ENV: &str = "AZURE_SUBSCRIPTION_ID";

/// Default connection timeout (10 seconds).
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default read/response timeout (60 seconds).
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum length for error messages placed in [`ArmError`].
const MAX_ERROR_MESSAGE_LEN: usize = 1000;

const REDACTED: &str = "[REDACTED]";

/// Determines if an HTTP status code represents a retriable error.
///
/// Retriable errors are transient server-side issues that may succeed on retry:
/// - 429 Too Many Requests (rate limiting)
/// - 500 Internal Server Error
/// - 502 Bad Gateway
/// - 503 Service Unavailable
/// - 504 Gateway Timeout
#[inline]
pub fn is_retriable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Configuration for automatic retry behavior on transient errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (not counting the initial request).
    pub max_retries: u32,
    /// Initial backoff duration before the first retry.
    /// Subsequent retries use exponential backoff (2^attempt * initial_backoff).
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based), with ±25% jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self
            .initial_backoff
            .saturating_mul(2_u32.saturating_pow(attempt));
        let jitter = 0.75 + fastrand::f64() * 0.5; // 0.75 to 1.25
        base.mul_f64(jitter)
    }
}

/// The base client for Azure Resource Manager.
///
/// The client is cheaply cloneable and can be shared across threads.
#[derive(Debug, Clone)]
pub struct ArmClient {
    pub(crate) http: HttpClient,
    pub(crate) endpoint: Url,
    pub(crate) credential: ArmCredential,
    pub(crate) api_version: String,
    pub(crate) scope: String,
    pub(crate) subscription_id: Option<String>,
    pub(crate) retry_policy: RetryPolicy,
}

/// Builder for constructing an [`ArmClient`].
///
/// Use [`ArmClient::builder()`] to create a new builder.
#[derive(Debug, Default)]
pub struct ArmClientBuilder {
    endpoint: Option<String>,
    credential: Option<ArmCredential>,
    api_version: Option<String>,
    scope: Option<String>,
    subscription_id: Option<String>,
    http_client: Option<HttpClient>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    retry_policy: Option<RetryPolicy>,
}

impl ArmClient {
    /// Create a new builder for configuring an `ArmClient`.
    pub fn builder() -> ArmClientBuilder {
        ArmClientBuilder::default()
    }

    /// Get the base endpoint URL.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Get the default API version.
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Get the token scope requested from token credentials.
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Get the configured subscription.
    pub fn subscription_id(&self) -> ArmResult<&str> {
        self.subscription_id.as_deref().ok_or_else(|| {
            ArmError::MissingConfig(format!(
                "subscription_id is required. Set it via builder or {SUBSCRIPTION_ID_ENV} env var."
            ))
        })
    }

    /// Get the retry policy configuration.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Build a full URL for an API path.
    ///
    /// `path` is resolved against the endpoint. An absolute URL, such as a
    /// status URL on a regional host, is used as-is but must be HTTPS when
    /// its origin differs from the endpoint's.
    ///
    /// Appends the default `api-version` query parameter unless the path
    /// already carries one (as `nextLink` and status URLs do).
    pub fn url(&self, path: &str) -> ArmResult<Url> {
        let mut url = self
            .endpoint
            .join(path)
            .map_err(|e| ArmError::invalid_endpoint_with_source("failed to construct URL", e))?;

        if url.origin() != self.endpoint.origin() && url.scheme() != "https" {
            return Err(ArmError::InvalidEndpoint {
                message: format!(
                    "refusing to send credentials to non-HTTPS host {}",
                    url.host_str().unwrap_or_default()
                ),
                source: None,
            });
        }

        if !url.query_pairs().any(|(key, _)| key == "api-version") {
            url.query_pairs_mut()
                .append_pair("api-version", &self.api_version);
        }
        Ok(url)
    }

    /// Send a GET request and fail on non-2xx responses.
    pub async fn get(&self, path: &str) -> ArmResult<RawResponse> {
        self.execute(ArmRequest::get(path)).await?.error_for_status()
    }

    /// Send a PUT request with a JSON body and fail on non-2xx responses.
    pub async fn put<T: serde::Serialize>(&self, path: &str, body: &T) -> ArmResult<RawResponse> {
        let request = ArmRequest::new(reqwest::Method::PUT, path).with_json(body)?;
        self.execute(request).await?.error_for_status()
    }

    /// Send a DELETE request and fail on non-2xx responses.
    pub async fn delete(&self, path: &str) -> ArmResult<RawResponse> {
        self.execute(ArmRequest::delete(path)).await?.error_for_status()
    }

    /// Send a request, retrying retriable status codes with exponential backoff.
    ///
    /// A server-supplied retry-after delay replaces the computed backoff. The
    /// last response is returned as-is once retries are exhausted.
    async fn send_with_retry(&self, request: &ArmRequest) -> ArmResult<RawResponse> {
        let url = self.url(&request.path)?;
        let auth = self.credential.resolve(&self.scope).await?;

        let mut attempt = 0u32;
        loop {
            let mut builder = self
                .http
                .request(request.method.clone(), url.clone())
                .header(AUTHORIZATION, &auth);
            if let Some(body) = &request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            let status = response.status().as_u16();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            let raw = RawResponse::new(status, headers, body);

            if raw.is_success()
                || !is_retriable_status(status)
                || attempt >= self.retry_policy.max_retries
            {
                return Ok(raw);
            }

            let delay = retry_after::from_headers(&raw.headers)
                .unwrap_or_else(|| self.retry_policy.backoff(attempt));
            tracing::debug!(
                status,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "retriable status, backing off"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl Transport for ArmClient {
    async fn execute(&self, request: ArmRequest) -> ArmResult<RawResponse> {
        self.send_with_retry(&request).await
    }
}

/// Redact bearer tokens and SAS signatures from a service message.
pub(crate) fn sanitize_error_message(msg: &str) -> String {
    let without_tokens = redact_values(msg, "Bearer ");
    redact_values(&without_tokens, "sig=")
}

/// Replace the value following each occurrence of `marker` with `[REDACTED]`.
fn redact_values(msg: &str, marker: &str) -> String {
    let mut out = String::with_capacity(msg.len());
    let mut rest = msg;

    while let Some(pos) = rest.find(marker) {
        let value_start = pos + marker.len();
        out.push_str(&rest[..value_start]);

        let tail = &rest[value_start..];
        let value_len = tail
            .find(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | ',' | '&'))
            .unwrap_or(tail.len());
        if value_len > 0 {
            out.push_str(REDACTED);
        }
        rest = &tail[value_len..];
    }

    out.push_str(rest);
    out
}

/// Sanitize, then truncate a message to [`MAX_ERROR_MESSAGE_LEN`] bytes.
pub(crate) fn truncate_message(msg: &str) -> String {
    let sanitized = sanitize_error_message(msg);
    if sanitized.len() <= MAX_ERROR_MESSAGE_LEN {
        return sanitized;
    }

    let mut end = MAX_ERROR_MESSAGE_LEN;
    while !sanitized.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &sanitized[..end])
}

impl ArmClientBuilder {
    /// Set the management endpoint URL.
    ///
    /// If not set, the builder checks the `AZURE_RESOURCE_MANAGER_ENDPOINT`
    /// environment variable and falls back to [`DEFAULT_ENDPOINT`].
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the credential to use for authentication.
    ///
    /// If not set, the builder uses [`ArmCredential::from_env()`].
    pub fn credential(mut self, credential: ArmCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the default API version.
    ///
    /// Defaults to [`DEFAULT_API_VERSION`].
    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Set the token scope. Defaults to `<endpoint>/.default`.
    pub fn scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Set the default subscription.
    ///
    /// If not set, the builder checks the `AZURE_SUBSCRIPTION_ID` environment variable.
    pub fn subscription_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = Some(subscription_id.into());
        self
    }

    /// Set a custom HTTP client.
    ///
    /// **Note:** If you provide a custom HTTP client, any timeout configuration
    /// on this builder is ignored.
    pub fn http_client(mut self, client: HttpClient) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the read timeout, covering the whole request/response cycle.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Set the retry policy for transient errors.
    ///
    /// Defaults to 3 retries with 500ms initial backoff.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    /// Build the `ArmClient`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The endpoint URL is invalid
    /// - The HTTP client cannot be constructed
    /// - Credential creation fails (when using environment-based credentials)
    pub fn build(self) -> ArmResult<ArmClient> {
        let http = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .connect_timeout(self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT))
                .timeout(self.read_timeout.unwrap_or(DEFAULT_READ_TIMEOUT))
                .build()?,
        };

        let endpoint_str = self
            .endpoint
            .or_else(|| std::env::var(ENDPOINT_ENV).ok())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());

        let endpoint = Url::parse(&endpoint_str)
            .map_err(|e| ArmError::invalid_endpoint_with_source("invalid endpoint URL", e))?;

        let scope = self
            .scope
            .unwrap_or_else(|| format!("{}/.default", endpoint.as_str().trim_end_matches('/')));

        let credential = match self.credential {
            Some(credential) => credential,
            None => ArmCredential::from_env()?,
        };

        Ok(ArmClient {
            http,
            endpoint,
            credential,
            api_version: self
                .api_version
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            scope,
            subscription_id: self
                .subscription_id
                .or_else(|| std::env::var(SUBSCRIPTION_ID_ENV).ok()),
            retry_policy: self.retry_policy.unwrap_or_default(),
        })
    }
}
