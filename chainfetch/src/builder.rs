//! Client builder.
//!
//! Provides a fluent API for configuring and building a [`Client`].

use std::sync::Arc;
use std::time::Duration;

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue};

use crate::client::Client;
use crate::config::{
    ErrorInterceptor, InterceptorRegistry, Interceptors, RequestInterceptor, ResponseInterceptor,
    RetryPolicy,
};
use crate::error::FetchError;
use crate::transport::{HyperTransport, Transport};
use crate::url::validate_url;

/// Builder for creating a [`Client`].
///
/// # Example
///
/// ```ignore
/// use chainfetch::{Client, RetryPolicy};
/// use std::time::Duration;
///
/// let client = Client::builder()
///     .base_url("https://api.example.com/v1")
///     .timeout(Duration::from_secs(10))
///     .retry(RetryPolicy::retries(2))
///     .build()?;
/// ```
pub struct ClientBuilder {
    /// Base URL that relative request URLs are resolved against.
    base_url: Option<String>,
    /// Headers added to every request built by the client.
    default_headers: HeaderMap,
    /// Per-attempt timeout applied to every request built by the client.
    default_timeout: Option<Duration>,
    /// Retry policy applied to every request built by the client.
    default_retry: RetryPolicy,
    /// Custom transport. Defaults to [`HyperTransport`].
    transport: Option<Arc<dyn Transport>>,
    /// Initial global interceptors.
    interceptors: Interceptors,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("default_headers", &self.default_headers)
            .field("default_timeout", &self.default_timeout)
            .field("default_retry", &self.default_retry)
            .field("transport", &self.transport.is_some())
            .field("interceptors", &self.interceptors)
            .finish()
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Create a builder with no base URL, no timeout and no retries.
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            default_timeout: None,
            default_retry: RetryPolicy::no_retry(),
            transport: None,
            interceptors: Interceptors::new(),
        }
    }

    /// Set the base URL for relative request URLs.
    ///
    /// The base is treated as a directory: `users` and `/users` against
    /// `https://api.example.com/v1` both resolve to
    /// `https://api.example.com/v1/users`.
    pub fn base_url<S: Into<String>>(mut self, base_url: S) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add a header to every request, replacing an earlier default of the
    /// same name.
    pub fn default_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    /// Replace all default headers.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    /// Set the default per-attempt timeout.
    ///
    /// Individual requests can override it with
    /// [`RequestBuilder::timeout`](crate::RequestBuilder::timeout).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    /// Set the default retry policy.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.default_retry = policy;
        self
    }

    /// Use a custom transport instead of [`HyperTransport`].
    ///
    /// # Example
    ///
    /// ```ignore
    /// let transport = HyperTransport::builder().http2_only(true).build()?;
    /// let client = Client::builder().transport(transport).build()?;
    /// ```
    pub fn transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Register a global request interceptor.
    pub fn with_request_interceptor(mut self, interceptor: RequestInterceptor) -> Self {
        self.interceptors.push_request(interceptor);
        self
    }

    /// Register a global response interceptor.
    pub fn with_response_interceptor(mut self, interceptor: ResponseInterceptor) -> Self {
        self.interceptors.push_response(interceptor);
        self
    }

    /// Register a global error interceptor.
    pub fn with_error_interceptor(mut self, interceptor: ErrorInterceptor) -> Self {
        self.interceptors.push_error(interceptor);
        self
    }

    /// Build the Client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is not an absolute http(s) URL, if the
    /// default timeout is zero, if the retry policy is invalid or if the
    /// default transport cannot be created.
    pub fn build(self) -> Result<Client, ClientBuildError> {
        let base_url = match self.base_url {
            Some(base) if !base.trim().is_empty() => {
                validate_url(&base).map_err(ClientBuildError::InvalidBaseUrl)?;
                Some(base)
            }
            _ => None,
        };

        if self.default_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ClientBuildError::InvalidConfig(FetchError::invalid_config(
                "timeout must be a positive duration",
            )));
        }
        self.default_retry
            .validate()
            .map_err(ClientBuildError::InvalidConfig)?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HyperTransport::new().map_err(ClientBuildError::Transport)?),
        };

        Ok(Client::new_with(
            transport,
            base_url,
            self.default_headers,
            self.default_timeout,
            self.default_retry,
            InterceptorRegistry::with_interceptors(self.interceptors),
        ))
    }
}

/// Error type for client building failures.
#[derive(Debug, thiserror::Error)]
pub enum ClientBuildError {
    /// The base URL was rejected.
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(#[source] FetchError),
    /// A default timeout or retry setting was rejected.
    #[error("invalid client configuration: {0}")]
    InvalidConfig(#[source] FetchError),
    /// The default HTTP transport could not be created.
    #[error("failed to create HTTP transport: {0}")]
    Transport(#[source] FetchError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    #[test]
    fn test_builder_defaults() {
        let builder = ClientBuilder::new();
        assert!(builder.base_url.is_none());
        assert!(builder.default_headers.is_empty());
        assert!(builder.default_timeout.is_none());
        assert_eq!(builder.default_retry, RetryPolicy::no_retry());
        assert!(builder.transport.is_none());
        assert!(builder.interceptors.is_empty());
    }

    #[test]
    fn test_builder_settings() {
        let builder = ClientBuilder::new()
            .base_url("https://api.example.com")
            .default_header(
                HeaderName::from_static("x-client"),
                HeaderValue::from_static("chainfetch"),
            )
            .timeout(Duration::from_secs(5))
            .retry(RetryPolicy::retries(2));

        assert_eq!(builder.base_url.as_deref(), Some("https://api.example.com"));
        assert_eq!(builder.default_headers.get("x-client").unwrap(), "chainfetch");
        assert_eq!(builder.default_timeout, Some(Duration::from_secs(5)));
        assert_eq!(builder.default_retry.max_retries, 2);
    }

    #[test]
    fn test_build_with_custom_transport() {
        let client = ClientBuilder::new()
            .base_url("https://api.example.com/v1")
            .transport(ScriptedTransport::new([]))
            .build()
            .unwrap();
        assert_eq!(client.base_url(), Some("https://api.example.com/v1"));
    }

    #[test]
    fn test_blank_base_url_is_ignored() {
        let client = ClientBuilder::new()
            .base_url("  ")
            .transport(ScriptedTransport::new([]))
            .build()
            .unwrap();
        assert!(client.base_url().is_none());
    }

    #[test]
    fn test_build_rejects_relative_base_url() {
        let err = ClientBuilder::new()
            .base_url("/v1")
            .transport(ScriptedTransport::new([]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientBuildError::InvalidBaseUrl(_)));
    }

    #[test]
    fn test_build_rejects_zero_timeout() {
        let err = ClientBuilder::new()
            .timeout(Duration::ZERO)
            .transport(ScriptedTransport::new([]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientBuildError::InvalidConfig(_)));
    }

    #[test]
    fn test_build_rejects_invalid_retry_policy() {
        let policy = RetryPolicy::retries(1)
            .base_delay(Duration::from_secs(10))
            .max_delay(Duration::from_secs(1));
        let err = ClientBuilder::new()
            .retry(policy)
            .transport(ScriptedTransport::new([]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ClientBuildError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_build_default_transport() {
        assert!(ClientBuilder::new().build().is_ok());
    }
}
