//! The HTTP client.
//!
//! A [`Client`] owns a [`Transport`], client-wide request defaults and the
//! global [`InterceptorRegistry`]. Requests are built with
//! [`Client::request`] and friends, or handed over ready-made to
//! [`Client::execute`].

use std::sync::Arc;
use std::time::Duration;

use http::{HeaderMap, Method};

use crate::api::Api;
use crate::builder::{ClientBuildError, ClientBuilder};
use crate::config::{
    ErrorInterceptor, InterceptorRegistry, Interceptors, Pipeline, RequestConfig,
    RequestInterceptor, ResponseInterceptor, RetryPolicy,
};
use crate::error::FetchError;
use crate::execute::Engine;
use crate::graphql::GraphqlRequest;
use crate::request::RequestBuilder;
use crate::response::HttpResponse;
use crate::transport::Transport;

/// HTTP client with retry, timeout, abort and interceptor support.
///
/// Cloning is cheap: clones share the transport, the defaults and the
/// global interceptor registry.
///
/// Global interceptors are added at any time with
/// [`add_request_interceptor`](Self::add_request_interceptor) and friends.
/// A request in flight keeps the chain it started with.
///
/// # Example
///
/// ```ignore
/// use chainfetch::Client;
///
/// let client = Client::builder()
///     .base_url("https://api.example.com")
///     .build()?;
///
/// let user: User = client.get("/users/7").send_json().await?;
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    /// HTTP transport.
    transport: Arc<dyn Transport>,
    /// Base URL for relative request URLs.
    base_url: Option<String>,
    /// Headers added to every request.
    default_headers: HeaderMap,
    /// Default per-attempt timeout.
    default_timeout: Option<Duration>,
    /// Default retry policy.
    default_retry: RetryPolicy,
    /// Global interceptor chains.
    registry: InterceptorRegistry,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.inner.base_url)
            .field("default_headers", &self.inner.default_headers)
            .field("default_timeout", &self.inner.default_timeout)
            .field("default_retry", &self.inner.default_retry)
            .field("registry", &self.inner.registry)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new ClientBuilder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client with default settings and the hyper transport.
    pub fn new() -> Result<Self, ClientBuildError> {
        ClientBuilder::new().build()
    }

    /// Called by [`ClientBuilder::build`].
    pub(crate) fn new_with(
        transport: Arc<dyn Transport>,
        base_url: Option<String>,
        default_headers: HeaderMap,
        default_timeout: Option<Duration>,
        default_retry: RetryPolicy,
        registry: InterceptorRegistry,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                transport,
                base_url,
                default_headers,
                default_timeout,
                default_retry,
                registry,
            }),
        }
    }

    /// The base URL, if one was configured.
    pub fn base_url(&self) -> Option<&str> {
        self.inner.base_url.as_deref()
    }

    /// The global interceptor registry.
    pub fn interceptors(&self) -> &InterceptorRegistry {
        &self.inner.registry
    }

    /// A request config for `method` and `url`, seeded with the client
    /// defaults.
    pub fn config(&self, method: Method, url: impl Into<String>) -> RequestConfig {
        let mut config = RequestConfig::new(method, url);
        config.headers = self.inner.default_headers.clone();
        config.retry = self.inner.default_retry.clone();
        config.seed_timeout(self.inner.default_timeout);
        config
    }

    /// Start building a request.
    pub fn request(&self, method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(self.clone(), self.config(method, url))
    }

    /// Start building a `GET` request.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::GET, url)
    }

    /// Start building a `POST` request.
    pub fn post(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::POST, url)
    }

    /// Start building a `PUT` request.
    pub fn put(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::PUT, url)
    }

    /// Start building a `PATCH` request.
    pub fn patch(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::PATCH, url)
    }

    /// Start building a `DELETE` request.
    pub fn delete(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::DELETE, url)
    }

    /// Start building a `HEAD` request.
    pub fn head(&self, url: impl Into<String>) -> RequestBuilder {
        self.request(Method::HEAD, url)
    }

    /// Scope requests under `base` with shared defaults.
    ///
    /// `base` may be absolute or relative to the client base URL.
    pub fn api(&self, base: impl Into<String>) -> Api {
        Api::new(self.clone(), base.into())
    }

    /// Start a GraphQL request against `url`.
    pub fn graphql(&self, url: impl Into<String>, query: impl Into<String>) -> GraphqlRequest {
        GraphqlRequest::new(self.post(url), query.into())
    }

    /// Register a global request interceptor.
    ///
    /// Global request interceptors run after the per-request ones, in
    /// registration order.
    pub fn add_request_interceptor(&self, interceptor: RequestInterceptor) {
        self.inner.registry.add_request_interceptor(interceptor);
    }

    /// Register a global response interceptor.
    ///
    /// Global response interceptors run after the per-request ones, in
    /// reverse registration order.
    pub fn add_response_interceptor(&self, interceptor: ResponseInterceptor) {
        self.inner.registry.add_response_interceptor(interceptor);
    }

    /// Register a global error interceptor.
    ///
    /// Global error interceptors run after the per-request ones, in reverse
    /// registration order.
    pub fn add_error_interceptor(&self, interceptor: ErrorInterceptor) {
        self.inner.registry.add_error_interceptor(interceptor);
    }

    /// Remove every global interceptor.
    pub fn reset_interceptors(&self) {
        self.inner.registry.reset();
    }

    /// Execute `config` with the global interceptors only.
    pub async fn execute(&self, config: RequestConfig) -> Result<HttpResponse, FetchError> {
        self.execute_with(config, &Interceptors::new()).await
    }

    /// Execute `config` with per-request interceptors `local` in front of the
    /// global ones.
    ///
    /// The global chain is snapshotted when the call starts.
    pub async fn execute_with(
        &self,
        config: RequestConfig,
        local: &Interceptors,
    ) -> Result<HttpResponse, FetchError> {
        let global = self.inner.registry.snapshot();
        Engine::new(&*self.inner.transport, self.inner.base_url.as_deref())
            .execute(config, Pipeline::new(local, &global))
            .await
    }
}
