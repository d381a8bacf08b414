//! Request, response and error interceptors.
//!
//! Interceptors add cross-cutting logic around a request, such as:
//! - Adding authentication headers or rewriting the URL
//! - Answering a request from a cache without touching the network
//! - Logging or transforming responses
//! - Recovering from failures with a fallback response
//!
//! Each kind wraps an async function. Returning `Err` from any of them is
//! reported as a failure of that interceptor kind.
//!
//! # Ordering
//!
//! A request sees two chains: the per-request chain attached to it and the
//! client-wide chain held by the [`InterceptorRegistry`](super::InterceptorRegistry).
//!
//! - Request interceptors run per-request first, then global, both in the
//!   order they were added.
//! - Response and error interceptors run per-request first in the order they
//!   were added, then global in **reverse** order, unwinding like middleware.
//!
//! With a per-request chain `[A, B]` and a global chain `[G1, G2]`, requests
//! pass through `A, B, G1, G2` and outcomes through `A, B, G2, G1`.
//!
//! # Example
//!
//! ```
//! use chainfetch::{BoxError, ErrorInterceptor, ErrorStep, HttpResponse, RequestInterceptor};
//! use http::{HeaderValue, StatusCode};
//!
//! let auth = RequestInterceptor::sync(|mut config| {
//!     config
//!         .headers
//!         .insert("authorization", HeaderValue::from_static("Bearer token123"));
//!     Ok(config)
//! });
//!
//! let fallback = ErrorInterceptor::new(|err| async move {
//!     if err.is_timeout() {
//!         return Ok::<_, BoxError>(ErrorStep::Recover(HttpResponse::new(StatusCode::OK, "[]")));
//!     }
//!     Ok(ErrorStep::Fail(err))
//! });
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::RequestConfig;
use crate::error::{BoxError, FetchError};
use crate::response::HttpResponse;

/// Type alias for a boxed future returning a result.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a request interceptor hands to the next stage.
#[derive(Debug)]
pub enum RequestStep {
    /// Pass the (possibly modified) config on.
    Continue(RequestConfig),
    /// Short-circuit: skip the remaining request interceptors and the network
    /// call, and hand this response to the response chain.
    Respond(HttpResponse),
}

impl From<RequestConfig> for RequestStep {
    fn from(config: RequestConfig) -> Self {
        RequestStep::Continue(config)
    }
}

impl From<HttpResponse> for RequestStep {
    fn from(response: HttpResponse) -> Self {
        RequestStep::Respond(response)
    }
}

/// What an error interceptor hands to the next stage.
#[derive(Debug)]
pub enum ErrorStep {
    /// Keep failing with this (possibly replaced) error.
    Fail(FetchError),
    /// Recover: skip the remaining error interceptors and succeed with this
    /// response.
    Recover(HttpResponse),
}

impl From<FetchError> for ErrorStep {
    fn from(err: FetchError) -> Self {
        ErrorStep::Fail(err)
    }
}

impl From<HttpResponse> for ErrorStep {
    fn from(response: HttpResponse) -> Self {
        ErrorStep::Recover(response)
    }
}

type RequestFn =
    Arc<dyn Fn(RequestConfig) -> BoxFuture<'static, Result<RequestStep, BoxError>> + Send + Sync>;
type ResponseFn =
    Arc<dyn Fn(HttpResponse) -> BoxFuture<'static, Result<HttpResponse, BoxError>> + Send + Sync>;
type ErrorFn =
    Arc<dyn Fn(FetchError) -> BoxFuture<'static, Result<ErrorStep, BoxError>> + Send + Sync>;

/// Transforms the request config before dispatch.
///
/// The function may return a config (`Ok(config)`) or a response
/// (`Ok(response.into())`), which short-circuits the network call.
#[derive(Clone)]
pub struct RequestInterceptor {
    func: RequestFn,
}

impl RequestInterceptor {
    /// Create an interceptor from an async function.
    pub fn new<F, Fut, T>(func: F) -> Self
    where
        F: Fn(RequestConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
        T: Into<RequestStep> + Send + 'static,
    {
        Self {
            func: Arc::new(move |config: RequestConfig| -> BoxFuture<'static, Result<RequestStep, BoxError>> {
                let fut = func(config);
                Box::pin(async move { fut.await.map(Into::into) })
            }),
        }
    }

    /// Create an interceptor from a synchronous function.
    pub fn sync<F, T>(func: F) -> Self
    where
        F: Fn(RequestConfig) -> Result<T, BoxError> + Send + Sync + 'static,
        T: Into<RequestStep> + Send + 'static,
    {
        Self::new(move |config| std::future::ready(func(config)))
    }

    pub(crate) fn call(
        &self,
        config: RequestConfig,
    ) -> BoxFuture<'static, Result<RequestStep, BoxError>> {
        (self.func)(config)
    }
}

impl std::fmt::Debug for RequestInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RequestInterceptor")
    }
}

/// Transforms a response on the success path.
#[derive(Clone)]
pub struct ResponseInterceptor {
    func: ResponseFn,
}

impl ResponseInterceptor {
    /// Create an interceptor from an async function.
    pub fn new<F, Fut>(func: F) -> Self
    where
        F: Fn(HttpResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, BoxError>> + Send + 'static,
    {
        Self {
            func: Arc::new(
                move |response: HttpResponse| -> BoxFuture<'static, Result<HttpResponse, BoxError>> {
                    Box::pin(func(response))
                },
            ),
        }
    }

    /// Create an interceptor from a synchronous function.
    pub fn sync<F>(func: F) -> Self
    where
        F: Fn(HttpResponse) -> Result<HttpResponse, BoxError> + Send + Sync + 'static,
    {
        Self::new(move |response| std::future::ready(func(response)))
    }

    pub(crate) fn call(
        &self,
        response: HttpResponse,
    ) -> BoxFuture<'static, Result<HttpResponse, BoxError>> {
        (self.func)(response)
    }
}

impl std::fmt::Debug for ResponseInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ResponseInterceptor")
    }
}

/// Inspects or replaces an error on the failure path, or recovers from it.
#[derive(Clone)]
pub struct ErrorInterceptor {
    func: ErrorFn,
}

impl ErrorInterceptor {
    /// Create an interceptor from an async function.
    ///
    /// Return `Ok(err.into())` to keep failing, `Ok(response.into())` to
    /// recover.
    pub fn new<F, Fut, T>(func: F) -> Self
    where
        F: Fn(FetchError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
        T: Into<ErrorStep> + Send + 'static,
    {
        Self {
            func: Arc::new(move |err: FetchError| -> BoxFuture<'static, Result<ErrorStep, BoxError>> {
                let fut = func(err);
                Box::pin(async move { fut.await.map(Into::into) })
            }),
        }
    }

    /// Create an interceptor from a synchronous function.
    pub fn sync<F, T>(func: F) -> Self
    where
        F: Fn(FetchError) -> Result<T, BoxError> + Send + Sync + 'static,
        T: Into<ErrorStep> + Send + 'static,
    {
        Self::new(move |err| std::future::ready(func(err)))
    }

    pub(crate) fn call(&self, err: FetchError) -> BoxFuture<'static, Result<ErrorStep, BoxError>> {
        (self.func)(err)
    }
}

impl std::fmt::Debug for ErrorInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ErrorInterceptor")
    }
}

/// One tier of interceptors: request, response and error chains.
///
/// Used both for the per-request chain and, behind the registry, for the
/// client-wide chain. Cloning is cheap; the functions are shared.
#[derive(Clone, Default)]
pub struct Interceptors {
    request: Vec<RequestInterceptor>,
    response: Vec<ResponseInterceptor>,
    error: Vec<ErrorInterceptor>,
}

impl std::fmt::Debug for Interceptors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interceptors")
            .field("request", &self.request.len())
            .field("response", &self.response.len())
            .field("error", &self.error.len())
            .finish()
    }
}

impl Interceptors {
    /// Create an empty set of chains.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a request interceptor.
    pub fn push_request(&mut self, interceptor: RequestInterceptor) {
        self.request.push(interceptor);
    }

    /// Append a response interceptor.
    pub fn push_response(&mut self, interceptor: ResponseInterceptor) {
        self.response.push(interceptor);
    }

    /// Append an error interceptor.
    pub fn push_error(&mut self, interceptor: ErrorInterceptor) {
        self.error.push(interceptor);
    }

    /// Append every chain of `other` after this one's.
    pub fn extend(&mut self, other: &Interceptors) {
        self.request.extend(other.request.iter().cloned());
        self.response.extend(other.response.iter().cloned());
        self.error.extend(other.error.iter().cloned());
    }

    /// Total number of interceptors across all three chains.
    pub fn len(&self) -> usize {
        self.request.len() + self.response.len() + self.error.len()
    }

    /// Returns `true` if no interceptor of any kind is present.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The per-request and global tiers seen together by one execution.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Pipeline<'a> {
    local: &'a Interceptors,
    global: &'a Interceptors,
}

impl<'a> Pipeline<'a> {
    pub(crate) fn new(local: &'a Interceptors, global: &'a Interceptors) -> Self {
        Self { local, global }
    }

    /// Per-request chain, then global, both forward.
    pub(crate) fn request_chain(self) -> impl Iterator<Item = &'a RequestInterceptor> {
        self.local.request.iter().chain(self.global.request.iter())
    }

    /// Per-request chain forward, then global in reverse.
    pub(crate) fn response_chain(self) -> impl Iterator<Item = &'a ResponseInterceptor> {
        self.local.response.iter().chain(self.global.response.iter().rev())
    }

    /// Per-request chain forward, then global in reverse.
    pub(crate) fn error_chain(self) -> impl Iterator<Item = &'a ErrorInterceptor> {
        self.local.error.iter().chain(self.global.error.iter().rev())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::{Method, StatusCode};

    use super::*;
    use crate::ErrorKind;

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn logging_request(log: &Log, name: &'static str) -> RequestInterceptor {
        let log = log.clone();
        RequestInterceptor::sync(move |config| {
            log.lock().unwrap().push(name);
            Ok(config)
        })
    }

    fn logging_response(log: &Log, name: &'static str) -> ResponseInterceptor {
        let log = log.clone();
        ResponseInterceptor::sync(move |response| {
            log.lock().unwrap().push(name);
            Ok(response)
        })
    }

    fn logging_error(log: &Log, name: &'static str) -> ErrorInterceptor {
        let log = log.clone();
        ErrorInterceptor::sync(move |err| {
            log.lock().unwrap().push(name);
            Ok(err)
        })
    }

    fn tiers(log: &Log) -> (Interceptors, Interceptors) {
        let mut local = Interceptors::new();
        for name in ["A", "B"] {
            local.push_request(logging_request(log, name));
            local.push_response(logging_response(log, name));
            local.push_error(logging_error(log, name));
        }
        let mut global = Interceptors::new();
        for name in ["G1", "G2"] {
            global.push_request(logging_request(log, name));
            global.push_response(logging_response(log, name));
            global.push_error(logging_error(log, name));
        }
        (local, global)
    }

    #[tokio::test]
    async fn test_request_chain_order() {
        let log = Log::default();
        let (local, global) = tiers(&log);

        let mut config = RequestConfig::new(Method::GET, "/");
        for interceptor in Pipeline::new(&local, &global).request_chain() {
            match interceptor.call(config).await.unwrap() {
                RequestStep::Continue(next) => config = next,
                RequestStep::Respond(_) => panic!("unexpected short-circuit"),
            }
        }

        assert_eq!(*log.lock().unwrap(), ["A", "B", "G1", "G2"]);
    }

    #[tokio::test]
    async fn test_response_chain_order() {
        let log = Log::default();
        let (local, global) = tiers(&log);

        let mut response = HttpResponse::new(StatusCode::OK, "");
        for interceptor in Pipeline::new(&local, &global).response_chain() {
            response = interceptor.call(response).await.unwrap();
        }

        assert_eq!(*log.lock().unwrap(), ["A", "B", "G2", "G1"]);
    }

    #[tokio::test]
    async fn test_error_chain_order() {
        let log = Log::default();
        let (local, global) = tiers(&log);

        let mut err = FetchError::new(ErrorKind::Network, "reset");
        for interceptor in Pipeline::new(&local, &global).error_chain() {
            match interceptor.call(err).await.unwrap() {
                ErrorStep::Fail(next) => err = next,
                ErrorStep::Recover(_) => panic!("unexpected recovery"),
            }
        }

        assert_eq!(*log.lock().unwrap(), ["A", "B", "G2", "G1"]);
    }

    #[tokio::test]
    async fn test_request_interceptor_can_short_circuit() {
        let interceptor = RequestInterceptor::sync(|_config| {
            Ok(HttpResponse::new(StatusCode::ACCEPTED, "cached"))
        });

        let step = interceptor
            .call(RequestConfig::new(Method::GET, "/"))
            .await
            .unwrap();
        match step {
            RequestStep::Respond(response) => assert_eq!(response.status(), StatusCode::ACCEPTED),
            RequestStep::Continue(_) => panic!("expected a response"),
        }
    }

    #[tokio::test]
    async fn test_async_interceptor_error_is_returned() {
        let interceptor = ResponseInterceptor::new(|_response| async move {
            Err::<HttpResponse, BoxError>("bad shape".into())
        });

        let err = interceptor
            .call(HttpResponse::new(StatusCode::OK, ""))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bad shape");
    }

    #[test]
    fn test_interceptors_debug_shows_counts() {
        let log = Log::default();
        let (mut local, global) = tiers(&log);
        local.extend(&global);

        assert_eq!(local.len(), 12);
        assert!(!local.is_empty());
        assert!(Interceptors::new().is_empty());
        assert_eq!(
            format!("{local:?}"),
            "Interceptors { request: 4, response: 4, error: 4 }"
        );
    }
}
