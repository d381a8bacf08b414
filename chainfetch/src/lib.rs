//! Fluent HTTP requests with retry, timeout, abort signals and interceptors.
//!
//! This crate provides a request pipeline over a pluggable [`Transport`]
//! (hyper by default). It takes a [`RequestConfig`] and turns it into a
//! response or a classified [`FetchError`], handling:
//!
//! - Per-attempt timeouts combined with the caller's [`AbortController`]
//! - Retries of timeouts and network failures with optional backoff
//! - Request, response and error interceptors, per request and client-wide
//! - One-shot response bodies ([`HttpResponse`])
//!
//! On top of the pipeline sit a fluent [`RequestBuilder`], base-URL-scoped
//! [`Api`] defaults, cookie and CSRF helpers, and a GraphQL wrapper.
//!
//! ## Example
//!
//! ```ignore
//! use chainfetch::Client;
//! use std::time::Duration;
//!
//! let client = Client::builder()
//!     .base_url("https://api.example.com")
//!     .timeout(Duration::from_secs(10))
//!     .build()?;
//!
//! let user: User = client
//!     .get("/users/7")
//!     .retries(2)
//!     .send_json()
//!     .await?;
//! ```
//!
//! ## Cancellation
//!
//! Each attempt observes one effective signal: the request's abort
//! controller combined with a fresh timer for the attempt's timeout.
//! Whichever fires first decides the error:
//!
//! - the timer yields [`ErrorKind::Timeout`] (`is_timeout() == true`), which
//!   is retried while the budget allows
//! - the controller yields [`ErrorKind::Aborted`], which is never retried
//!
//! ```ignore
//! use chainfetch::AbortController;
//!
//! let controller = AbortController::new();
//! let request = client
//!     .get("/reports/large")
//!     .timeout(Duration::from_secs(30))
//!     .abort_controller(controller.clone())
//!     .send();
//!
//! controller.abort();
//! let err = request.await.unwrap_err();
//! assert!(err.is_aborted() && !err.is_timeout());
//! ```
//!
//! ## Interceptors
//!
//! Request interceptors run per-request first, then client-wide, in the
//! order they were added. Response and error interceptors run per-request
//! first, then client-wide in reverse order, so the first global
//! interceptor registered is the outermost one.
//!
//! ```ignore
//! use chainfetch::{RequestInterceptor, ResponseInterceptor};
//!
//! client.add_request_interceptor(RequestInterceptor::sync(|mut config| {
//!     config.headers.insert("x-request-id", next_id().parse()?);
//!     Ok(config)
//! }));
//!
//! client.add_response_interceptor(ResponseInterceptor::sync(|response| {
//!     metrics::record(response.status());
//!     Ok(response)
//! }));
//! ```
//!
//! An error interceptor may recover a failure by returning a response:
//!
//! ```ignore
//! use chainfetch::{ErrorInterceptor, ErrorStep, HttpResponse};
//!
//! let fallback = ErrorInterceptor::sync(|err| {
//!     if err.is_timeout() {
//!         Ok(ErrorStep::Recover(HttpResponse::from_json(&cached())?))
//!     } else {
//!         Ok(ErrorStep::Fail(err))
//!     }
//! });
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description | Default |
//! |---------|-------------|---------|
//! | `tls` | rustls with ring and native roots | yes |
//! | `tls-ring` / `tls-aws-lc` | rustls crypto provider | via `tls` |
//! | `tls-native-roots` / `tls-webpki-roots` | root certificates | via `tls` |
//! | `tracing` | spans and events for request execution | yes |
//!
//! Without a TLS provider the hyper transport fetches `http://` URLs only.

mod api;
mod builder;
mod client;
pub mod config;
pub mod cookie;
pub mod csrf;
mod error;
mod execute;
mod graphql;
mod request;
mod response;
pub mod transport;
pub mod url;

#[cfg(test)]
mod testing;

pub use api::Api;
pub use builder::{ClientBuildError, ClientBuilder};
pub use client::Client;
pub use error::{BoxError, ErrorKind, FetchError};
pub use graphql::{GraphqlError, GraphqlLocation, GraphqlRequest, GraphqlResponse};
pub use request::RequestBuilder;
pub use response::{HttpResponse, ResponseBody, boxed_body};

// Re-export from config module
pub use config::{
    AttemptOutcome, BoxFuture, Credentials, ErrorInterceptor, ErrorStep, ExponentialBackoff,
    FetchOptions, InterceptorRegistry, Interceptors, ParseOptionError, Priority, Redirect,
    RequestCache, RequestConfig, RequestInterceptor, RequestMode, RequestStep,
    ResponseInterceptor, RetryPolicy,
};

// Re-export transport types at the top level for convenience
pub use transport::{HyperTransport, HyperTransportBuilder, Transport, TransportBody};

// Re-export cancellation primitives
pub use chainfetch_core::{AbortController, AbortReason, AbortSignal};

pub use bytes::Bytes;
