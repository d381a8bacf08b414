//! The network layer underneath the request pipeline.
//!
//! A [`Transport`] performs exactly one HTTP exchange. The pipeline owns
//! everything around it: cancellation, retries and interceptors. Dropping the
//! future returned by [`Transport::fetch`] must abandon the exchange; that is
//! how timeouts and aborts reach the network.
//!
//! [`HyperTransport`] is the default implementation, built on hyper_util's
//! legacy client. It supports:
//!
//! - HTTP/1.1 and HTTP/2 with protocol negotiation via ALPN
//! - TLS with rustls (feature-gated)
//! - Connection pooling
//! - Tower service integration
//!
//! Anything else, such as an in-memory fake for tests, can be plugged in with
//! [`transport_fn`].
//!
//! # Example
//!
//! ```ignore
//! use chainfetch::transport::HyperTransport;
//! use std::time::Duration;
//!
//! let transport = HyperTransport::builder()
//!     .pool_idle_timeout(Duration::from_secs(60))
//!     .build()?;
//!
//! let client = chainfetch::Client::builder()
//!     .base_url("https://api.example.com")
//!     .transport(transport)
//!     .build()?;
//! ```

mod body;
mod connector;
mod hyper;

use std::future::Future;
use std::sync::Arc;

pub use body::TransportBody;
pub use connector::{danger_accept_invalid_certs_config, default_tls_config, has_tls_support};
pub use hyper::{HyperTransport, HyperTransportBuilder};

// Re-export rustls types that users might need for TLS configuration
pub use rustls::ClientConfig as TlsClientConfig;

use crate::config::BoxFuture;
use crate::error::BoxError;
use crate::response::ResponseBody;

/// Future returned by [`Transport::fetch`].
pub type TransportFuture = BoxFuture<'static, Result<http::Response<ResponseBody>, BoxError>>;

/// Performs one HTTP exchange.
///
/// The request carries an absolute URI, the method, headers, the body and a
/// [`FetchOptions`](crate::FetchOptions) extension with passthrough hints.
/// Any `Err` is reported as a network failure.
pub trait Transport: Send + Sync + 'static {
    /// Send `request` and resolve with the response head and a streaming body.
    fn fetch(&self, request: http::Request<TransportBody>) -> TransportFuture;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn fetch(&self, request: http::Request<TransportBody>) -> TransportFuture {
        (**self).fetch(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn fetch(&self, request: http::Request<TransportBody>) -> TransportFuture {
        (**self).fetch(request)
    }
}

/// A [`Transport`] backed by an async function.
#[derive(Clone)]
pub struct FnTransport<F> {
    func: F,
}

impl<F> std::fmt::Debug for FnTransport<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnTransport")
    }
}

/// Build a [`Transport`] from an async function.
///
/// ```
/// use bytes::Bytes;
/// use chainfetch::transport::transport_fn;
/// use chainfetch::{BoxError, boxed_body};
/// use http_body_util::Full;
///
/// let transport = transport_fn(|request| async move {
///     let body = boxed_body(Full::new(Bytes::from(request.uri().to_string())));
///     Ok::<_, BoxError>(http::Response::new(body))
/// });
/// ```
pub fn transport_fn<F, Fut>(func: F) -> FnTransport<F>
where
    F: Fn(http::Request<TransportBody>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<http::Response<ResponseBody>, BoxError>> + Send + 'static,
{
    FnTransport { func }
}

impl<F, Fut> Transport for FnTransport<F>
where
    F: Fn(http::Request<TransportBody>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<http::Response<ResponseBody>, BoxError>> + Send + 'static,
{
    fn fetch(&self, request: http::Request<TransportBody>) -> TransportFuture {
        Box::pin((self.func)(request))
    }
}
