//! Request-level configuration.
//!
//! This module contains everything the execution pipeline reads:
//! - [`RequestConfig`]: the mutable request snapshot passed through interceptors
//! - [`RetryPolicy`]: retry budget and optional backoff between attempts
//! - [`Interceptors`]: per-request and global interceptor chains
//! - [`InterceptorRegistry`]: the client-wide, copy-on-write global chain

mod interceptor;
mod options;
mod registry;
mod retry;

pub use interceptor::{
    BoxFuture, ErrorInterceptor, ErrorStep, Interceptors, RequestInterceptor, RequestStep,
    ResponseInterceptor,
};
pub(crate) use interceptor::Pipeline;
pub use options::{
    Credentials, FetchOptions, ParseOptionError, Priority, Redirect, RequestCache, RequestConfig,
    RequestMode,
};
pub use registry::InterceptorRegistry;
pub use retry::{AttemptOutcome, ExponentialBackoff, RetryPolicy, defaults};
