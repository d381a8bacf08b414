//! The request snapshot passed through the pipeline.
//!
//! [`RequestConfig`] is what request interceptors receive and return. It is
//! re-read at the start of every attempt, so whatever an interceptor leaves in
//! it (including the URL) applies to every attempt.
//!
//! The fetch-style passthrough options ([`RequestCache`], [`Credentials`],
//! [`RequestMode`], [`Redirect`], [`Priority`] and the referrer) are carried
//! to the transport untouched in a [`FetchOptions`] request extension.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bytes::Bytes;
use chainfetch_core::AbortController;
use http::{HeaderMap, Method};

use crate::FetchError;
use crate::config::RetryPolicy;

/// Error returned when parsing an option name that is not recognised.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseOptionError {
    kind: &'static str,
    value: String,
}

macro_rules! fetch_option {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal,)+
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $name {
            /// The fetch-standard spelling of this value.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl FromStr for $name {
            type Err = ParseOptionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseOptionError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

fetch_option! {
    /// Cache mode hint.
    RequestCache, "cache" {
        Default => "default",
        NoStore => "no-store",
        Reload => "reload",
        NoCache => "no-cache",
        ForceCache => "force-cache",
        OnlyIfCached => "only-if-cached",
    }
}

fetch_option! {
    /// Whether credentials (cookies, auth) accompany the request.
    Credentials, "credentials" {
        Omit => "omit",
        SameOrigin => "same-origin",
        Include => "include",
    }
}

fetch_option! {
    /// Request mode hint.
    RequestMode, "mode" {
        Cors => "cors",
        NoCors => "no-cors",
        SameOrigin => "same-origin",
        Navigate => "navigate",
    }
}

fetch_option! {
    /// Redirect handling hint.
    Redirect, "redirect" {
        Follow => "follow",
        Error => "error",
        Manual => "manual",
    }
}

fetch_option! {
    /// Request priority hint.
    Priority, "priority" {
        High => "high",
        Low => "low",
        Auto => "auto",
    }
}

/// Passthrough options forwarded to the transport as a request extension.
///
/// The pipeline never interprets these; transports may.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchOptions {
    pub cache: Option<RequestCache>,
    pub credentials: Option<Credentials>,
    pub mode: Option<RequestMode>,
    pub redirect: Option<Redirect>,
    pub referrer: Option<String>,
    pub priority: Option<Priority>,
}

/// A mutable request snapshot.
///
/// Built by [`RequestBuilder`](crate::RequestBuilder) (or by hand) and handed
/// to [`Client::execute`](crate::Client::execute). Request interceptors
/// receive it by value and return it, possibly modified.
///
/// # Example
///
/// ```
/// use chainfetch::RequestConfig;
/// use http::Method;
/// use std::time::Duration;
///
/// let mut config = RequestConfig::new(Method::GET, "https://api.example.com/users");
/// config.set_timeout(Duration::from_secs(5)).unwrap();
/// config.retry = config.retry.max_retries(2);
///
/// assert!(config.set_timeout(Duration::ZERO).is_err());
/// assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
/// ```
#[derive(Clone, Debug)]
pub struct RequestConfig {
    /// HTTP method.
    pub method: Method,
    /// Target URL. Relative URLs are resolved against the client base URL.
    pub url: String,
    /// Request headers. Keys are case-insensitive; `insert` replaces.
    pub headers: HeaderMap,
    /// Opaque request body.
    pub body: Option<Bytes>,
    /// External cancellation handle. Setting a new one replaces the old one.
    pub abort: Option<AbortController>,
    /// Retry budget and backoff.
    pub retry: RetryPolicy,
    /// Turn non-2xx responses into [`ErrorKind::HttpStatus`](crate::ErrorKind::HttpStatus) failures.
    pub fail_on_status: bool,
    /// Passthrough options for the transport.
    pub options: FetchOptions,
    timeout: Option<Duration>,
}

impl RequestConfig {
    /// Create a config for `method` and `url` with no timeout and no retries.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
            abort: None,
            retry: RetryPolicy::no_retry(),
            fail_on_status: false,
            options: FetchOptions::default(),
            timeout: None,
        }
    }

    /// The per-attempt timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Set the per-attempt timeout.
    ///
    /// Rejects a zero duration.
    pub fn set_timeout(&mut self, timeout: Duration) -> Result<(), FetchError> {
        if timeout.is_zero() {
            return Err(FetchError::invalid_config(
                "timeout must be a positive duration",
            ));
        }
        self.timeout = Some(timeout);
        Ok(())
    }

    /// Set a timeout that was already checked by [`ClientBuilder::build`].
    ///
    /// [`ClientBuilder::build`]: crate::ClientBuilder::build
    pub(crate) fn seed_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Remove the per-attempt timeout.
    pub fn clear_timeout(&mut self) {
        self.timeout = None;
    }

    /// Attach an external abort controller, replacing any previous one.
    pub fn set_abort_controller(&mut self, controller: AbortController) {
        self.abort = Some(controller);
    }
}
