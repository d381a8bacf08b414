//! Classified request errors.
//!
//! This module provides [`FetchError`], the single error type produced by the
//! request pipeline, and [`ErrorKind`], its failure taxonomy.

use std::time::Duration;

use chainfetch_core::AbortReason;
use http::{Method, StatusCode};

use crate::response::HttpResponse;

/// Boxed error used for interceptor and transport failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// What went wrong, independent of the message text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A configuration value was rejected (e.g. a zero timeout).
    InvalidConfig,
    /// The request URL was empty, contained control characters or did not parse.
    InvalidUrl,
    /// A request interceptor returned an error.
    RequestInterceptor,
    /// A response interceptor returned an error.
    ResponseInterceptor,
    /// An error interceptor returned an error.
    ErrorInterceptor,
    /// The per-attempt timeout elapsed.
    Timeout,
    /// The caller's abort controller fired.
    Aborted,
    /// The transport failed to complete the exchange.
    Network,
    /// A non-2xx status under an opt-in `fail_on_status` policy.
    HttpStatus,
    /// A GraphQL response carried an `errors` array under an opt-in policy.
    GraphQl,
    /// A response body accessor was called after the body had been read.
    BodyConsumed,
    /// A response body could not be decoded (JSON or UTF-8).
    Decode,
}

impl ErrorKind {
    /// Stable snake_case name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidConfig => "invalid_config",
            ErrorKind::InvalidUrl => "invalid_url",
            ErrorKind::RequestInterceptor => "request_interceptor",
            ErrorKind::ResponseInterceptor => "response_interceptor",
            ErrorKind::ErrorInterceptor => "error_interceptor",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Aborted => "aborted",
            ErrorKind::Network => "network",
            ErrorKind::HttpStatus => "http_status",
            ErrorKind::GraphQl => "graphql",
            ErrorKind::BodyConsumed => "body_consumed",
            ErrorKind::Decode => "decode",
        }
    }

    /// Whether a failure of this kind may be retried.
    ///
    /// Only timeouts and transport failures are transient. Aborts are the
    /// caller's decision and interceptor failures are bugs, so neither is
    /// retried.
    pub const fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Timeout | ErrorKind::Network)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified request failure.
///
/// Carries the failure kind, a human readable message, the request URL and
/// method when known, and for HTTP-level failures the status and the
/// response that triggered them.
///
/// # Example
///
/// ```ignore
/// match client.get("/users").send().await {
///     Ok(response) => println!("status: {}", response.status()),
///     Err(err) if err.is_timeout() => eprintln!("slow server: {err}"),
///     Err(err) => eprintln!("{} {:?} failed: {err}", err.kind(), err.url()),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct FetchError {
    kind: ErrorKind,
    message: String,
    url: Option<String>,
    method: Option<Method>,
    status: Option<StatusCode>,
    response: Option<Box<HttpResponse>>,
    #[source]
    cause: Option<BoxError>,
}

impl FetchError {
    /// Create an error of `kind` with `message`.
    pub fn new<S: Into<String>>(kind: ErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
            url: None,
            method: None,
            status: None,
            response: None,
            cause: None,
        }
    }

    pub(crate) fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::new(ErrorKind::InvalidConfig, message)
    }

    pub(crate) fn invalid_url<S: AsRef<str>>(detail: S) -> Self {
        Self::new(
            ErrorKind::InvalidUrl,
            format!("Invalid URL: {}", detail.as_ref()),
        )
    }

    pub(crate) fn timeout(after: Duration) -> Self {
        Self::new(
            ErrorKind::Timeout,
            format!("Request timed out after {}ms", after.as_millis()),
        )
    }

    pub(crate) fn aborted(detail: Option<&str>) -> Self {
        let message = match detail {
            Some(detail) => format!("Request aborted: {detail}"),
            None => "Request aborted".to_string(),
        };
        Self::new(ErrorKind::Aborted, message)
    }

    /// Classify a fired abort signal: timer-driven signals become timeouts,
    /// everything else is an external abort.
    pub(crate) fn from_abort(reason: &AbortReason) -> Self {
        match reason {
            AbortReason::Timeout(after) => Self::timeout(*after),
            AbortReason::Aborted(detail) => Self::aborted(detail.as_deref()),
        }
    }

    pub(crate) fn network(cause: BoxError) -> Self {
        Self::new(ErrorKind::Network, format!("Network error: {cause}")).with_cause(cause)
    }

    pub(crate) fn request_interceptor(cause: BoxError) -> Self {
        Self::new(
            ErrorKind::RequestInterceptor,
            format!("Request interceptor failed: {cause}"),
        )
        .with_cause(cause)
    }

    pub(crate) fn response_interceptor(cause: BoxError) -> Self {
        Self::new(
            ErrorKind::ResponseInterceptor,
            format!("Response interceptor failed: {cause}"),
        )
        .with_cause(cause)
    }

    pub(crate) fn error_interceptor(cause: BoxError) -> Self {
        Self::new(
            ErrorKind::ErrorInterceptor,
            format!("Error interceptor failed: {cause}"),
        )
        .with_cause(cause)
    }

    pub(crate) fn body_consumed() -> Self {
        Self::new(
            ErrorKind::BodyConsumed,
            "Response body has already been consumed",
        )
    }

    pub(crate) fn decode<S: AsRef<str>>(what: S, cause: BoxError) -> Self {
        Self::new(
            ErrorKind::Decode,
            format!("Failed to decode {}: {cause}", what.as_ref()),
        )
        .with_cause(cause)
    }

    /// A non-2xx response turned into a failure. Keeps the response.
    pub(crate) fn http_status(response: HttpResponse) -> Self {
        let status = response.status();
        let mut err = Self::new(
            ErrorKind::HttpStatus,
            format!("HTTP error: {status}"),
        );
        err.url = Some(response.url().to_string());
        err.status = Some(status);
        err.response = Some(Box::new(response));
        err
    }

    /// Attach an underlying cause.
    pub fn with_cause(mut self, cause: impl Into<BoxError>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Attach an HTTP status and the response it came from.
    pub fn with_response(mut self, response: HttpResponse) -> Self {
        self.status = Some(response.status());
        if self.url.is_none() && !response.url().is_empty() {
            self.url = Some(response.url().to_string());
        }
        self.response = Some(Box::new(response));
        self
    }

    /// Record the request URL and method, keeping any values already set.
    pub(crate) fn fill_request(mut self, url: &str, method: &Method) -> Self {
        if self.url.is_none() && !url.is_empty() {
            self.url = Some(url.to_string());
        }
        if self.method.is_none() {
            self.method = Some(method.clone());
        }
        self
    }

    /// The failure kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The URL of the failed request, if known.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The method of the failed request, if known.
    pub fn method(&self) -> Option<&Method> {
        self.method.as_ref()
    }

    /// The HTTP status for HTTP-level failures.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// The response behind an HTTP-level failure.
    pub fn response(&self) -> Option<&HttpResponse> {
        self.response.as_deref()
    }

    /// Take the response behind an HTTP-level failure.
    pub fn into_response(self) -> Option<HttpResponse> {
        self.response.map(|response| *response)
    }

    /// Returns `true` if the per-attempt timeout elapsed.
    pub fn is_timeout(&self) -> bool {
        self.kind == ErrorKind::Timeout
    }

    /// Returns `true` if the caller aborted the request.
    pub fn is_aborted(&self) -> bool {
        self.kind == ErrorKind::Aborted
    }

    /// Returns whether this failure may be retried.
    ///
    /// ```
    /// use chainfetch::{ErrorKind, FetchError};
    ///
    /// assert!(FetchError::new(ErrorKind::Network, "connection reset").is_retryable());
    /// assert!(!FetchError::new(ErrorKind::Aborted, "Request aborted").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn test_fetch_error_new() {
        let err = FetchError::new(ErrorKind::Network, "connection refused");
        assert_eq!(err.kind(), ErrorKind::Network);
        assert_eq!(err.message(), "connection refused");
        assert_eq!(err.to_string(), "connection refused");
        assert!(err.url().is_none());
        assert!(err.method().is_none());
        assert!(err.status().is_none());
    }

    #[test]
    fn test_interceptor_errors_keep_original_message() {
        let err = FetchError::request_interceptor("token expired".into());
        assert_eq!(err.kind(), ErrorKind::RequestInterceptor);
        assert_eq!(err.to_string(), "Request interceptor failed: token expired");
        assert_eq!(err.source().unwrap().to_string(), "token expired");

        let err = FetchError::response_interceptor("bad shape".into());
        assert_eq!(err.to_string(), "Response interceptor failed: bad shape");

        let err = FetchError::error_interceptor("oops".into());
        assert_eq!(err.to_string(), "Error interceptor failed: oops");
    }

    #[test]
    fn test_from_abort_classifies_timeout_and_abort() {
        let timeout = FetchError::from_abort(&AbortReason::Timeout(Duration::from_millis(50)));
        assert!(timeout.is_timeout());
        assert!(!timeout.is_aborted());
        assert_eq!(timeout.to_string(), "Request timed out after 50ms");

        let aborted = FetchError::from_abort(&AbortReason::Aborted(Some("user".into())));
        assert!(aborted.is_aborted());
        assert!(!aborted.is_timeout());
        assert_eq!(aborted.to_string(), "Request aborted: user");
    }

    #[test]
    fn test_fill_request_keeps_existing_values() {
        let err = FetchError::new(ErrorKind::Network, "reset")
            .fill_request("https://a.example/x", &Method::GET)
            .fill_request("https://b.example/y", &Method::POST);

        assert_eq!(err.url(), Some("https://a.example/x"));
        assert_eq!(err.method(), Some(&Method::GET));
    }

    #[test]
    fn test_http_status_error_carries_response() {
        let response = HttpResponse::new(StatusCode::NOT_FOUND, "missing")
            .with_url("https://api.example/items/7");
        let err = FetchError::http_status(response);

        assert_eq!(err.kind(), ErrorKind::HttpStatus);
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.url(), Some("https://api.example/items/7"));
        assert_eq!(err.response().unwrap().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_is_retryable() {
        assert!(FetchError::timeout(Duration::from_millis(1)).is_retryable());
        assert!(FetchError::network("reset".into()).is_retryable());

        assert!(!FetchError::aborted(None).is_retryable());
        assert!(!FetchError::request_interceptor("x".into()).is_retryable());
        assert!(!FetchError::invalid_url("URL cannot be empty").is_retryable());
        assert!(!FetchError::body_consumed().is_retryable());
    }

    #[test]
    fn test_error_kind_as_str() {
        assert_eq!(ErrorKind::Timeout.as_str(), "timeout");
        assert_eq!(ErrorKind::GraphQl.to_string(), "graphql");
    }
}
