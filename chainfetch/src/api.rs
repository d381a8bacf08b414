//! Base-URL-scoped request defaults.

use std::time::Duration;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};

use crate::client::Client;
use crate::config::{
    ErrorInterceptor, Interceptors, RequestInterceptor, ResponseInterceptor, RetryPolicy,
};
use crate::request::RequestBuilder;
use crate::url::is_absolute;

/// A group of endpoints under one base URL sharing headers, timeout, retries
/// and interceptors.
///
/// Every request built from an `Api` starts with a copy of its interceptors;
/// adding interceptors to the `Api` later does not affect requests already
/// built. The `Api` interceptors run before the client's global ones.
///
/// # Example
///
/// ```ignore
/// let users = client
///     .api("https://api.example.com/v2/users")
///     .header(HeaderName::from_static("x-api-key"), key)
///     .timeout(Duration::from_secs(5))
///     .retries(2);
///
/// let user: User = users.get("7").send_json().await?;
/// users.delete("7").send().await?;
/// ```
#[derive(Clone, Debug)]
pub struct Api {
    client: Client,
    base_url: String,
    headers: HeaderMap,
    timeout: Option<Duration>,
    retry: Option<RetryPolicy>,
    interceptors: Interceptors,
}

impl Api {
    pub(crate) fn new(client: Client, base_url: String) -> Self {
        Self {
            client,
            base_url,
            headers: HeaderMap::new(),
            timeout: None,
            retry: None,
            interceptors: Interceptors::new(),
        }
    }

    /// The base URL of this API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Add a default header.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the default per-attempt timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the default number of retries.
    pub fn retries(mut self, retries: u32) -> Self {
        let policy = self.retry.take().unwrap_or_else(RetryPolicy::no_retry);
        self.retry = Some(policy.max_retries(retries));
        self
    }

    /// Set the default retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Add a request interceptor to every request of this API.
    pub fn on_request(mut self, interceptor: RequestInterceptor) -> Self {
        self.interceptors.push_request(interceptor);
        self
    }

    /// Add a response interceptor to every request of this API.
    pub fn on_response(mut self, interceptor: ResponseInterceptor) -> Self {
        self.interceptors.push_response(interceptor);
        self
    }

    /// Add an error interceptor to every request of this API.
    pub fn on_error(mut self, interceptor: ErrorInterceptor) -> Self {
        self.interceptors.push_error(interceptor);
        self
    }

    /// Start building a request for `path` under the base URL.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, join_path(&self.base_url, path))
            .headers(self.headers.clone())
            .with_interceptors(&self.interceptors);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(policy) = &self.retry {
            builder = builder.retry_policy(policy.clone());
        }
        builder
    }

    /// Start building a `GET` request.
    pub fn get(&self, path: &str) -> RequestBuilder {
        self.request(Method::GET, path)
    }

    /// Start building a `POST` request.
    pub fn post(&self, path: &str) -> RequestBuilder {
        self.request(Method::POST, path)
    }

    /// Start building a `PUT` request.
    pub fn put(&self, path: &str) -> RequestBuilder {
        self.request(Method::PUT, path)
    }

    /// Start building a `PATCH` request.
    pub fn patch(&self, path: &str) -> RequestBuilder {
        self.request(Method::PATCH, path)
    }

    /// Start building a `DELETE` request.
    pub fn delete(&self, path: &str) -> RequestBuilder {
        self.request(Method::DELETE, path)
    }

    /// Start building a `HEAD` request.
    pub fn head(&self, path: &str) -> RequestBuilder {
        self.request(Method::HEAD, path)
    }
}

/// Join `path` onto `base` with exactly one slash. Absolute paths and an
/// empty path are kept as they are.
fn join_path(base: &str, path: &str) -> String {
    if is_absolute(path) {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::testing::{ScriptedTransport, Step};

    fn client(transport: &Arc<ScriptedTransport>) -> Client {
        Client::builder()
            .base_url("https://api.example.com")
            .timeout(Duration::from_secs(30))
            .transport(transport.clone())
            .build()
            .unwrap()
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("/v2/users", "7"), "/v2/users/7");
        assert_eq!(join_path("/v2/users/", "/7"), "/v2/users/7");
        assert_eq!(join_path("/v2/users", ""), "/v2/users");
        assert_eq!(
            join_path("/v2", "https://other.example/x"),
            "https://other.example/x"
        );
    }

    #[test]
    fn test_defaults_applied_to_requests() {
        let transport = ScriptedTransport::new([]);
        let api = client(&transport)
            .api("/v2/users")
            .header(
                HeaderName::from_static("x-api-key"),
                HeaderValue::from_static("k"),
            )
            .timeout(Duration::from_secs(5))
            .retries(2);

        let config = api.patch("7").into_config().unwrap();
        assert_eq!(config.method, Method::PATCH);
        assert_eq!(config.url, "/v2/users/7");
        assert_eq!(config.headers.get("x-api-key").unwrap(), "k");
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.retry.max_retries, 2);
    }

    #[test]
    fn test_client_timeout_kept_without_api_override() {
        let transport = ScriptedTransport::new([]);
        let config = client(&transport).api("/v2").get("x").into_config().unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
    }

    #[tokio::test]
    async fn test_interceptors_are_copied_per_request() {
        let transport = ScriptedTransport::new([Step::ok(""), Step::ok("")]);
        let log = Arc::new(Mutex::new(Vec::new()));
        let tag = |name: &'static str| {
            let log = log.clone();
            RequestInterceptor::sync(move |config| {
                log.lock().unwrap().push(name);
                Ok(config)
            })
        };

        let api = client(&transport).api("/v2").on_request(tag("api"));
        let early = api.get("a");
        let api = api.on_request(tag("late"));

        early.send().await.unwrap();
        assert_eq!(*log.lock().unwrap(), ["api"]);

        api.get("b").on_request(tag("local")).send().await.unwrap();
        assert_eq!(*log.lock().unwrap(), ["api", "api", "late", "local"]);
        assert_eq!(transport.seen()[1].uri, "https://api.example.com/v2/b");
    }
}
