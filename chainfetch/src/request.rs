//! Fluent request construction.
//!
//! A [`RequestBuilder`] accumulates a [`RequestConfig`] and per-request
//! interceptors, then hands both to [`Client::execute_with`] on
//! [`send`](RequestBuilder::send).
//!
//! Setters that can fail (invalid header, unserializable body, zero timeout)
//! do not return a `Result`. The first failure is kept and returned by the
//! terminal call, before any interceptor or network activity.

use std::time::Duration;

use bytes::Bytes;
use chainfetch_core::AbortController;
use http::header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, HeaderName, HeaderValue};
use http::HeaderMap;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::client::Client;
use crate::config::{
    Credentials, ErrorInterceptor, Interceptors, Priority, Redirect, RequestCache, RequestConfig,
    RequestInterceptor, RequestMode, ResponseInterceptor, RetryPolicy,
};
use crate::cookie::cookie_header;
use crate::csrf::CsrfProtection;
use crate::error::FetchError;
use crate::response::HttpResponse;
use crate::url::append_query;

/// Builder for a single request.
///
/// Created by [`Client::request`], [`Client::get`] and friends, or by an
/// [`Api`](crate::Api).
///
/// # Example
///
/// ```ignore
/// use chainfetch::{AbortController, RequestCache};
/// use std::time::Duration;
///
/// let controller = AbortController::new();
/// let created: User = client
///     .post("/users")
///     .header("x-request-id", "42")
///     .json(&NewUser { name: "ada" })
///     .timeout(Duration::from_secs(2))
///     .retries(1)
///     .cache(RequestCache::NoStore)
///     .abort_controller(controller.clone())
///     .send_json()
///     .await?;
/// ```
#[must_use = "RequestBuilder does nothing until you 'send' it"]
pub struct RequestBuilder {
    client: Client,
    config: Result<RequestConfig, FetchError>,
    interceptors: Interceptors,
}

impl std::fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("config", &self.config)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

impl RequestBuilder {
    pub(crate) fn new(client: Client, config: RequestConfig) -> Self {
        Self {
            client,
            config: Ok(config),
            interceptors: Interceptors::new(),
        }
    }

    /// Apply a fallible edit, keeping the first error.
    fn map(mut self, f: impl FnOnce(&mut RequestConfig) -> Result<(), FetchError>) -> Self {
        let result = match &mut self.config {
            Ok(config) => f(config).map_err(|err| err.fill_request(&config.url, &config.method)),
            Err(_) => Ok(()),
        };
        if let Err(err) = result {
            self.config = Err(err);
        }
        self
    }

    fn edit(self, f: impl FnOnce(&mut RequestConfig)) -> Self {
        self.map(|config| {
            f(config);
            Ok(())
        })
    }

    /// Set a header, replacing any value of the same name.
    pub fn header<K, V>(self, key: K, value: V) -> Self
    where
        HeaderName: TryFrom<K>,
        <HeaderName as TryFrom<K>>::Error: Into<http::Error>,
        HeaderValue: TryFrom<V>,
        <HeaderValue as TryFrom<V>>::Error: Into<http::Error>,
    {
        self.map(|config| {
            let name = HeaderName::try_from(key).map_err(|e| invalid_header(e.into()))?;
            let value = HeaderValue::try_from(value).map_err(|e| invalid_header(e.into()))?;
            config.headers.insert(name, value);
            Ok(())
        })
    }

    /// Merge `headers`, replacing existing values of the same names.
    pub fn headers(self, headers: HeaderMap) -> Self {
        self.edit(|config| {
            let mut current: Option<HeaderName> = None;
            for (name, value) in headers {
                match name {
                    Some(name) => {
                        config.headers.insert(name.clone(), value);
                        current = Some(name);
                    }
                    None => {
                        if let Some(name) = &current {
                            config.headers.append(name.clone(), value);
                        }
                    }
                }
            }
        })
    }

    /// Set `Authorization: Bearer <token>`, marked sensitive.
    pub fn bearer_auth(self, token: impl std::fmt::Display) -> Self {
        self.map(|config| {
            let mut value = HeaderValue::try_from(format!("Bearer {token}"))
                .map_err(|e| invalid_header(e.into()))?;
            value.set_sensitive(true);
            config.headers.insert(AUTHORIZATION, value);
            Ok(())
        })
    }

    /// Add a cookie to the `Cookie` header.
    pub fn cookie(self, name: &str, value: &str) -> Self {
        self.map(|config| {
            let pair = cookie_header([(name, value)]);
            let combined = match config.headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
                Some(existing) if !existing.is_empty() => format!("{existing}; {pair}"),
                _ => pair,
            };
            let value = HeaderValue::try_from(combined).map_err(|e| invalid_header(e.into()))?;
            config.headers.insert(COOKIE, value);
            Ok(())
        })
    }

    /// Append `params` to the URL query string.
    pub fn query<T: Serialize>(self, params: &T) -> Self {
        self.map(|config| {
            config.url = append_query(&config.url, params)?;
            Ok(())
        })
    }

    /// Set the request body.
    pub fn body(self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        self.edit(|config| config.body = Some(body))
    }

    /// Serialize `value` as the JSON body.
    ///
    /// Sets `Content-Type: application/json` unless a content type is
    /// already present.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.map(|config| {
            let body = serde_json::to_vec(value).map_err(|e| {
                FetchError::invalid_config(format!("failed to encode JSON body: {e}")).with_cause(e)
            })?;
            config
                .headers
                .entry(CONTENT_TYPE)
                .or_insert(HeaderValue::from_static("application/json"));
            config.body = Some(body.into());
            Ok(())
        })
    }

    /// Serialize `value` as an `application/x-www-form-urlencoded` body.
    pub fn form<T: Serialize>(self, value: &T) -> Self {
        self.map(|config| {
            let body = serde_qs::to_string(value).map_err(|e| {
                FetchError::invalid_config(format!("failed to encode form body: {e}"))
            })?;
            config.headers.entry(CONTENT_TYPE).or_insert(HeaderValue::from_static(
                "application/x-www-form-urlencoded",
            ));
            config.body = Some(body.into());
            Ok(())
        })
    }

    /// Set the per-attempt timeout. A zero duration is rejected.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.map(|config| config.set_timeout(timeout))
    }

    /// Remove any timeout inherited from the client.
    pub fn no_timeout(self) -> Self {
        self.edit(RequestConfig::clear_timeout)
    }

    /// Set the number of retries after the first attempt.
    pub fn retries(self, retries: u32) -> Self {
        self.edit(|config| config.retry.max_retries = retries)
    }

    /// Replace the retry policy.
    pub fn retry_policy(self, policy: RetryPolicy) -> Self {
        self.map(|config| {
            policy.validate()?;
            config.retry = policy;
            Ok(())
        })
    }

    /// Attach an abort controller. A later call replaces an earlier one.
    pub fn abort_controller(self, controller: AbortController) -> Self {
        self.edit(|config| config.set_abort_controller(controller))
    }

    /// Set the cache mode hint.
    pub fn cache(self, cache: RequestCache) -> Self {
        self.edit(|config| config.options.cache = Some(cache))
    }

    /// Set the credentials hint.
    pub fn credentials(self, credentials: Credentials) -> Self {
        self.edit(|config| config.options.credentials = Some(credentials))
    }

    /// Set the request mode hint.
    pub fn mode(self, mode: RequestMode) -> Self {
        self.edit(|config| config.options.mode = Some(mode))
    }

    /// Set the redirect hint.
    pub fn redirect(self, redirect: Redirect) -> Self {
        self.edit(|config| config.options.redirect = Some(redirect))
    }

    /// Set the referrer hint.
    pub fn referrer(self, referrer: impl Into<String>) -> Self {
        let referrer = referrer.into();
        self.edit(|config| config.options.referrer = Some(referrer))
    }

    /// Set the priority hint.
    pub fn priority(self, priority: Priority) -> Self {
        self.edit(|config| config.options.priority = Some(priority))
    }

    /// Turn non-2xx responses into [`ErrorKind::HttpStatus`](crate::ErrorKind::HttpStatus)
    /// errors.
    pub fn fail_on_status(self, enabled: bool) -> Self {
        self.edit(|config| config.fail_on_status = enabled)
    }

    /// Send the CSRF token held by `protection` if the method is unsafe.
    pub fn csrf(mut self, protection: &CsrfProtection) -> Self {
        self.interceptors.push_request(protection.interceptor());
        self
    }

    /// Add a per-request request interceptor. Runs before global ones.
    pub fn on_request(mut self, interceptor: RequestInterceptor) -> Self {
        self.interceptors.push_request(interceptor);
        self
    }

    /// Add a per-request response interceptor. Runs before global ones.
    pub fn on_response(mut self, interceptor: ResponseInterceptor) -> Self {
        self.interceptors.push_response(interceptor);
        self
    }

    /// Add a per-request error interceptor. Runs before global ones.
    pub fn on_error(mut self, interceptor: ErrorInterceptor) -> Self {
        self.interceptors.push_error(interceptor);
        self
    }

    pub(crate) fn with_interceptors(mut self, interceptors: &Interceptors) -> Self {
        self.interceptors.extend(interceptors);
        self
    }

    /// The config as built so far.
    pub fn into_config(self) -> Result<RequestConfig, FetchError> {
        self.config
    }

    /// Send the request.
    pub async fn send(self) -> Result<HttpResponse, FetchError> {
        let config = self.config?;
        self.client.execute_with(config, &self.interceptors).await
    }

    /// Send the request and deserialize the JSON body.
    pub async fn send_json<T: DeserializeOwned>(self) -> Result<T, FetchError> {
        self.send().await?.json().await
    }

    /// Send the request and read the body as text.
    pub async fn send_text(self) -> Result<String, FetchError> {
        self.send().await?.text().await
    }

    /// Send the request and read the body as bytes.
    pub async fn send_bytes(self) -> Result<Bytes, FetchError> {
        self.send().await?.bytes().await
    }
}

fn invalid_header(err: http::Error) -> FetchError {
    FetchError::invalid_config(format!("invalid header: {err}")).with_cause(err)
}
