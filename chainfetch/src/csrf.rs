//! CSRF token propagation.
//!
//! Double-submit protection as browsers do it: the server sets a token
//! cookie, the client echoes the token in a header on state-changing
//! requests. [`CsrfProtection`] keeps the latest token seen in a
//! `Set-Cookie` header and provides the interceptors that capture and send
//! it.
//!
//! # Example
//!
//! ```ignore
//! use chainfetch::{Client, csrf::CsrfProtection};
//!
//! let client = Client::builder().base_url("https://app.example.com").build()?;
//! let csrf = CsrfProtection::default();
//! csrf.install(&client);
//!
//! client.get("/session").send().await?;      // server sets XSRF-TOKEN
//! client.post("/orders").send().await?;      // sends X-XSRF-TOKEN
//! ```

use std::sync::{Arc, PoisonError, RwLock};

use http::header::{COOKIE, HeaderName, HeaderValue, SET_COOKIE};
use http::Method;

use crate::client::Client;
use crate::config::{RequestConfig, RequestInterceptor, ResponseInterceptor};
use crate::cookie::{get_cookie, set_cookie_value};
use crate::response::HttpResponse;

/// Default name of the token cookie.
pub const DEFAULT_COOKIE_NAME: &str = "XSRF-TOKEN";

/// Default name of the token header.
pub const DEFAULT_HEADER_NAME: &str = "x-xsrf-token";

/// Upper bound on accepted token length.
const MAX_TOKEN_LEN: usize = 4096;

/// Cookie and header names used for CSRF tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CsrfConfig {
    pub cookie_name: String,
    pub header_name: HeaderName,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            header_name: HeaderName::from_static(DEFAULT_HEADER_NAME),
        }
    }
}

/// Returns `true` if `token` can be sent as a header value.
///
/// Tokens must be non-empty, at most 4096 bytes and made of visible ASCII
/// characters other than `"`, `,`, `;` and `\`.
pub fn is_valid_token(token: &str) -> bool {
    !token.is_empty()
        && token.len() <= MAX_TOKEN_LEN
        && token
            .bytes()
            .all(|b| b.is_ascii_graphic() && !matches!(b, b'"' | b',' | b';' | b'\\'))
}

/// Extract a valid token named `cookie_name` from a `Cookie` header.
///
/// ```
/// use chainfetch::csrf::extract_token;
///
/// assert_eq!(extract_token("theme=dark; XSRF-TOKEN=abc123", "XSRF-TOKEN").as_deref(), Some("abc123"));
/// assert_eq!(extract_token("XSRF-TOKEN=", "XSRF-TOKEN"), None);
/// ```
pub fn extract_token(cookie_header: &str, cookie_name: &str) -> Option<String> {
    get_cookie(cookie_header, cookie_name).filter(|token| is_valid_token(token))
}

/// Methods that never carry the token.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Shared CSRF token store and interceptors.
///
/// Cloning is cheap; clones share the token.
#[derive(Clone, Debug, Default)]
pub struct CsrfProtection {
    config: Arc<CsrfConfig>,
    token: Arc<RwLock<Option<String>>>,
}

impl CsrfProtection {
    /// Create a store using `config`.
    pub fn new(config: CsrfConfig) -> Self {
        Self {
            config: Arc::new(config),
            token: Arc::default(),
        }
    }

    /// The cookie and header names in use.
    pub fn config(&self) -> &CsrfConfig {
        &self.config
    }

    /// The current token.
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Store `token`. Returns `false`, keeping the old token, if it is not
    /// valid.
    pub fn set_token(&self, token: impl Into<String>) -> bool {
        let token = token.into();
        if !is_valid_token(&token) {
            return false;
        }
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        true
    }

    /// Forget the current token.
    pub fn clear(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Store the token from the response's `Set-Cookie` headers, if any.
    pub fn capture(&self, response: &HttpResponse) {
        let token = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| set_cookie_value(value, &self.config.cookie_name));
        if let Some(token) = token {
            self.set_token(token);
        }
    }

    /// Add the token header to `config` for unsafe methods.
    ///
    /// Falls back to the token in the request's own `Cookie` header. A header
    /// already set by the caller is kept.
    pub fn apply(&self, config: &mut RequestConfig) {
        if is_safe_method(&config.method) || config.headers.contains_key(&self.config.header_name)
        {
            return;
        }
        let token = self.token().or_else(|| {
            config
                .headers
                .get(COOKIE)
                .and_then(|value| value.to_str().ok())
                .and_then(|header| extract_token(header, &self.config.cookie_name))
        });
        if let Some(value) = token.and_then(|t| HeaderValue::from_str(&t).ok()) {
            config.headers.insert(self.config.header_name.clone(), value);
        }
    }

    /// Request interceptor sending the token on unsafe methods.
    pub fn interceptor(&self) -> RequestInterceptor {
        let this = self.clone();
        RequestInterceptor::sync(move |mut config| {
            this.apply(&mut config);
            Ok(config)
        })
    }

    /// Response interceptor capturing tokens from `Set-Cookie`.
    pub fn response_interceptor(&self) -> ResponseInterceptor {
        let this = self.clone();
        ResponseInterceptor::sync(move |response| {
            this.capture(&response);
            Ok(response)
        })
    }

    /// Register both interceptors globally on `client`.
    pub fn install(&self, client: &Client) {
        client.add_request_interceptor(self.interceptor());
        client.add_response_interceptor(self.response_interceptor());
    }
}
