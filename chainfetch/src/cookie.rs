//! Cookie formatting and parsing.
//!
//! Thin helpers over the `cookie` crate for the two headers a client deals
//! with: `Set-Cookie` (formatting, e.g. for test servers or interceptors that
//! fake responses) and `Cookie` (parsing and building request headers).

use std::time::{Duration, SystemTime};

use cookie::{Cookie, Expiration};

pub use cookie::SameSite;

/// Attributes of a `Set-Cookie` header.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<Duration>,
    pub expires: Option<SystemTime>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl CookieOptions {
    /// Options with `Path=/`.
    pub fn new() -> Self {
        Self {
            path: Some("/".to_string()),
            ..Default::default()
        }
    }
}

/// Format a `Set-Cookie` header value.
///
/// ```
/// use chainfetch::cookie::{CookieOptions, SameSite, format_cookie};
///
/// let options = CookieOptions {
///     secure: true,
///     same_site: Some(SameSite::Strict),
///     ..CookieOptions::new()
/// };
/// assert_eq!(
///     format_cookie("session", "abc123", &options),
///     "session=abc123; SameSite=Strict; Secure; Path=/"
/// );
/// ```
pub fn format_cookie(name: &str, value: &str, options: &CookieOptions) -> String {
    let mut builder = Cookie::build((name.to_string(), value.to_string()))
        .secure(options.secure)
        .http_only(options.http_only);

    if let Some(path) = &options.path {
        builder = builder.path(path.clone());
    }
    if let Some(domain) = &options.domain {
        builder = builder.domain(domain.clone());
    }
    if let Some(same_site) = options.same_site {
        builder = builder.same_site(same_site);
    }
    if let Some(max_age) = options.max_age {
        // Out-of-range ages are dropped rather than clamped.
        if let Ok(max_age) = max_age.try_into() {
            builder = builder.max_age(max_age);
        }
    }
    if let Some(expires) = options.expires {
        builder = builder.expires(Expiration::DateTime(expires.into()));
    }

    builder.build().to_string()
}

/// Parse a `Cookie` request header into name/value pairs.
///
/// Malformed entries are skipped.
///
/// ```
/// use chainfetch::cookie::parse_cookies;
///
/// let pairs = parse_cookies("a=1; b=two; c=");
/// assert_eq!(pairs.len(), 3);
/// assert_eq!(pairs[1], ("b".to_string(), "two".to_string()));
/// assert_eq!(pairs[2].1, "");
/// ```
pub fn parse_cookies(header: &str) -> Vec<(String, String)> {
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
        .collect()
}

/// Look up one cookie in a `Cookie` request header.
pub fn get_cookie(header: &str, name: &str) -> Option<String> {
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

/// Build a `Cookie` request header from name/value pairs.
pub fn cookie_header<I, K, V>(pairs: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .into_iter()
        .map(|(name, value)| format!("{}={}", name.as_ref(), value.as_ref()))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Value of the `Set-Cookie` header named `name`, if `header` is one.
pub(crate) fn set_cookie_value(header: &str, name: &str) -> Option<String> {
    Cookie::parse(header)
        .ok()
        .filter(|cookie| cookie.name() == name)
        .map(|cookie| cookie.value().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_plain_cookie() {
        assert_eq!(
            format_cookie("theme", "dark", &CookieOptions::default()),
            "theme=dark"
        );
    }

    #[test]
    fn test_format_all_attributes() {
        let options = CookieOptions {
            path: Some("/app".into()),
            domain: Some("example.com".into()),
            max_age: Some(Duration::from_secs(3600)),
            secure: true,
            http_only: true,
            same_site: Some(SameSite::Lax),
            ..Default::default()
        };
        let header = format_cookie("session", "abc", &options);

        assert!(header.starts_with("session=abc"));
        for attribute in [
            "HttpOnly",
            "SameSite=Lax",
            "Secure",
            "Path=/app",
            "Domain=example.com",
            "Max-Age=3600",
        ] {
            assert!(header.contains(attribute), "{header} lacks {attribute}");
        }
    }

    #[test]
    fn test_format_expires() {
        let options = CookieOptions {
            expires: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(86_400)),
            ..Default::default()
        };
        let header = format_cookie("a", "1", &options);
        assert!(header.contains("Expires=Fri, 02 Jan 1970 00:00:00 GMT"), "{header}");
    }

    #[test]
    fn test_parse_and_lookup() {
        let header = "XSRF-TOKEN=tok; theme=dark";
        assert_eq!(parse_cookies(header).len(), 2);
        assert_eq!(get_cookie(header, "theme").as_deref(), Some("dark"));
        assert_eq!(get_cookie(header, "missing"), None);
    }

    #[test]
    fn test_cookie_header() {
        assert_eq!(cookie_header([("a", "1"), ("b", "2")]), "a=1; b=2");
        assert_eq!(cookie_header(Vec::<(String, String)>::new()), "");
    }

    #[test]
    fn test_set_cookie_value() {
        assert_eq!(
            set_cookie_value("XSRF-TOKEN=abc; Path=/; Secure", "XSRF-TOKEN").as_deref(),
            Some("abc")
        );
        assert_eq!(set_cookie_value("other=abc", "XSRF-TOKEN"), None);
    }
}
