//! URL resolution, validation and query encoding.

use serde::Serialize;
use url::Url;

use crate::FetchError;

/// Resolve `url` against an optional base.
///
/// Absolute URLs pass through unchanged. Relative URLs are joined against the
/// base, which is always treated as a directory: `users` and `/users` against
/// `https://api.example.com/v1` both give `https://api.example.com/v1/users`.
/// `./` and `../` segments are honored.
///
/// Without a base, relative URLs are returned unchanged and rejected later by
/// [`validate_url`]. Empty URLs and URLs with control characters are rejected
/// before any joining takes place.
///
/// ```
/// use chainfetch::url::resolve_url;
///
/// let base = Some("https://api.example.com/v1");
/// assert_eq!(resolve_url(base, "users/7").unwrap(), "https://api.example.com/v1/users/7");
/// assert_eq!(resolve_url(base, "../health").unwrap(), "https://api.example.com/health");
/// assert_eq!(resolve_url(base, "https://other.example/x").unwrap(), "https://other.example/x");
/// ```
pub fn resolve_url(base: Option<&str>, url: &str) -> Result<String, FetchError> {
    check_text(url)?;
    if is_absolute(url) {
        return Ok(url.to_string());
    }
    let Some(base) = base.filter(|b| !b.trim().is_empty()) else {
        return Ok(url.to_string());
    };

    let mut base = Url::parse(base)
        .map_err(|e| FetchError::invalid_url(format!("base URL {base:?}: {e}")))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }

    // `./` keeps scheme-like segments such as `v1:users` relative.
    let relative = format!("./{}", url.strip_prefix('/').unwrap_or(url));
    base.join(&relative)
        .map(String::from)
        .map_err(|e| FetchError::invalid_url(format!("{url:?}: {e}")))
}

/// Whether `url` carries its own `scheme://` prefix. Scheme-like prefixes
/// without the slashes (`localhost:8080/x`, `v1:users`) are relative paths.
pub(crate) fn is_absolute(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    url.split_once("://")
        .is_some_and(|(scheme, _)| scheme.trim_start().eq_ignore_ascii_case(parsed.scheme()))
}

fn check_text(url: &str) -> Result<(), FetchError> {
    if url.trim().is_empty() {
        return Err(FetchError::invalid_url("URL cannot be empty"));
    }
    if url.chars().any(char::is_control) {
        return Err(FetchError::invalid_url(format!(
            "{url:?} contains control characters"
        )));
    }
    Ok(())
}

/// Check that `url` can be dispatched.
///
/// Rejects empty or whitespace-only URLs, URLs containing control characters
/// (`\0`, `\n`, `\r`, ...), relative or malformed URLs and schemes other than
/// `http` and `https`.
pub fn validate_url(url: &str) -> Result<Url, FetchError> {
    check_text(url)?;
    let parsed = Url::parse(url).map_err(|e| FetchError::invalid_url(format!("{url:?}: {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(FetchError::invalid_url(format!(
            "unsupported scheme {scheme:?} in {url:?}"
        ))),
    }
}

/// Append `params`, encoded with `serde_qs`, to the query string of `url`.
///
/// Keeps any existing query and fragment.
///
/// ```
/// use chainfetch::url::append_query;
/// use std::collections::BTreeMap;
///
/// let params = BTreeMap::from([("page", 2)]);
/// assert_eq!(append_query("/users?sort=name", &params).unwrap(), "/users?sort=name&page=2");
/// ```
pub fn append_query<T: Serialize>(url: &str, params: &T) -> Result<String, FetchError> {
    let query = serde_qs::to_string(params).map_err(|e| {
        FetchError::invalid_config(format!("failed to encode query parameters: {e}"))
    })?;
    if query.is_empty() {
        return Ok(url.to_string());
    }

    let (head, fragment) = match url.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (url, None),
    };
    let separator = match head.find('?') {
        None => "?",
        Some(_) if head.ends_with('?') || head.ends_with('&') => "",
        Some(_) => "&",
    };

    let mut out = format!("{head}{separator}{query}");
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    Ok(out)
}
