//! Response wrapper with one-shot body access.
//!
//! This module provides [`HttpResponse`], which wraps a transport response
//! (or a response built by an interceptor) and lets its body be read exactly
//! once through any of [`bytes`](HttpResponse::bytes),
//! [`text`](HttpResponse::text), [`json`](HttpResponse::json) or
//! [`stream`](HttpResponse::stream).

use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{BoxError, FetchError};

/// Type-erased response body.
pub type ResponseBody = UnsyncBoxBody<Bytes, BoxError>;

/// Box any body whose error converts into [`BoxError`].
pub fn boxed_body<B>(body: B) -> ResponseBody
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    body.map_err(Into::<BoxError>::into).boxed_unsync()
}

/// A response whose body can be consumed exactly once.
///
/// Every body accessor shares a single consumption flag: after one
/// successful take, any further call fails with
/// [`ErrorKind::BodyConsumed`](crate::ErrorKind::BodyConsumed).
///
/// # Example
///
/// ```ignore
/// let response = client.get("/users/7").send().await?;
/// assert!(response.ok());
///
/// let user: User = response.json().await?;
/// assert!(response.text().await.is_err()); // already consumed
/// ```
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    url: String,
    body: Mutex<Option<ResponseBody>>,
}

impl HttpResponse {
    /// Build a response in memory, e.g. from a short-circuiting interceptor.
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self::from_parts(
            status,
            HeaderMap::new(),
            String::new(),
            boxed_body(Full::new(body.into())),
        )
    }

    /// Build a `200 OK` response with a JSON body.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self, FetchError> {
        let body = serde_json::to_vec(value)
            .map_err(|e| FetchError::decode("JSON body", e.into()))?;
        Ok(Self::new(StatusCode::OK, body)
            .with_header(CONTENT_TYPE, HeaderValue::from_static("application/json")))
    }

    /// Wrap a transport response.
    pub fn from_http(url: impl Into<String>, response: http::Response<ResponseBody>) -> Self {
        let (parts, body) = response.into_parts();
        Self::from_parts(parts.status, parts.headers, url.into(), body)
    }

    pub(crate) fn from_parts(
        status: StatusCode,
        headers: HeaderMap,
        url: String,
        body: ResponseBody,
    ) -> Self {
        Self {
            status,
            headers,
            url,
            body: Mutex::new(Some(body)),
        }
    }

    /// Set a header, replacing any previous value.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the URL this response is reported for.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// The HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns `true` for 2xx statuses.
    pub fn ok(&self) -> bool {
        self.status.is_success()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// The URL of the request that produced this response.
    ///
    /// Empty for responses built in memory without [`with_url`](Self::with_url).
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns `true` once the body has been taken by any accessor.
    pub fn body_used(&self) -> bool {
        self.body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    fn take_body(&self) -> Result<ResponseBody, FetchError> {
        self.body
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or_else(FetchError::body_consumed)
    }

    /// Read the whole body as raw bytes.
    pub async fn bytes(&self) -> Result<Bytes, FetchError> {
        let body = self.take_body()?;
        let collected = body.collect().await.map_err(FetchError::network)?;
        Ok(collected.to_bytes())
    }

    /// Read the whole body as UTF-8 text.
    pub async fn text(&self) -> Result<String, FetchError> {
        let bytes = self.bytes().await?;
        String::from_utf8(bytes.to_vec()).map_err(|e| FetchError::decode("UTF-8 body", e.into()))
    }

    /// Read the whole body and deserialize it as JSON.
    pub async fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        let bytes = self.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| FetchError::decode("JSON body", e.into()))
    }

    /// Take the body as a stream of data chunks.
    pub fn stream(
        &self,
    ) -> Result<impl Stream<Item = Result<Bytes, FetchError>> + Send + 'static, FetchError> {
        let body = self.take_body()?;
        Ok(body.into_data_stream().map_err(FetchError::network))
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body_used", &self.body_used())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;
    use crate::ErrorKind;

    fn response(body: &'static str) -> HttpResponse {
        HttpResponse::new(StatusCode::OK, body)
    }

    #[tokio::test]
    async fn test_text_then_any_accessor_fails() {
        let res = response(r#"{"a":1}"#);
        assert_eq!(res.text().await.unwrap(), r#"{"a":1}"#);
        assert!(res.body_used());

        let err = res.json::<serde_json::Value>().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BodyConsumed);
        assert!(err.to_string().contains("already been consumed"));
        assert_eq!(res.text().await.unwrap_err().kind(), ErrorKind::BodyConsumed);
        assert_eq!(res.bytes().await.unwrap_err().kind(), ErrorKind::BodyConsumed);
        assert_eq!(res.stream().err().unwrap().kind(), ErrorKind::BodyConsumed);
    }

    #[tokio::test]
    async fn test_json_then_text_fails() {
        let res = response(r#"{"success":true}"#);
        let value: serde_json::Value = res.json().await.unwrap();
        assert_eq!(value["success"], true);

        assert_eq!(res.text().await.unwrap_err().kind(), ErrorKind::BodyConsumed);
    }

    #[tokio::test]
    async fn test_stream_consumes_body() {
        let res = response("chunked body");
        let chunks: Vec<Bytes> = res
            .stream()
            .unwrap()
            .map(|chunk| chunk.unwrap())
            .collect()
            .await;
        assert_eq!(chunks.concat(), b"chunked body");

        assert_eq!(res.bytes().await.unwrap_err().kind(), ErrorKind::BodyConsumed);
    }

    #[tokio::test]
    async fn test_failed_decode_still_consumes_body() {
        let res = response("not json");
        let err = res.json::<serde_json::Value>().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);

        assert_eq!(res.text().await.unwrap_err().kind(), ErrorKind::BodyConsumed);
    }

    #[tokio::test]
    async fn test_from_json_sets_content_type() {
        let res = HttpResponse::from_json(&serde_json::json!({ "id": 7 })).unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.ok());
        assert_eq!(res.headers().get(CONTENT_TYPE).unwrap(), "application/json");

        let value: serde_json::Value = res.json().await.unwrap();
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn test_debug_reports_body_state() {
        let res = response("x").with_url("https://api.example/x");
        let debug = format!("{res:?}");
        assert!(debug.contains("body_used: false"));
        assert!(debug.contains("https://api.example/x"));
    }
}
