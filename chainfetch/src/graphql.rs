//! GraphQL over the request pipeline.
//!
//! A [`GraphqlRequest`] is a JSON `POST` of `{query, variables,
//! operationName}` sent through the normal pipeline, so timeouts, retries
//! and interceptors apply as for any other request.

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use http_body_util::Full;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ErrorKind, FetchError};
use crate::request::RequestBuilder;
use crate::response::{HttpResponse, boxed_body};

/// A GraphQL operation ready to be sent.
///
/// # Example
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct Viewer { login: String }
///
/// let response = client
///     .graphql("/graphql", "query Viewer { viewer { login } }")
///     .operation_name("Viewer")
///     .fail_on_errors(true)
///     .send::<Viewer>()
///     .await?;
/// ```
#[must_use = "GraphqlRequest does nothing until you 'send' it"]
#[derive(Debug)]
pub struct GraphqlRequest {
    builder: RequestBuilder,
    query: String,
    variables: Result<Option<Value>, FetchError>,
    operation_name: Option<String>,
    fail_on_errors: bool,
}

#[derive(Serialize)]
struct Payload<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<&'a Value>,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    operation_name: Option<&'a str>,
}

/// The `{data, errors}` envelope of a GraphQL response.
#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub struct GraphqlResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
    #[serde(default)]
    pub extensions: Option<Value>,
}

impl<T> GraphqlResponse<T> {
    /// Returns `true` if the server reported errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// One entry of a GraphQL `errors` array.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct GraphqlError {
    pub message: String,
    #[serde(default)]
    pub locations: Vec<GraphqlLocation>,
    #[serde(default)]
    pub path: Vec<Value>,
    #[serde(default)]
    pub extensions: Option<Value>,
}

/// Position of an error in the query document.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct GraphqlLocation {
    pub line: u32,
    pub column: u32,
}

impl GraphqlRequest {
    pub(crate) fn new(builder: RequestBuilder, query: String) -> Self {
        Self {
            builder,
            query,
            variables: Ok(None),
            operation_name: None,
            fail_on_errors: false,
        }
    }

    /// Set the operation variables.
    pub fn variables<V: Serialize + ?Sized>(mut self, variables: &V) -> Self {
        self.variables = serde_json::to_value(variables).map(Some).map_err(|e| {
            FetchError::invalid_config(format!("failed to encode GraphQL variables: {e}"))
                .with_cause(e)
        });
        self
    }

    /// Select the operation to run in a multi-operation document.
    pub fn operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Fail with [`ErrorKind::GraphQl`] when the response carries errors.
    pub fn fail_on_errors(mut self, enabled: bool) -> Self {
        self.fail_on_errors = enabled;
        self
    }

    /// Customize the underlying HTTP request (headers, timeout, ...).
    pub fn request(mut self, f: impl FnOnce(RequestBuilder) -> RequestBuilder) -> Self {
        self.builder = f(self.builder);
        self
    }

    /// Send the operation and decode the response envelope.
    pub async fn send<T: DeserializeOwned>(self) -> Result<GraphqlResponse<T>, FetchError> {
        let variables = self.variables?;
        let payload = Payload {
            query: &self.query,
            variables: variables.as_ref(),
            operation_name: self.operation_name.as_deref(),
        };
        let response = self.builder.json(&payload).send().await?;

        let status = response.status();
        let headers = response.headers().clone();
        let url = response.url().to_string();
        let body = response.bytes().await?;

        let envelope: GraphqlResponse<T> = serde_json::from_slice(&body).map_err(|e| {
            FetchError::decode("GraphQL response", e.into())
                .with_response(rewrap(status, headers.clone(), &url, body.clone()))
                .fill_request(&url, &Method::POST)
        })?;

        if self.fail_on_errors && envelope.has_errors() {
            let messages: Vec<&str> = envelope.errors.iter().map(|e| e.message.as_str()).collect();
            let err = FetchError::new(
                ErrorKind::GraphQl,
                format!("GraphQL error: {}", messages.join("; ")),
            )
            .with_response(rewrap(status, headers, &url, body))
            .fill_request(&url, &Method::POST);
            return Err(err);
        }
        Ok(envelope)
    }
}

/// A fresh response over an already-read body.
fn rewrap(status: StatusCode, headers: HeaderMap, url: &str, body: Bytes) -> HttpResponse {
    HttpResponse::from_parts(status, headers, url.to_string(), boxed_body(Full::new(body)))
}
