//! Request body type handed to transports.
//!
//! [`TransportBody`] carries the opaque payload of a
//! [`RequestConfig`](crate::RequestConfig) into an `http::Request`. The body is
//! rebuilt from the config for every attempt, so a retried request always sends
//! the complete payload again.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};

/// A buffered request body.
#[derive(Default)]
pub enum TransportBody {
    /// No body, e.g. for `GET` and `HEAD`.
    #[default]
    Empty,
    /// The complete payload. `None` once it has been yielded.
    Full(Option<Bytes>),
}

impl TransportBody {
    /// Create an empty body.
    pub fn empty() -> Self {
        TransportBody::Empty
    }

    /// Create a body with the given data.
    pub fn full(data: Bytes) -> Self {
        TransportBody::Full(Some(data))
    }

    /// Build the body for one attempt from a config's optional payload.
    pub(crate) fn from_optional(data: Option<Bytes>) -> Self {
        match data {
            Some(data) => TransportBody::full(data),
            None => TransportBody::Empty,
        }
    }

    /// The payload, if it has not been yielded yet.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            TransportBody::Full(data) => data.as_ref(),
            TransportBody::Empty => None,
        }
    }
}

impl Body for TransportBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            TransportBody::Empty => Poll::Ready(None),
            TransportBody::Full(data) => Poll::Ready(data.take().map(|d| Ok(Frame::data(d)))),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            TransportBody::Empty => true,
            TransportBody::Full(data) => data.is_none(),
        }
    }

    fn size_hint(&self) -> SizeHint {
        let len = self.as_bytes().map_or(0, |d| d.len() as u64);
        SizeHint::with_exact(len)
    }
}

impl From<Bytes> for TransportBody {
    fn from(data: Bytes) -> Self {
        TransportBody::full(data)
    }
}

impl std::fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportBody::Empty => write!(f, "TransportBody::Empty"),
            TransportBody::Full(data) => f
                .debug_struct("TransportBody::Full")
                .field("data_len", &data.as_ref().map(|d| d.len()))
                .finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_empty_body() {
        let body = TransportBody::empty();
        assert!(body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(0));

        let collected = body.collect().await.unwrap();
        assert!(collected.to_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_full_body() {
        let data = Bytes::from("hello world");
        let body = TransportBody::from_optional(Some(data.clone()));
        assert!(!body.is_end_stream());
        assert_eq!(body.size_hint().exact(), Some(11));

        let collected = body.collect().await.unwrap();
        assert_eq!(collected.to_bytes(), data);
    }
}
