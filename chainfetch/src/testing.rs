//! Scripted in-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use http_body_util::Full;

use crate::FetchOptions;
use crate::error::BoxError;
use crate::response::{ResponseBody, boxed_body};
use crate::transport::{Transport, TransportBody, TransportFuture};

/// What the transport does on one attempt.
pub(crate) enum Step {
    /// Respond after `delay`.
    Respond {
        delay: Duration,
        status: StatusCode,
        body: &'static str,
    },
    /// Fail immediately with a transport error.
    Fail(&'static str),
    /// Never complete.
    Hang,
}

impl Step {
    pub(crate) fn ok(body: &'static str) -> Self {
        Step::Respond {
            delay: Duration::ZERO,
            status: StatusCode::OK,
            body,
        }
    }

    pub(crate) fn slow(delay: Duration, body: &'static str) -> Self {
        Step::Respond {
            delay,
            status: StatusCode::OK,
            body,
        }
    }

    pub(crate) fn status(status: StatusCode, body: &'static str) -> Self {
        Step::Respond {
            delay: Duration::ZERO,
            status,
            body,
        }
    }
}

/// A request as seen by the transport.
#[derive(Debug)]
pub(crate) struct Seen {
    pub(crate) method: Method,
    pub(crate) uri: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Option<Bytes>,
    pub(crate) options: Option<FetchOptions>,
}

/// Replays `steps` in order, then answers `200 OK` with an empty body.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    attempts: AtomicUsize,
    seen: Mutex<Vec<Seen>>,
}

impl ScriptedTransport {
    pub(crate) fn new(steps: impl IntoIterator<Item = Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Default::default()
        })
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn seen(&self) -> std::sync::MutexGuard<'_, Vec<Seen>> {
        self.seen.lock().unwrap()
    }
}

impl Transport for ScriptedTransport {
    fn fetch(&self, request: http::Request<TransportBody>) -> TransportFuture {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(Seen {
            method: request.method().clone(),
            uri: request.uri().to_string(),
            headers: request.headers().clone(),
            body: request.body().as_bytes().cloned(),
            options: request.extensions().get::<FetchOptions>().cloned(),
        });

        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Step::ok(""));

        Box::pin(play(step))
    }
}

async fn play(step: Step) -> Result<http::Response<ResponseBody>, BoxError> {
    match step {
        Step::Respond {
            delay,
            status,
            body,
        } => {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let response = http::Response::builder()
                .status(status)
                .body(boxed_body(Full::new(Bytes::from_static(body.as_bytes()))))?;
            Ok(response)
        }
        Step::Fail(message) => Err(message.into()),
        Step::Hang => std::future::pending().await,
    }
}
