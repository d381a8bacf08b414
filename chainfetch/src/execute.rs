//! The request execution engine.
//!
//! [`Engine::execute`] turns a [`RequestConfig`] into a response or a
//! classified [`FetchError`]:
//!
//! 1. Request interceptors run over the config. One of them may answer with a
//!    response instead, which skips the network entirely.
//! 2. Each attempt resolves and validates the URL, builds a fresh request from
//!    the config and races the transport against the attempt's effective
//!    abort signal (the caller's controller combined with a per-attempt timer).
//! 3. Failed attempts are classified and retried while the [`RetryPolicy`]
//!    allows it.
//! 4. Response interceptors run over a response; error interceptors run over
//!    a failure and may recover it into a response.
//!
//! Attempts never overlap, and interceptors of one chain run one at a time in
//! the order given by [`Pipeline`].
//!
//! [`RetryPolicy`]: crate::RetryPolicy

use chainfetch_core::{AbortController, AbortSignal, combine};
use http::Method;
use url::Url;

use crate::config::{AttemptOutcome, ErrorStep, Pipeline, RequestConfig, RequestStep};
use crate::error::FetchError;
use crate::response::HttpResponse;
use crate::transport::{Transport, TransportBody};
use crate::url::{resolve_url, validate_url};

#[cfg(feature = "tracing")]
use tracing::Instrument;

/// Runs requests against one transport.
#[derive(Clone, Copy)]
pub(crate) struct Engine<'a> {
    transport: &'a dyn Transport,
    base_url: Option<&'a str>,
}

impl<'a> Engine<'a> {
    pub(crate) fn new(transport: &'a dyn Transport, base_url: Option<&'a str>) -> Self {
        Self {
            transport,
            base_url,
        }
    }

    /// Run the full lifecycle of one request.
    pub(crate) async fn execute(
        self,
        config: RequestConfig,
        pipeline: Pipeline<'_>,
    ) -> Result<HttpResponse, FetchError> {
        #[cfg(feature = "tracing")]
        let span =
            tracing::debug_span!("fetch.execute", method = %config.method, url = %config.url);

        let run = self.run(config, pipeline);
        #[cfg(feature = "tracing")]
        let run = run.instrument(span);

        run.await
    }

    async fn run(
        self,
        config: RequestConfig,
        pipeline: Pipeline<'_>,
    ) -> Result<HttpResponse, FetchError> {
        // Errors name the request that was actually sent, so the target is
        // taken again once the request interceptors are done with the config.
        let mut url = config.url.clone();
        let mut method = config.method.clone();

        let outcome = match apply_request_chain(config, pipeline).await {
            Ok(RequestStep::Continue(config)) => {
                url = resolve_url(self.base_url, &config.url)
                    .unwrap_or_else(|_| config.url.clone());
                method = config.method.clone();
                self.dispatch(&config).await
            }
            Ok(RequestStep::Respond(response)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(status = %response.status(), "request answered by interceptor");
                Ok(response)
            }
            Err(err) => Err(err),
        };

        let result = match outcome {
            Ok(response) => apply_response_chain(response, pipeline).await,
            Err(err) => apply_error_chain(err, pipeline).await,
        };
        result.map_err(|err| err.fill_request(&url, &method))
    }

    /// Attempt the request until it succeeds, fails terminally or runs out of
    /// retries.
    async fn dispatch(self, config: &RequestConfig) -> Result<HttpResponse, FetchError> {
        let external = config.abort.as_ref().map(AbortController::signal);
        let mut backoff = config.retry.backoff();

        loop {
            let result = self.attempt(config, external.clone()).await;
            match config.retry.classify(backoff.attempts(), result) {
                AttemptOutcome::Success(response) => {
                    if config.fail_on_status && !response.ok() {
                        return Err(FetchError::http_status(response));
                    }
                    return Ok(response);
                }
                AttemptOutcome::TerminalFailure(err) => return Err(err),
                AttemptOutcome::RetryableFailure(_err) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(error = %_err, "attempt failed");
                }
            }

            // A caller abort racing a failed attempt still ends the request.
            if let Some(reason) = external.as_ref().and_then(AbortSignal::reason) {
                return Err(FetchError::from_abort(&reason).fill_request(&config.url, &config.method));
            }

            let delay = backoff.next_delay();

            #[cfg(feature = "tracing")]
            tracing::debug!(
                retry = backoff.attempts(),
                max_retries = config.retry.max_retries,
                delay_ms = delay.as_millis() as u64,
                "retrying request"
            );

            if !delay.is_zero() {
                sleep_unless_aborted(delay, external.as_ref())
                    .await
                    .map_err(|err| err.fill_request(&config.url, &config.method))?;
            }
        }
    }

    /// One network attempt under the attempt's effective signal.
    async fn attempt(
        self,
        config: &RequestConfig,
        external: Option<AbortSignal>,
    ) -> Result<HttpResponse, FetchError> {
        let url = resolve_url(self.base_url, &config.url)
            .map_err(|err| err.fill_request(&config.url, &config.method))?;
        let parsed = validate_url(&url).map_err(|err| err.fill_request(&url, &config.method))?;
        let request =
            build_request(config, &parsed).map_err(|err| err.fill_request(&url, &config.method))?;

        let timeout = config.timeout().map(AbortSignal::timeout);
        let signal = combine(external, timeout);

        #[cfg(feature = "tracing")]
        tracing::debug!(method = %config.method, url = %url, "sending request");

        let result = match signal {
            None => self.send(request, &url).await,
            Some(signal) => {
                if let Some(reason) = signal.reason() {
                    Err(FetchError::from_abort(&reason))
                } else {
                    tokio::select! {
                        biased;
                        reason = signal.aborted() => Err(FetchError::from_abort(&reason)),
                        result = self.send(request, &url) => result,
                    }
                }
            }
        };

        result.map_err(|err| err.fill_request(&url, &config.method))
    }

    async fn send(
        self,
        request: http::Request<TransportBody>,
        url: &str,
    ) -> Result<HttpResponse, FetchError> {
        let response = self
            .transport
            .fetch(request)
            .await
            .map_err(FetchError::network)?;
        Ok(HttpResponse::from_http(url, response))
    }
}

async fn sleep_unless_aborted(
    delay: std::time::Duration,
    external: Option<&AbortSignal>,
) -> Result<(), FetchError> {
    match external {
        Some(signal) => tokio::select! {
            biased;
            reason = signal.aborted() => Err(FetchError::from_abort(&reason)),
            _ = tokio::time::sleep(delay) => Ok(()),
        },
        None => {
            tokio::time::sleep(delay).await;
            Ok(())
        }
    }
}

fn build_request(
    config: &RequestConfig,
    url: &Url,
) -> Result<http::Request<TransportBody>, FetchError> {
    let uri: http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: http::uri::InvalidUri| FetchError::invalid_url(format!("{url}: {e}")))?;

    let mut request = http::Request::new(TransportBody::from_optional(config.body.clone()));
    *request.method_mut() = config.method.clone();
    *request.uri_mut() = uri;
    *request.headers_mut() = config.headers.clone();
    request.extensions_mut().insert(config.options.clone());
    Ok(request)
}

async fn apply_request_chain(
    mut config: RequestConfig,
    pipeline: Pipeline<'_>,
) -> Result<RequestStep, FetchError> {
    for interceptor in pipeline.request_chain() {
        let url = config.url.clone();
        let method = config.method.clone();
        match interceptor.call(config).await {
            Ok(RequestStep::Continue(next)) => config = next,
            Ok(step @ RequestStep::Respond(_)) => return Ok(step),
            Err(cause) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %cause, "request interceptor failed");
                return Err(FetchError::request_interceptor(cause).fill_request(&url, &method));
            }
        }
    }
    Ok(RequestStep::Continue(config))
}

async fn apply_response_chain(
    mut response: HttpResponse,
    pipeline: Pipeline<'_>,
) -> Result<HttpResponse, FetchError> {
    for interceptor in pipeline.response_chain() {
        response = interceptor.call(response).await.map_err(|cause| {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %cause, "response interceptor failed");
            FetchError::response_interceptor(cause)
        })?;
    }
    Ok(response)
}

async fn apply_error_chain(
    mut err: FetchError,
    pipeline: Pipeline<'_>,
) -> Result<HttpResponse, FetchError> {
    for interceptor in pipeline.error_chain() {
        let url = err.url().map(str::to_owned);
        let method = err.method().cloned();
        match interceptor.call(err).await {
            Ok(ErrorStep::Fail(next)) => err = next,
            Ok(ErrorStep::Recover(response)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(status = %response.status(), "error recovered by interceptor");
                return Ok(response);
            }
            Err(cause) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %cause, "error interceptor failed");
                return Err(with_request(FetchError::error_interceptor(cause), url, method));
            }
        }
    }
    Err(err)
}

fn with_request(err: FetchError, url: Option<String>, method: Option<Method>) -> FetchError {
    match method {
        Some(method) => err.fill_request(url.as_deref().unwrap_or_default(), &method),
        None => err,
    }
}
