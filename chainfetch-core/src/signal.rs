//! Abort controllers and signals.
//!
//! An [`AbortSignal`] is a cloneable, one-shot cancellation flag. It starts
//! pending and fires at most once, carrying an [`AbortReason`]. Every clone
//! observes the same state.
//!
//! Signals are created by:
//! - [`AbortController::new`]: fired explicitly via [`AbortController::abort`]
//! - [`AbortSignal::timeout`]: fired by a timer
//! - [`AbortSignal::aborted_with`]: already fired at creation
//! - [`any`](crate::any): fired by whichever source fires first

use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{oneshot, watch};

use crate::AbortReason;

pub(crate) struct Inner {
    /// `None` while pending, `Some(reason)` once fired.
    state: watch::Sender<Option<AbortReason>>,
    /// Sources of a combined signal, checked synchronously on read.
    sources: Vec<AbortSignal>,
    /// Dropped together with the signal; lets forwarding tasks stop early.
    _closed: Option<oneshot::Sender<()>>,
}

impl Inner {
    /// Fire with `reason` unless already fired. Returns whether this call fired it.
    pub(crate) fn fire(&self, reason: AbortReason) -> bool {
        self.state.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(reason);
                true
            } else {
                false
            }
        })
    }
}

/// A cancellation signal observed by an in-flight operation.
///
/// # Example
///
/// ```
/// use chainfetch_core::{AbortController, AbortReason};
///
/// let controller = AbortController::new();
/// let signal = controller.signal();
/// assert!(!signal.is_aborted());
///
/// controller.abort_with("shutting down");
/// assert_eq!(
///     signal.reason(),
///     Some(AbortReason::Aborted(Some("shutting down".into())))
/// );
/// ```
#[derive(Clone)]
pub struct AbortSignal {
    pub(crate) inner: Arc<Inner>,
}

impl AbortSignal {
    fn pending() -> Self {
        Self::with_sources(Vec::new(), None)
    }

    pub(crate) fn with_sources(
        sources: Vec<AbortSignal>,
        closed: Option<oneshot::Sender<()>>,
    ) -> Self {
        let (state, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                state,
                sources,
                _closed: closed,
            }),
        }
    }

    /// Create a signal that has already fired with `reason`.
    pub fn aborted_with(reason: AbortReason) -> Self {
        let signal = Self::pending();
        signal.inner.fire(reason);
        signal
    }

    /// Create a signal that fires with [`AbortReason::Timeout`] once `duration` elapses.
    ///
    /// The timer runs on the current tokio runtime and ends as soon as every
    /// clone of the signal has been dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn timeout(duration: Duration) -> Self {
        let (closed_tx, closed_rx) = oneshot::channel::<()>();
        let signal = Self::with_sources(Vec::new(), Some(closed_tx));
        let weak: Weak<Inner> = Arc::downgrade(&signal.inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.fire(AbortReason::Timeout(duration));
                        #[cfg(feature = "tracing")]
                        tracing::trace!(timeout_ms = duration.as_millis() as u64, "timeout signal fired");
                    }
                }
                _ = closed_rx => {}
            }
        });
        signal
    }

    /// The reason this signal fired, or `None` while it is still pending.
    ///
    /// For combined signals the sources are checked synchronously, so a
    /// source that already fired is visible here without waiting for the
    /// forwarding task to run.
    pub fn reason(&self) -> Option<AbortReason> {
        if let Some(reason) = self.inner.state.borrow().clone() {
            return Some(reason);
        }
        for source in &self.inner.sources {
            if let Some(reason) = source.reason() {
                self.inner.fire(reason);
                return self.inner.state.borrow().clone();
            }
        }
        None
    }

    /// Returns `true` once the signal has fired.
    pub fn is_aborted(&self) -> bool {
        self.reason().is_some()
    }

    /// Wait until the signal fires and return its reason.
    ///
    /// Resolves immediately if the signal has already fired. A signal that
    /// can never fire (no controller, no timer, no sources) never resolves.
    pub async fn aborted(&self) -> AbortReason {
        if let Some(reason) = self.reason() {
            return reason;
        }
        let mut rx = self.inner.state.subscribe();
        let reason = rx.wait_for(Option::is_some).await.ok().and_then(|r| r.clone());
        match reason {
            Some(reason) => reason,
            None => std::future::pending().await,
        }
    }
}

impl fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AbortSignal")
            .field("reason", &self.reason())
            .field("sources", &self.inner.sources.len())
            .finish()
    }
}

/// Owner side of an [`AbortSignal`].
///
/// Cloning a controller shares the same signal.
#[derive(Clone, Debug)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    /// Create a controller with a fresh, pending signal.
    pub fn new() -> Self {
        Self {
            signal: AbortSignal::pending(),
        }
    }

    /// The signal controlled by this controller.
    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    /// Abort without a reason. Has no effect if already aborted.
    pub fn abort(&self) {
        self.signal.inner.fire(AbortReason::Aborted(None));
    }

    /// Abort with a caller-supplied reason. Has no effect if already aborted.
    pub fn abort_with(&self, reason: impl Into<String>) {
        self.signal
            .inner
            .fire(AbortReason::Aborted(Some(reason.into())));
    }

    /// Returns `true` once [`abort`](Self::abort) has been called.
    pub fn is_aborted(&self) -> bool {
        self.signal.is_aborted()
    }
}

impl Default for AbortController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_controller_abort_is_one_shot() {
        let controller = AbortController::new();
        let signal = controller.signal();

        controller.abort_with("first");
        controller.abort_with("second");

        assert!(controller.is_aborted());
        assert_eq!(signal.reason(), Some(AbortReason::Aborted(Some("first".into()))));
    }

    #[test]
    fn test_aborted_with_is_already_fired() {
        let signal = AbortSignal::aborted_with(AbortReason::Aborted(None));
        assert!(signal.is_aborted());
    }

    #[tokio::test]
    async fn test_aborted_resolves_after_abort() {
        let controller = AbortController::new();
        let signal = controller.signal();

        let waiter = tokio::spawn(async move { signal.aborted().await });
        tokio::task::yield_now().await;
        controller.abort();

        assert_eq!(waiter.await.unwrap(), AbortReason::Aborted(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_signal_fires_after_duration() {
        let signal = AbortSignal::timeout(Duration::from_millis(50));
        assert!(!signal.is_aborted());

        tokio::time::sleep(Duration::from_millis(49)).await;
        assert!(!signal.is_aborted());

        let reason = signal.aborted().await;
        assert_eq!(reason, AbortReason::Timeout(Duration::from_millis(50)));
        assert!(reason.is_timeout());
    }

    #[tokio::test]
    async fn test_timeout_task_ends_when_signal_dropped() {
        let metrics = tokio::runtime::Handle::current().metrics();

        let signal = AbortSignal::timeout(Duration::from_secs(3600));
        let clone = signal.clone();
        tokio::task::yield_now().await;
        assert_eq!(metrics.num_alive_tasks(), 1);

        drop(signal);
        tokio::task::yield_now().await;
        assert_eq!(metrics.num_alive_tasks(), 1);

        drop(clone);
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        assert_eq!(metrics.num_alive_tasks(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_signal_never_resolves() {
        let controller = AbortController::new();
        let signal = controller.signal();

        let result =
            tokio::time::timeout(Duration::from_secs(1), signal.aborted()).await;
        assert!(result.is_err());
    }
}
