//! Signal combination.
//!
//! [`any`] merges any number of signals into one that fires as soon as the
//! first source fires, forwarding that source's reason. [`combine`] is the
//! shape the request pipeline needs: an optional external signal plus an
//! optional timeout signal, collapsed into at most one effective signal.

use std::sync::Arc;

use futures::future::select_all;
use tokio::sync::oneshot;

use crate::AbortSignal;

/// Create a signal that fires when any of `signals` fires.
///
/// If a source has already fired, the returned signal has already fired
/// with that source's reason (sources are checked in order, before anything
/// is subscribed). Otherwise a forwarding task waits for the first source and
/// copies its reason over. The task ends when a source fires or when the
/// combined signal is dropped.
///
/// An empty input produces a signal that never fires.
///
/// # Panics
///
/// Panics if called outside of a tokio runtime while no source has fired yet.
pub fn any<I>(signals: I) -> AbortSignal
where
    I: IntoIterator<Item = AbortSignal>,
{
    let sources: Vec<AbortSignal> = signals.into_iter().collect();

    for source in &sources {
        if let Some(reason) = source.reason() {
            return AbortSignal::aborted_with(reason);
        }
    }
    if sources.is_empty() {
        return AbortSignal::with_sources(Vec::new(), None);
    }

    let (closed_tx, closed_rx) = oneshot::channel::<()>();
    let combined = AbortSignal::with_sources(sources.clone(), Some(closed_tx));
    let weak = Arc::downgrade(&combined.inner);

    tokio::spawn(async move {
        let waits = sources.iter().map(|source| Box::pin(source.aborted()));
        tokio::select! {
            (reason, _, _) = select_all(waits) => {
                if let Some(inner) = weak.upgrade() {
                    inner.fire(reason);
                }
            }
            _ = closed_rx => {}
        }
    });

    combined
}

/// Collapse an external signal and a timeout signal into one effective signal.
///
/// - neither present: `None`, nothing to observe
/// - exactly one present: that signal, unchanged
/// - both present: [`any`] of the two, external first
pub fn combine(external: Option<AbortSignal>, timeout: Option<AbortSignal>) -> Option<AbortSignal> {
    match (external, timeout) {
        (None, None) => None,
        (Some(signal), None) | (None, Some(signal)) => Some(signal),
        (Some(external), Some(timeout)) => Some(any([external, timeout])),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{AbortController, AbortReason};

    #[test]
    fn test_combine_none() {
        assert!(combine(None, None).is_none());
    }

    #[test]
    fn test_combine_single_passes_through() {
        let controller = AbortController::new();
        let signal = combine(Some(controller.signal()), None).unwrap();

        controller.abort();
        // Same underlying signal, no forwarding involved.
        assert!(signal.is_aborted());
        assert!(Arc::ptr_eq(&signal.inner, &controller.signal().inner));
    }

    #[test]
    fn test_any_with_already_aborted_source_needs_no_runtime() {
        let controller = AbortController::new();
        controller.abort_with("early");
        let never = AbortController::new();

        let combined = any([never.signal(), controller.signal()]);
        assert_eq!(
            combined.reason(),
            Some(AbortReason::Aborted(Some("early".into())))
        );
    }

    #[test]
    fn test_any_empty_never_fires() {
        let combined = any(Vec::new());
        assert!(!combined.is_aborted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_combined_timeout_is_reported_as_timeout() {
        let controller = AbortController::new();
        let timeout = AbortSignal::timeout(Duration::from_millis(50));
        let combined = combine(Some(controller.signal()), Some(timeout)).unwrap();

        let reason = combined.aborted().await;
        assert!(reason.is_timeout());
        assert!(!controller.is_aborted());
    }

    #[tokio::test(start_paused = true)]
    async fn test_combined_external_abort_is_not_timeout() {
        let controller = AbortController::new();
        let timeout = AbortSignal::timeout(Duration::from_secs(10));
        let combined = combine(Some(controller.signal()), Some(timeout)).unwrap();

        let abort_later = controller.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            abort_later.abort();
        });

        assert_eq!(combined.aborted().await, AbortReason::Aborted(None));
    }

    #[tokio::test]
    async fn test_combined_observes_source_synchronously() {
        let controller = AbortController::new();
        let other = AbortController::new();
        let combined = any([controller.signal(), other.signal()]);

        controller.abort();
        // Visible without yielding to the forwarding task.
        assert!(combined.is_aborted());
        assert_eq!(combined.aborted().await, AbortReason::Aborted(None));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_source_to_fire_wins() {
        let slow = AbortSignal::timeout(Duration::from_millis(200));
        let fast = AbortSignal::timeout(Duration::from_millis(30));
        let combined = any([slow, fast]);

        assert_eq!(
            combined.aborted().await,
            AbortReason::Timeout(Duration::from_millis(30))
        );
    }
}
