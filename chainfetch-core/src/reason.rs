//! Abort reasons.

use std::fmt;
use std::time::Duration;

/// Why an [`AbortSignal`](crate::AbortSignal) fired.
///
/// Timer-driven signals report [`AbortReason::Timeout`]; everything aborted
/// through an [`AbortController`](crate::AbortController) reports
/// [`AbortReason::Aborted`]. Combined signals forward the reason of whichever
/// source fired first, so the distinction survives combination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbortReason {
    /// The timer of a [`AbortSignal::timeout`](crate::AbortSignal::timeout) signal elapsed.
    Timeout(Duration),
    /// Explicit cancellation, with an optional caller-supplied reason.
    Aborted(Option<String>),
}

impl AbortReason {
    /// Returns `true` if the signal fired because its timer elapsed.
    pub fn is_timeout(&self) -> bool {
        matches!(self, AbortReason::Timeout(_))
    }

    /// The caller-supplied reason of an explicit abort, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            AbortReason::Aborted(detail) => detail.as_deref(),
            AbortReason::Timeout(_) => None,
        }
    }
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Timeout(after) => {
                write!(f, "signal timed out after {}ms", after.as_millis())
            }
            AbortReason::Aborted(Some(detail)) => write!(f, "aborted: {detail}"),
            AbortReason::Aborted(None) => f.write_str("the operation was aborted"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_reason() {
        let reason = AbortReason::Timeout(Duration::from_millis(50));
        assert!(reason.is_timeout());
        assert_eq!(reason.detail(), None);
        assert_eq!(reason.to_string(), "signal timed out after 50ms");
    }

    #[test]
    fn test_aborted_reason() {
        let plain = AbortReason::Aborted(None);
        assert!(!plain.is_timeout());
        assert_eq!(plain.to_string(), "the operation was aborted");

        let detailed = AbortReason::Aborted(Some("user navigated away".into()));
        assert_eq!(detailed.detail(), Some("user navigated away"));
        assert_eq!(detailed.to_string(), "aborted: user navigated away");
    }
}
