//! Retry policy and backoff between attempts.
//!
//! # Overview
//!
//! The retry system consists of:
//! - [`RetryPolicy`]: how many additional attempts are allowed and how long to
//!   wait between them
//! - [`ExponentialBackoff`]: yields the delays, with optional jitter
//! - [`AttemptOutcome`]: what the pipeline does with the result of one attempt
//!
//! A retry budget of `N` allows at most `N + 1` attempts in total.
//!
//! # Retryable Failures
//!
//! Only transient failures are retried:
//! - [`ErrorKind::Timeout`](crate::ErrorKind::Timeout) - the attempt was too slow
//! - [`ErrorKind::Network`](crate::ErrorKind::Network) - the transport failed
//!
//! External aborts, interceptor failures, invalid URLs and HTTP status
//! failures are terminal.
//!
//! # Backoff
//!
//! The default base delay is zero: attempts follow each other immediately.
//! A non-zero delay is slept between attempts and is interrupted by the
//! caller's abort controller.

use std::time::Duration;

use crate::{FetchError, HttpResponse};

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    /// Default delay before the first retry. Zero means no waiting.
    pub const BASE_DELAY: Duration = Duration::ZERO;

    /// Default multiplier for exponential backoff.
    pub const MULTIPLIER: f64 = 2.0;

    /// Default jitter factor (0.0 means no jitter).
    pub const JITTER: f64 = 0.0;

    /// Default maximum delay between retries.
    pub const MAX_DELAY: Duration = Duration::from_secs(30);

    /// Default maximum number of retries.
    pub const MAX_RETRIES: u32 = 0;
}

/// Configuration for retry behavior.
///
/// # Example
///
/// ```
/// use chainfetch::RetryPolicy;
/// use std::time::Duration;
///
/// // Three retries, no waiting in between
/// let policy = RetryPolicy::retries(3);
///
/// // Two retries with exponential backoff
/// let policy = RetryPolicy::new()
///     .max_retries(2)
///     .base_delay(Duration::from_millis(100))
///     .max_delay(Duration::from_secs(2));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Initial delay before the first retry.
    pub base_delay: Duration,

    /// Multiplier for exponential backoff. Should be >= 1.0.
    pub multiplier: f64,

    /// Jitter factor for randomizing delays. Value between 0.0 and 1.0.
    pub jitter: f64,

    /// Maximum delay between retries.
    pub max_delay: Duration,

    /// Maximum number of retries (not counting the initial attempt).
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: defaults::BASE_DELAY,
            multiplier: defaults::MULTIPLIER,
            jitter: defaults::JITTER,
            max_delay: defaults::MAX_DELAY,
            max_retries: defaults::MAX_RETRIES,
        }
    }
}

impl RetryPolicy {
    /// Create a new RetryPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a retry policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Create a policy allowing `max_retries` immediate retries.
    pub fn retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set the maximum number of retries.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the initial delay before the first retry.
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Set the maximum delay between retries.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff multiplier.
    ///
    /// # Panics
    ///
    /// Panics if `multiplier` is less than 1.0.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        assert!(multiplier >= 1.0, "multiplier must be >= 1.0");
        self.multiplier = multiplier;
        self
    }

    /// Set the jitter factor.
    ///
    /// # Panics
    ///
    /// Panics if `jitter` is not between 0.0 and 1.0.
    pub fn jitter(mut self, jitter: f64) -> Self {
        assert!(
            (0.0..=1.0).contains(&jitter),
            "jitter must be between 0.0 and 1.0"
        );
        self.jitter = jitter;
        self
    }

    /// Validate the policy configuration.
    pub fn validate(&self) -> Result<(), FetchError> {
        if self.base_delay > self.max_delay {
            return Err(FetchError::invalid_config(
                "base_delay must not exceed max_delay",
            ));
        }
        if self.multiplier < 1.0 {
            return Err(FetchError::invalid_config("multiplier must be >= 1.0"));
        }
        if !(0.0..=1.0).contains(&self.jitter) {
            return Err(FetchError::invalid_config(
                "jitter must be between 0.0 and 1.0",
            ));
        }
        Ok(())
    }

    /// Create an ExponentialBackoff iterator from this policy.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::new(self.clone())
    }

    /// Decide whether another attempt is warranted after `error`, given that
    /// `retries_used` retries have already been made.
    pub fn should_retry(&self, retries_used: u32, error: &FetchError) -> bool {
        error.is_retryable() && retries_used < self.max_retries
    }

    /// Classify the result of one attempt.
    pub fn classify(
        &self,
        retries_used: u32,
        result: Result<HttpResponse, FetchError>,
    ) -> AttemptOutcome {
        match result {
            Ok(response) => AttemptOutcome::Success(response),
            Err(error) if self.should_retry(retries_used, &error) => {
                AttemptOutcome::RetryableFailure(error)
            }
            Err(error) => AttemptOutcome::TerminalFailure(error),
        }
    }
}

/// The result of a single network attempt, as seen by the retry loop.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// The transport returned a response.
    Success(HttpResponse),
    /// The attempt failed and budget remains; the pipeline tries again.
    RetryableFailure(FetchError),
    /// The attempt failed and no further attempt will be made.
    TerminalFailure(FetchError),
}

/// Exponential backoff iterator with jitter.
///
/// Yields increasing sleep durations: `base * multiplier^n`, clamped to
/// `max_delay`, with +/- `jitter` randomization.
#[derive(Clone, Debug)]
pub struct ExponentialBackoff {
    policy: RetryPolicy,
    /// Current delay without jitter, stored as f64 to avoid rounding errors.
    current_delay_secs: f64,
    /// Number of delays handed out.
    attempts: u32,
}

impl ExponentialBackoff {
    /// Create a new ExponentialBackoff from a RetryPolicy.
    pub fn new(policy: RetryPolicy) -> Self {
        let current_delay_secs = policy.base_delay.as_secs_f64();
        Self {
            policy,
            current_delay_secs,
            attempts: 0,
        }
    }

    /// Get the number of delays handed out so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Get the next delay duration, applying jitter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current_delay_secs;

        // delay * (1 + jitter * random(-1, 1))
        let jittered = if self.policy.jitter > 0.0 {
            let jitter_range = self.policy.jitter * 2.0;
            let random_factor = rand::random::<f64>() * jitter_range - self.policy.jitter;
            delay * (1.0 + random_factor)
        } else {
            delay
        };

        let clamped = jittered.min(self.policy.max_delay.as_secs_f64());

        self.current_delay_secs = (self.current_delay_secs * self.policy.multiplier)
            .min(self.policy.max_delay.as_secs_f64());
        self.attempts += 1;

        Duration::from_secs_f64(clamped.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;

    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_retry_policy_default() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.base_delay, Duration::ZERO);
        assert!((policy.multiplier - 2.0).abs() < f64::EPSILON);
        assert_eq!(policy.jitter, 0.0);
        assert_eq!(policy.max_delay, Duration::from_secs(30));
        assert_eq!(policy.max_retries, 0);
    }

    #[test]
    fn test_retry_policy_builder() {
        let policy = RetryPolicy::new()
            .max_retries(5)
            .base_delay(Duration::from_millis(100))
            .max_delay(Duration::from_secs(10))
            .multiplier(3.0)
            .jitter(0.1);

        assert_eq!(policy.max_retries, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(100));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
        assert!((policy.multiplier - 3.0).abs() < f64::EPSILON);
        assert!((policy.jitter - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_retry_policy_validate() {
        assert!(RetryPolicy::default().validate().is_ok());

        let invalid = RetryPolicy {
            base_delay: Duration::from_secs(10),
            max_delay: Duration::from_secs(1),
            ..Default::default()
        };
        assert_eq!(invalid.validate().unwrap_err().kind(), ErrorKind::InvalidConfig);
    }

    #[test]
    #[should_panic(expected = "multiplier must be >= 1.0")]
    fn test_retry_policy_invalid_multiplier() {
        RetryPolicy::new().multiplier(0.5);
    }

    #[test]
    fn test_should_retry_respects_budget() {
        let policy = RetryPolicy::retries(2);
        let network = FetchError::new(ErrorKind::Network, "reset");

        assert!(policy.should_retry(0, &network));
        assert!(policy.should_retry(1, &network));
        assert!(!policy.should_retry(2, &network));
    }

    #[test]
    fn test_should_retry_only_transient_failures() {
        let policy = RetryPolicy::retries(3);

        assert!(policy.should_retry(0, &FetchError::new(ErrorKind::Timeout, "slow")));
        assert!(!policy.should_retry(0, &FetchError::new(ErrorKind::Aborted, "stop")));
        assert!(!policy.should_retry(
            0,
            &FetchError::new(ErrorKind::RequestInterceptor, "bug")
        ));
        assert!(!policy.should_retry(0, &FetchError::new(ErrorKind::InvalidUrl, "bad")));
    }

    #[test]
    fn test_classify_outcomes() {
        let policy = RetryPolicy::retries(1);

        let ok = policy.classify(0, Ok(HttpResponse::new(StatusCode::OK, "")));
        assert!(matches!(ok, AttemptOutcome::Success(_)));

        let retry = policy.classify(0, Err(FetchError::new(ErrorKind::Timeout, "slow")));
        assert!(matches!(retry, AttemptOutcome::RetryableFailure(_)));

        let exhausted = policy.classify(1, Err(FetchError::new(ErrorKind::Timeout, "slow")));
        match exhausted {
            AttemptOutcome::TerminalFailure(err) => assert!(err.is_timeout()),
            other => panic!("expected terminal failure, got {other:?}"),
        }
    }

    #[test]
    fn test_exponential_backoff_no_jitter() {
        let policy = RetryPolicy::new()
            .base_delay(Duration::from_secs(1))
            .multiplier(2.0)
            .max_delay(Duration::from_secs(100))
            .max_retries(3);

        let mut backoff = policy.backoff();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        assert_eq!(backoff.attempts(), 3);
    }

    #[test]
    fn test_exponential_backoff_max_delay_clamping() {
        let policy = RetryPolicy::new()
            .base_delay(Duration::from_secs(10))
            .multiplier(10.0)
            .max_delay(Duration::from_secs(15));

        let mut backoff = policy.backoff();
        assert_eq!(backoff.next_delay(), Duration::from_secs(10));
        assert_eq!(backoff.next_delay(), Duration::from_secs(15));
        assert_eq!(backoff.next_delay(), Duration::from_secs(15));
    }

    #[test]
    fn test_exponential_backoff_with_jitter() {
        let policy = RetryPolicy::new()
            .base_delay(Duration::from_secs(1))
            .max_delay(Duration::from_secs(100))
            .jitter(0.2);

        let delay = policy.backoff().next_delay();
        assert!(delay >= Duration::from_millis(800));
        assert!(delay <= Duration::from_millis(1200));
    }

    #[test]
    fn test_default_backoff_is_immediate() {
        let mut backoff = RetryPolicy::retries(3).backoff();
        assert_eq!(backoff.next_delay(), Duration::ZERO);
        assert_eq!(backoff.next_delay(), Duration::ZERO);
    }
}
