//! Retry policy implementation.
//!
//! The policy decides, one classified failure at a time, whether a logical
//! operation gets another transport attempt and how long to wait first.
//! Only [`InvoiceError::Server`] is retried. Once the budget is spent the
//! last server error is replaced by [`InvoiceError::retries_exhausted`].

use std::time::Duration;

use crate::errors::{InvoiceError, InvoiceResult};

/// Default number of retries after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(2);

/// Default upper bound for a single backoff delay.
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(60);

/// Default exponential multiplier.
pub const DEFAULT_MULTIPLIER: f64 = 2.0;

/// Largest fraction of the computed delay that jitter may add.
pub const JITTER_FACTOR: f64 = 0.25;

/// Retry configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Delay multiplier for exponential backoff.
    pub multiplier: f64,
    /// Whether to add jitter.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of retries.
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Sets the initial delay.
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the multiplier.
    pub fn multiplier(mut self, mult: f64) -> Self {
        self.multiplier = mult;
        self
    }

    /// Sets whether to use jitter.
    pub fn jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Total number of transport attempts one logical operation may make.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Checks the configuration against the retry contract.
    ///
    /// At most [`DEFAULT_MAX_RETRIES`] retries are allowed, the first retry
    /// waits at least [`DEFAULT_INITIAL_DELAY`], and the computed delays can
    /// never decrease.
    pub fn validate(&self) -> InvoiceResult<()> {
        if self.max_retries > DEFAULT_MAX_RETRIES {
            return Err(InvoiceError::configuration(format!(
                "Retry budget must not exceed {} retries, got {}",
                DEFAULT_MAX_RETRIES, self.max_retries
            )));
        }

        if self.initial_delay < DEFAULT_INITIAL_DELAY {
            return Err(InvoiceError::configuration(format!(
                "Retry initial delay must be at least {:?}, got {:?}",
                DEFAULT_INITIAL_DELAY, self.initial_delay
            )));
        }

        if self.max_delay < self.initial_delay {
            return Err(InvoiceError::configuration(
                "Retry max delay must not be below the initial delay",
            ));
        }

        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(InvoiceError::configuration(format!(
                "Retry multiplier must be at least 1.0, got {}",
                self.multiplier
            )));
        }

        if self.jitter && self.multiplier < 1.0 + JITTER_FACTOR {
            return Err(InvoiceError::configuration(format!(
                "Retry multiplier must be at least {} when jitter is enabled",
                1.0 + JITTER_FACTOR
            )));
        }

        Ok(())
    }
}

/// Per-invocation retry bookkeeping.
///
/// Created by [`RetryPolicy::start`] for every logical operation and dropped
/// when that operation resolves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryState {
    attempts: u32,
    retries: u32,
    last_delay: Option<Duration>,
}

impl RetryState {
    /// Marks the start of a transport attempt.
    pub fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    /// Transport attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Retries granted so far.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Delay granted for the most recent retry.
    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }
}

/// Outcome of consulting the policy after a failed attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait `delay`, then make another attempt.
    Retry {
        /// Backoff before the next attempt.
        delay: Duration,
    },
    /// Give up and surface this error.
    Stop(InvoiceError),
}

/// Retry policy with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Creates a retry policy with default configuration.
    pub fn default_policy() -> Self {
        Self::new(RetryConfig::default())
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Starts the bookkeeping for a new logical operation.
    pub fn start(&self) -> RetryState {
        RetryState::default()
    }

    /// Decides what happens after `error`.
    ///
    /// Non-retryable errors are returned unchanged. A server error is retried
    /// while budget remains and converted into an unavailable error once it
    /// does not.
    pub fn next(&self, state: &mut RetryState, error: InvoiceError) -> RetryDecision {
        if !error.is_retryable() {
            return RetryDecision::Stop(error);
        }

        if state.retries >= self.config.max_retries {
            return RetryDecision::Stop(InvoiceError::retries_exhausted());
        }

        state.retries += 1;
        let delay = self.calculate_delay(state.retries);
        let delay = state.last_delay.map_or(delay, |last| delay.max(last));
        state.last_delay = Some(delay);

        RetryDecision::Retry { delay }
    }

    /// Calculates the delay before retry number `retry` (starting at 1).
    pub fn calculate_delay(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let base = self.config.initial_delay.as_secs_f64();
        let mut secs = base * self.config.multiplier.powi(exponent);

        // Add jitter if enabled (0-25% random variation)
        if self.config.jitter {
            secs *= 1.0 + rand::random::<f64>() * JITTER_FACTOR;
        }

        let max_secs = self.config.max_delay.as_secs_f64();
        let secs = if secs.is_finite() { secs.min(max_secs) } else { max_secs };

        Duration::try_from_secs_f64(secs).unwrap_or(self.config.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn server_error() -> InvoiceError {
        InvoiceError::server("Server error", 503)
    }

    #[test]
    fn test_default_delays_double_from_two_seconds() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.calculate_delay(1), Duration::from_secs(2));
        assert_eq!(policy.calculate_delay(2), Duration::from_secs(4));
        assert_eq!(policy.calculate_delay(3), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_respects_max() {
        let config = RetryConfig::new()
            .initial_delay(Duration::from_millis(100))
            .multiplier(10.0)
            .max_delay(Duration::from_millis(500));

        let policy = RetryPolicy::new(config);

        assert_eq!(policy.calculate_delay(4).as_millis(), 500);
        assert_eq!(policy.calculate_delay(u32::MAX), Duration::from_millis(500));
    }

    #[test]
    fn test_jittered_delays_never_decrease() {
        let policy = RetryPolicy::new(RetryConfig::new().jitter(true).max_retries(6));

        for _ in 0..50 {
            let mut state = policy.start();
            let mut previous = Duration::ZERO;
            while let RetryDecision::Retry { delay } = policy.next(&mut state, server_error()) {
                assert!(delay >= previous);
                assert!(delay >= DEFAULT_INITIAL_DELAY);
                previous = delay;
            }
        }
    }

    #[test]
    fn test_server_error_retried_three_times_then_unavailable() {
        let policy = RetryPolicy::default();
        let mut state = policy.start();

        let delays: Vec<_> = (0..3)
            .map(|_| match policy.next(&mut state, server_error()) {
                RetryDecision::Retry { delay } => delay,
                RetryDecision::Stop(err) => panic!("stopped early: {err}"),
            })
            .collect();

        assert_eq!(
            delays,
            vec![Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(8)]
        );
        assert_eq!(
            policy.next(&mut state, server_error()),
            RetryDecision::Stop(InvoiceError::retries_exhausted())
        );
        assert_eq!(state.retries(), 3);
    }

    #[test]
    fn test_client_error_stops_immediately_unchanged() {
        let policy = RetryPolicy::default();
        let mut state = policy.start();
        let error = InvoiceError::client("Client error", 404);

        assert_eq!(policy.next(&mut state, error.clone()), RetryDecision::Stop(error));
        assert_eq!(state.retries(), 0);
        assert_eq!(state.last_delay(), None);
    }

    #[test]
    fn test_client_error_after_server_errors_is_not_converted() {
        let policy = RetryPolicy::default();
        let mut state = policy.start();
        let _ = policy.next(&mut state, server_error());

        let error = InvoiceError::client("Client error", 400);
        assert_eq!(policy.next(&mut state, error.clone()), RetryDecision::Stop(error));
    }

    #[test]
    fn test_zero_retries_exhausts_on_first_server_error() {
        let policy = RetryPolicy::new(RetryConfig::new().max_retries(0));
        let mut state = policy.start();

        assert_eq!(
            policy.next(&mut state, server_error()),
            RetryDecision::Stop(InvoiceError::retries_exhausted())
        );
    }

    #[test]
    fn test_validate_rejects_decreasing_configurations() {
        assert!(RetryConfig::default().validate().is_ok());
        assert!(RetryConfig::new().multiplier(0.5).validate().is_err());
        assert!(RetryConfig::new().multiplier(f64::NAN).validate().is_err());
        assert!(RetryConfig::new()
            .max_delay(Duration::from_secs(1))
            .validate()
            .is_err());
        assert!(RetryConfig::new().multiplier(1.1).jitter(true).validate().is_err());
        assert!(RetryConfig::new().multiplier(1.1).validate().is_ok());
    }

    #[test]
    fn test_validate_enforces_budget_and_first_delay_floor() {
        assert!(RetryConfig::new().max_retries(0).validate().is_ok());
        assert!(RetryConfig::new().max_retries(3).validate().is_ok());
        assert!(RetryConfig::new().max_retries(4).validate().is_err());
        assert!(RetryConfig::new().initial_delay(Duration::ZERO).validate().is_err());
        assert!(RetryConfig::new()
            .initial_delay(Duration::from_millis(1999))
            .validate()
            .is_err());
        assert!(RetryConfig::new()
            .initial_delay(Duration::from_secs(3))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_max_attempts() {
        assert_eq!(RetryConfig::default().max_attempts(), 4);
        assert_eq!(RetryConfig::new().max_retries(u32::MAX).max_attempts(), u32::MAX);
    }
}
