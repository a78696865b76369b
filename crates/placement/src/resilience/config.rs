//! Resilience policy configuration.

use std::time::Duration;

use thiserror::Error;

/// Rejected resilience settings.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("attempt timeout must be greater than zero")]
    ZeroTimeout,

    #[error("breaker window size must be greater than zero")]
    ZeroWindow,

    #[error("breaker minimum calls must be between 1 and the window size ({window_size}), got {minimum_calls}")]
    InvalidMinimumCalls {
        minimum_calls: usize,
        window_size: usize,
    },

    #[error("breaker failure ratio must be in (0, 1], got {0}")]
    InvalidFailureRatio(f64),

    #[error("breaker half-open calls must be greater than zero")]
    ZeroHalfOpenCalls,
}

/// Deadline applied to every individual attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub per_attempt: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            per_attempt: Duration::from_secs(3),
        }
    }
}

/// How many times a failed attempt is repeated, and how long to wait first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    /// Returns the total number of attempts this policy allows.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

/// Circuit breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Number of most recent outcomes kept while Closed.
    pub window_size: usize,
    /// Outcomes needed in the window before the ratio is evaluated.
    pub minimum_calls: usize,
    /// The breaker opens once failures / outcomes reaches this value.
    pub failure_ratio: f64,
    /// Time spent Open before trial calls are let through.
    pub cooldown: Duration,
    /// Trial calls allowed in Half-Open; all of them must succeed to close.
    pub half_open_calls: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            minimum_calls: 5,
            failure_ratio: 0.5,
            cooldown: Duration::from_secs(5),
            half_open_calls: 3,
        }
    }
}

/// All policies applied around a guarded call.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResilienceConfig {
    pub timeout: TimeoutPolicy,
    pub retry: RetryPolicy,
    pub breaker: CircuitBreakerConfig,
}

impl ResilienceConfig {
    /// Sets the per-attempt deadline.
    pub fn with_timeout(mut self, per_attempt: Duration) -> Self {
        self.timeout.per_attempt = per_attempt;
        self
    }

    /// Sets the retry bound and the pause between attempts.
    pub fn with_retry(mut self, max_retries: u32, backoff: Duration) -> Self {
        self.retry = RetryPolicy {
            max_retries,
            backoff,
        };
        self
    }

    /// Replaces the breaker thresholds.
    pub fn with_breaker(mut self, breaker: CircuitBreakerConfig) -> Self {
        self.breaker = breaker;
        self
    }

    /// Checks that the settings describe a usable policy.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout.per_attempt.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }

        let breaker = &self.breaker;
        if breaker.window_size == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if breaker.minimum_calls == 0 || breaker.minimum_calls > breaker.window_size {
            return Err(ConfigError::InvalidMinimumCalls {
                minimum_calls: breaker.minimum_calls,
                window_size: breaker.window_size,
            });
        }
        if !(breaker.failure_ratio > 0.0 && breaker.failure_ratio <= 1.0) {
            return Err(ConfigError::InvalidFailureRatio(breaker.failure_ratio));
        }
        if breaker.half_open_calls == 0 {
            return Err(ConfigError::ZeroHalfOpenCalls);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ResilienceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.timeout.per_attempt, Duration::from_secs(3));
        assert_eq!(config.retry.max_attempts(), 3);
        assert_eq!(config.breaker.window_size, 5);
    }

    #[test]
    fn test_builders() {
        let config = ResilienceConfig::default()
            .with_timeout(Duration::from_millis(250))
            .with_retry(0, Duration::ZERO);
        assert_eq!(config.timeout.per_attempt, Duration::from_millis(250));
        assert_eq!(config.retry.max_attempts(), 1);
    }

    #[test]
    fn test_rejects_bad_breaker_settings() {
        let bad_ratio = ResilienceConfig::default().with_breaker(CircuitBreakerConfig {
            failure_ratio: 1.5,
            ..Default::default()
        });
        assert_eq!(
            bad_ratio.validate(),
            Err(ConfigError::InvalidFailureRatio(1.5))
        );

        let nan_ratio = ResilienceConfig::default().with_breaker(CircuitBreakerConfig {
            failure_ratio: f64::NAN,
            ..Default::default()
        });
        assert!(nan_ratio.validate().is_err());

        let zero_window = ResilienceConfig::default().with_breaker(CircuitBreakerConfig {
            window_size: 0,
            ..Default::default()
        });
        assert_eq!(zero_window.validate(), Err(ConfigError::ZeroWindow));

        let too_many_minimum = ResilienceConfig::default().with_breaker(CircuitBreakerConfig {
            window_size: 4,
            minimum_calls: 5,
            ..Default::default()
        });
        assert!(matches!(
            too_many_minimum.validate(),
            Err(ConfigError::InvalidMinimumCalls { .. })
        ));

        let no_trials = ResilienceConfig::default().with_breaker(CircuitBreakerConfig {
            half_open_calls: 0,
            ..Default::default()
        });
        assert_eq!(no_trials.validate(), Err(ConfigError::ZeroHalfOpenCalls));
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = ResilienceConfig::default().with_timeout(Duration::ZERO);
        assert_eq!(config.validate(), Err(ConfigError::ZeroTimeout));
    }
}
