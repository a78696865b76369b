//! Guarded execution of a remote call.

use std::future::Future;

use super::breaker::{CallPermit, CircuitBreaker, CircuitState};
use super::config::{ResilienceConfig, RetryPolicy, TimeoutPolicy};
use super::Transient;
use crate::error::GuardError;

/// Returns an unused permit to the breaker if the attempt is dropped
/// mid-flight, e.g. when the caller's task is aborted.
struct PermitGuard<'a> {
    breaker: &'a CircuitBreaker,
    permit: Option<CallPermit>,
}

impl<'a> PermitGuard<'a> {
    fn new(breaker: &'a CircuitBreaker, permit: CallPermit) -> Self {
        Self {
            breaker,
            permit: Some(permit),
        }
    }

    fn record(mut self, success: bool) {
        if let Some(permit) = self.permit.take() {
            self.breaker.record(permit, success);
        }
    }
}

impl Drop for PermitGuard<'_> {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            self.breaker.release(permit);
        }
    }
}

enum AttemptFailure<E> {
    TimedOut,
    Failed(E),
}

/// Wraps calls to one remote dependency with a circuit breaker, bounded
/// retry and a per-attempt timeout.
///
/// A single controller is meant to be shared by all concurrent callers of
/// the dependency so they see the same breaker state.
#[derive(Debug)]
pub struct ResilienceController {
    breaker: CircuitBreaker,
    timeout: TimeoutPolicy,
    retry: RetryPolicy,
}

impl ResilienceController {
    /// Creates a controller with a closed breaker.
    pub fn new(config: ResilienceConfig) -> Self {
        Self {
            breaker: CircuitBreaker::new(config.breaker),
            timeout: config.timeout,
            retry: config.retry,
        }
    }

    /// Returns the shared breaker.
    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Returns the current breaker state.
    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }

    /// Runs `op` under the configured policies.
    ///
    /// `op` is invoked once per attempt. Timeouts and transient errors are
    /// retried up to the retry bound; a definitive error is returned at once.
    /// If the breaker refuses a permit, before the first attempt or between
    /// retries, the call ends with [`GuardError::CircuitOpen`].
    pub async fn call<T, E, F, Fut>(&self, mut op: F) -> Result<T, GuardError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + std::fmt::Display,
    {
        let max_attempts = self.retry.max_attempts();
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let permit = match self.breaker.try_acquire() {
                Ok(permit) => permit,
                Err(open) => {
                    if attempt > 1 {
                        tracing::warn!(attempt, state = %open.state, "breaker opened between retries");
                    }
                    return Err(GuardError::CircuitOpen);
                }
            };
            let guard = PermitGuard::new(&self.breaker, permit);

            let started = tokio::time::Instant::now();
            let result = tokio::time::timeout(self.timeout.per_attempt, op()).await;
            metrics::histogram!("inventory_lookup_duration_seconds")
                .record(started.elapsed().as_secs_f64());

            let failure = match result {
                Ok(Ok(value)) => {
                    guard.record(true);
                    metrics::counter!("inventory_lookup_attempts_total", "result" => "success")
                        .increment(1);
                    return Ok(value);
                }
                Ok(Err(error)) if !error.is_transient() => {
                    guard.record(false);
                    metrics::counter!("inventory_lookup_attempts_total", "result" => "rejected")
                        .increment(1);
                    tracing::warn!(attempt, %error, "definitive failure, not retrying");
                    return Err(GuardError::Rejected(error));
                }
                Ok(Err(error)) => {
                    guard.record(false);
                    metrics::counter!("inventory_lookup_attempts_total", "result" => "error")
                        .increment(1);
                    tracing::warn!(attempt, max_attempts, %error, "attempt failed");
                    AttemptFailure::Failed(error)
                }
                Err(_elapsed) => {
                    guard.record(false);
                    metrics::counter!("inventory_lookup_attempts_total", "result" => "timeout")
                        .increment(1);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        timeout_ms = self.timeout.per_attempt.as_millis() as u64,
                        "attempt timed out"
                    );
                    AttemptFailure::TimedOut
                }
            };

            if attempt >= max_attempts {
                return Err(match failure {
                    AttemptFailure::TimedOut => GuardError::TimedOut { attempts: attempt },
                    AttemptFailure::Failed(last) => GuardError::Exhausted {
                        attempts: attempt,
                        last,
                    },
                });
            }

            if !self.retry.backoff.is_zero() {
                tokio::time::sleep(self.retry.backoff).await;
            }
        }
    }

    /// Runs `op` like [`call`](Self::call), handing any guard failure to
    /// `fallback` instead of returning it.
    pub async fn call_with_fallback<T, E, F, Fut, FB>(&self, op: F, fallback: FB) -> T
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient + std::fmt::Display,
        FB: FnOnce(&GuardError<E>) -> T,
    {
        match self.call(op).await {
            Ok(value) => value,
            Err(error) => {
                tracing::warn!(%error, attempts = error.attempts(), "falling back");
                fallback(&error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::error::LookupError;
    use crate::resilience::CircuitBreakerConfig;

    fn controller(max_retries: u32) -> ResilienceController {
        ResilienceController::new(
            ResilienceConfig::default()
                .with_timeout(Duration::from_secs(3))
                .with_retry(max_retries, Duration::from_millis(100))
                .with_breaker(CircuitBreakerConfig {
                    window_size: 10,
                    minimum_calls: 10,
                    ..Default::default()
                }),
        )
    }

    fn unavailable() -> LookupError {
        LookupError::RemoteUnavailable("connection refused".into())
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt() {
        let controller = controller(2);
        let calls = AtomicU32::new(0);

        let result: Result<u32, GuardError<LookupError>> = controller
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.breaker().snapshot().recorded_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_always_timing_out_makes_retries_plus_one_attempts() {
        let controller = controller(2);
        let calls = AtomicU32::new(0);

        let result: Result<(), GuardError<LookupError>> = controller
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(())
            })
            .await;

        assert_eq!(result.unwrap_err(), GuardError::TimedOut { attempts: 3 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(controller.breaker().snapshot().failed_calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_then_success() {
        let controller = controller(2);
        let calls = AtomicU32::new(0);

        let result = controller
            .call(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(unavailable())
                } else {
                    Ok("ok")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_keeps_last_error() {
        let controller = controller(1);

        let result: Result<(), _> = controller.call(|| async { Err(unavailable()) }).await;

        assert_eq!(
            result.unwrap_err(),
            GuardError::Exhausted {
                attempts: 2,
                last: unavailable()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_definitive_error_is_not_retried() {
        let controller = controller(2);
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = controller
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LookupError::RemoteError("400 Bad Request".into()))
            })
            .await;

        assert!(matches!(result, Err(GuardError::Rejected(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(controller.breaker().snapshot().failed_calls, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_breaker_skips_the_call() {
        let controller = ResilienceController::new(
            ResilienceConfig::default()
                .with_retry(0, Duration::ZERO)
                .with_breaker(CircuitBreakerConfig {
                    window_size: 2,
                    minimum_calls: 2,
                    ..Default::default()
                }),
        );
        let calls = AtomicU32::new(0);
        let failing = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(unavailable())
        };

        controller.call(failing).await.unwrap_err();
        controller.call(failing).await.unwrap_err();
        assert_eq!(controller.state(), CircuitState::Open);

        let result = controller.call(failing).await;
        assert_eq!(result.unwrap_err(), GuardError::CircuitOpen);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_breaker_opening_stops_retries() {
        let controller = ResilienceController::new(
            ResilienceConfig::default()
                .with_retry(5, Duration::from_millis(10))
                .with_breaker(CircuitBreakerConfig {
                    window_size: 3,
                    minimum_calls: 3,
                    ..Default::default()
                }),
        );
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = controller
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            })
            .await;

        assert_eq!(result.unwrap_err(), GuardError::CircuitOpen);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fallback_replaces_error() {
        let controller = controller(0);

        let value = controller
            .call_with_fallback(
                || async { Err::<&str, _>(unavailable()) },
                |error| match error {
                    GuardError::Exhausted { .. } => "degraded",
                    _ => "other",
                },
            )
            .await;

        assert_eq!(value, "degraded");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_attempt_frees_half_open_slot() {
        let controller = std::sync::Arc::new(ResilienceController::new(
            ResilienceConfig::default()
                .with_retry(0, Duration::ZERO)
                .with_breaker(CircuitBreakerConfig {
                    window_size: 1,
                    minimum_calls: 1,
                    half_open_calls: 1,
                    ..Default::default()
                }),
        ));
        let _ = controller
            .call(|| async { Err::<(), _>(unavailable()) })
            .await;
        tokio::time::advance(Duration::from_secs(5)).await;

        let stuck = {
            let controller = controller.clone();
            tokio::spawn(async move {
                controller
                    .call(|| async {
                        tokio::time::sleep(Duration::from_secs(1)).await;
                        Ok::<_, LookupError>(())
                    })
                    .await
            })
        };
        tokio::task::yield_now().await;
        assert_eq!(controller.state(), CircuitState::HalfOpen);

        stuck.abort();
        let _ = stuck.await;

        let result = controller.call(|| async { Ok::<_, LookupError>(1) }).await;
        assert_eq!(result.unwrap(), 1);
        assert_eq!(controller.state(), CircuitState::Closed);
    }
}
