//! Count-based circuit breaker shared by every caller of one dependency.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;

use super::config::CircuitBreakerConfig;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls pass through and outcomes are recorded.
    Closed,
    /// Calls are rejected without reaching the dependency.
    Open,
    /// A limited number of trial calls decide whether to close again.
    HalfOpen,
}

impl CircuitState {
    /// Returns the state as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned by [`CircuitBreaker::try_acquire`] when no call may go through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("circuit breaker is {state}")]
pub struct CircuitOpen {
    pub state: CircuitState,
}

/// Permission to make one call.
///
/// Hand it back through [`CircuitBreaker::record`] or
/// [`CircuitBreaker::release`]. A permit issued before a state transition is
/// stale afterwards; its outcome no longer affects the breaker.
#[derive(Debug)]
#[must_use = "a permit must be recorded or released"]
pub struct CallPermit {
    epoch: u64,
    state: CircuitState,
}

impl CallPermit {
    /// Returns the state the permit was issued in.
    pub fn state(&self) -> CircuitState {
        self.state
    }
}

/// Point-in-time view of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    /// Outcomes currently held in the Closed window.
    pub recorded_calls: usize,
    /// Failures among them.
    pub failed_calls: usize,
    /// `failed_calls / recorded_calls`, zero when the window is empty.
    pub failure_ratio: f64,
}

#[derive(Debug)]
struct BreakerCore {
    state: CircuitState,
    epoch: u64,
    /// `true` marks a failure.
    window: VecDeque<bool>,
    failures: usize,
    opened_at: Option<Instant>,
    trials_issued: usize,
    trials_succeeded: usize,
}

impl BreakerCore {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            epoch: 0,
            window: VecDeque::new(),
            failures: 0,
            opened_at: None,
            trials_issued: 0,
            trials_succeeded: 0,
        }
    }

    fn failure_ratio(&self) -> f64 {
        if self.window.is_empty() {
            0.0
        } else {
            self.failures as f64 / self.window.len() as f64
        }
    }

    fn push(&mut self, failed: bool, window_size: usize) {
        self.window.push_back(failed);
        if failed {
            self.failures += 1;
        }
        while self.window.len() > window_size {
            if self.window.pop_front() == Some(true) {
                self.failures -= 1;
            }
        }
    }

    fn transition(&mut self, to: CircuitState, now: Instant) {
        let from = self.state;
        let ratio = self.failure_ratio();

        self.state = to;
        self.epoch += 1;
        self.window.clear();
        self.failures = 0;
        self.trials_issued = 0;
        self.trials_succeeded = 0;
        self.opened_at = (to == CircuitState::Open).then_some(now);

        metrics::counter!("circuit_breaker_transitions_total", "to" => to.as_str()).increment(1);
        match to {
            CircuitState::Open => {
                tracing::warn!(%from, %to, failure_ratio = ratio, "circuit breaker opened")
            }
            _ => tracing::info!(%from, %to, "circuit breaker state changed"),
        }
    }

    fn permit(&self) -> CallPermit {
        CallPermit {
            epoch: self.epoch,
            state: self.state,
        }
    }
}

/// Circuit breaker guarding a single remote dependency.
///
/// All state sits behind one mutex. Every method is a short synchronous
/// critical section, so the lock is never held while a call is in flight.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    core: Mutex<BreakerCore>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            core: Mutex::new(BreakerCore::new()),
        }
    }

    /// Returns the breaker's thresholds.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Asks permission for one call.
    ///
    /// An Open breaker whose cooldown has elapsed moves to Half-Open here and
    /// hands out the first trial permit.
    pub fn try_acquire(&self) -> Result<CallPermit, CircuitOpen> {
        let mut core = self.lock();
        let now = Instant::now();

        if core.state == CircuitState::Open {
            let cooled_down = core
                .opened_at
                .is_none_or(|opened_at| now.duration_since(opened_at) >= self.config.cooldown);
            if cooled_down {
                core.transition(CircuitState::HalfOpen, now);
            }
        }

        match core.state {
            CircuitState::Closed => Ok(core.permit()),
            CircuitState::HalfOpen if core.trials_issued < self.config.half_open_calls => {
                core.trials_issued += 1;
                Ok(core.permit())
            }
            state => {
                metrics::counter!("circuit_breaker_rejections_total").increment(1);
                tracing::debug!(%state, "call rejected by circuit breaker");
                Err(CircuitOpen { state })
            }
        }
    }

    /// Records the outcome of a permitted call.
    pub fn record(&self, permit: CallPermit, success: bool) {
        let mut core = self.lock();

        if permit.epoch != core.epoch {
            tracing::debug!(
                issued_in = %permit.state,
                state = %core.state,
                success,
                "ignoring outcome from an earlier breaker state"
            );
            return;
        }

        let now = Instant::now();
        match core.state {
            CircuitState::Closed => {
                core.push(!success, self.config.window_size);
                if core.window.len() >= self.config.minimum_calls
                    && core.failure_ratio() >= self.config.failure_ratio
                {
                    core.transition(CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => {
                if !success {
                    core.transition(CircuitState::Open, now);
                } else {
                    core.trials_succeeded += 1;
                    if core.trials_succeeded >= self.config.half_open_calls {
                        core.transition(CircuitState::Closed, now);
                    }
                }
            }
            // Permits are never issued while Open, and every transition bumps
            // the epoch, so a current permit cannot land here.
            CircuitState::Open => {}
        }
    }

    /// Returns a permit whose call never produced an outcome.
    ///
    /// A Half-Open trial slot is freed for the next caller; nothing is
    /// recorded.
    pub fn release(&self, permit: CallPermit) {
        let mut core = self.lock();
        if permit.epoch == core.epoch && core.state == CircuitState::HalfOpen {
            core.trials_issued = core.trials_issued.saturating_sub(1);
        }
    }

    /// Returns the current state.
    ///
    /// An Open breaker past its cooldown still reports Open until the next
    /// call asks for a permit.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Returns a consistent view of state and window.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let core = self.lock();
        BreakerSnapshot {
            state: core.state,
            recorded_calls: core.window.len(),
            failed_calls: core.failures,
            failure_ratio: core.failure_ratio(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerCore> {
        self.core.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
