//! Circuit breaker, retry and timeout around a remote call.
//!
//! Policies compose outer to inner as breaker, then retry, then timeout:
//! every attempt needs a breaker permit, runs under its own deadline, and
//! reports its outcome back to the breaker before the next retry is
//! considered.

pub mod breaker;
pub mod config;
pub mod controller;

pub use breaker::{BreakerSnapshot, CallPermit, CircuitBreaker, CircuitOpen, CircuitState};
pub use config::{CircuitBreakerConfig, ConfigError, ResilienceConfig, RetryPolicy, TimeoutPolicy};
pub use controller::ResilienceController;

use crate::error::LookupError;

/// Tells the controller whether a failed attempt is worth repeating.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for LookupError {
    fn is_transient(&self) -> bool {
        LookupError::is_transient(self)
    }
}
