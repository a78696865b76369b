//! Placement error types.

use domain::{DegradedCause, OrderError};
use order_store::StoreError;
use thiserror::Error;

/// Failure of a single inventory lookup call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    /// Inventory could not be reached (connection refused, reset, gateway
    /// unavailable). Worth retrying.
    #[error("Inventory service unavailable: {0}")]
    RemoteUnavailable(String),

    /// Inventory answered with an error status or a body that could not be
    /// understood. Retrying the same request will not help.
    #[error("Inventory service error: {0}")]
    RemoteError(String),
}

impl LookupError {
    /// Returns true if the failure is transient and the call may be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, LookupError::RemoteUnavailable(_))
    }
}

/// Why a guarded call produced no value.
///
/// Every variant is absorbed by the fallback before it reaches a caller of
/// the placement pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GuardError<E> {
    /// The breaker rejected the call without touching the remote side.
    #[error("Circuit breaker is open")]
    CircuitOpen,

    /// The last attempt ran past its deadline and no retries were left.
    #[error("Timed out after {attempts} attempt(s)")]
    TimedOut { attempts: u32 },

    /// The last attempt failed transiently and no retries were left.
    #[error("Gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: E },

    /// The remote side answered with a definitive error. Never retried.
    #[error("Rejected by remote: {0}")]
    Rejected(E),
}

impl<E> GuardError<E> {
    /// Returns the number of attempts that reached the remote side.
    pub fn attempts(&self) -> u32 {
        match self {
            GuardError::CircuitOpen => 0,
            GuardError::TimedOut { attempts } | GuardError::Exhausted { attempts, .. } => *attempts,
            GuardError::Rejected(_) => 1,
        }
    }

    /// Maps the failure onto the cause reported in a degraded outcome.
    pub fn degraded_cause(&self) -> DegradedCause {
        match self {
            GuardError::CircuitOpen => DegradedCause::CircuitOpen,
            GuardError::TimedOut { .. } => DegradedCause::TimedOut,
            GuardError::Exhausted { .. } => DegradedCause::RetriesExhausted,
            GuardError::Rejected(_) => DegradedCause::RemoteError,
        }
    }
}

/// Errors that stop a placement from producing an outcome.
///
/// Remote failures never appear here; they are absorbed into
/// `PlacementOutcome::Unavailable` by the fallback.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// The request did not describe a valid order.
    #[error("Invalid order: {0}")]
    Order(#[from] OrderError),

    /// The order store failed while committing.
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    /// The placement task panicked or was cancelled before finishing.
    #[error("Placement task aborted: {0}")]
    TaskAborted(String),
}

/// Convenience type alias for placement results.
pub type Result<T> = std::result::Result<T, PlacementError>;
