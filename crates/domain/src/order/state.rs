//! Order lifecycle state.

use serde::{Deserialize, Serialize};

/// The state of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Proposed ──► Committed
///     │
///     └──► (discarded)
/// ```
///
/// Only committed orders are durable. A proposed order that fails validation
/// is dropped and never observed outside the placement pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderState {
    /// Order has been built from a request but not yet validated against inventory.
    #[default]
    Proposed,

    /// Order passed validation and was persisted (terminal state).
    Committed,
}

impl OrderState {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderState::Committed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Proposed => "Proposed",
            OrderState::Committed => "Committed",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
