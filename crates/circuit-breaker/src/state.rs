//! Circuit breaker state machine states.

use serde::{Deserialize, Serialize};

/// The state of a circuit breaker.
///
/// There is no terminal state: a breaker cycles for as long as the process
/// lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CircuitState {
    /// Calls flow through; consecutive failures are counted.
    #[default]
    Closed,

    /// Calls are rejected without invoking the operation.
    Open,

    /// Trial calls are let through to probe whether the dependency recovered.
    HalfOpen,
}

impl CircuitState {
    /// Returns true if a call made in this state reaches the dependency.
    ///
    /// An `Open` breaker may still let a call through once its open period
    /// has elapsed; that decision needs the clock and lives on the breaker.
    pub fn permits_calls(&self) -> bool {
        matches!(self, CircuitState::Closed | CircuitState::HalfOpen)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "Closed",
            CircuitState::Open => "Open",
            CircuitState::HalfOpen => "HalfOpen",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_is_closed() {
        assert_eq!(CircuitState::default(), CircuitState::Closed);
    }

    #[test]
    fn test_permits_calls() {
        assert!(CircuitState::Closed.permits_calls());
        assert!(!CircuitState::Open.permits_calls());
        assert!(CircuitState::HalfOpen.permits_calls());
    }

    #[test]
    fn test_display() {
        assert_eq!(CircuitState::Closed.to_string(), "Closed");
        assert_eq!(CircuitState::Open.to_string(), "Open");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HalfOpen");
    }
}
