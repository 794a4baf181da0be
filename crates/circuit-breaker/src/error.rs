//! Circuit breaker error types.

use common::DependencyName;
use thiserror::Error;

/// Error returned from a call made through a circuit breaker.
///
/// Distinguishes "the dependency is known to be unhealthy and was not called"
/// from "the dependency was called and failed".
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The breaker is open; the operation was never invoked.
    #[error("Circuit breaker for '{dependency}' is open")]
    Open { dependency: DependencyName },

    /// The operation ran and returned this error, unchanged.
    #[error(transparent)]
    Inner(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns true if this is a fail-fast rejection.
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open { .. })
    }

    /// Returns the operation's own error, if it ran.
    pub fn into_inner(self) -> Option<E> {
        match self {
            CircuitBreakerError::Open { .. } => None,
            CircuitBreakerError::Inner(e) => Some(e),
        }
    }
}

/// Invalid circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `failure_threshold` was zero.
    #[error("failure_threshold must be greater than zero")]
    ZeroFailureThreshold,

    /// `success_threshold` was zero.
    #[error("success_threshold must be greater than zero")]
    ZeroSuccessThreshold,

    /// `open_duration` was zero.
    #[error("open_duration must be greater than zero")]
    ZeroOpenDuration,
}
