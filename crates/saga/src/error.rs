//! Saga error types.

use std::time::Duration;

use circuit_breaker::ConfigError;
use common::DependencyName;
use thiserror::Error;

/// Error returned by a step's `execute` or `compensate`.
#[derive(Debug, Error)]
pub enum StepError {
    /// The remote collaborator rejected or failed the operation.
    #[error("{0}")]
    Failed(String),

    /// Failure wrapping a lower-level error (transport, client library, ...).
    #[error("{message}")]
    Remote {
        message: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The operation gave up because its caller-supplied deadline passed.
    #[error("operation timed out after {0:?}")]
    TimedOut(Duration),

    /// The operation was cancelled from outside.
    #[error("operation cancelled: {0}")]
    Cancelled(String),
}

impl StepError {
    /// Creates a plain failure.
    pub fn failed(message: impl Into<String>) -> Self {
        StepError::Failed(message.into())
    }

    /// Creates a failure that keeps `source` as its cause.
    pub fn remote(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        StepError::Remote {
            message: message.into(),
            source: Box::new(source),
        }
    }
}

/// A failed compensation. Collected on the execution, never returned from `run`.
#[derive(Debug, Error)]
#[error("Compensation step '{step}' failed: {source}")]
pub struct CompensationError {
    /// The step whose compensation failed.
    pub step: String,
    /// What `compensate` returned.
    #[source]
    pub source: StepError,
}

/// Errors that can occur during saga operations.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A step's `execute` returned an error.
    #[error("Saga step '{step}' failed: {source}")]
    StepExecution {
        step: String,
        #[source]
        source: StepError,
    },

    /// The step's dependency is known to be unhealthy; `execute` was not called.
    #[error("Saga step '{step}' rejected: circuit breaker for '{dependency}' is open")]
    CircuitOpen {
        step: String,
        dependency: DependencyName,
    },

    /// A step names a dependency the orchestrator has no breaker for.
    #[error("Saga step '{step}' uses unregistered dependency '{dependency}'")]
    UnknownDependency {
        step: String,
        dependency: DependencyName,
    },

    /// The saga has no steps.
    #[error("Saga '{0}' has no steps")]
    EmptySaga(String),

    /// Two steps share a name.
    #[error("Saga '{saga}' has more than one step named '{step}'")]
    DuplicateStep { saga: String, step: String },

    /// A circuit breaker configuration was rejected.
    #[error("Invalid circuit breaker configuration for '{dependency}': {source}")]
    Config {
        dependency: DependencyName,
        #[source]
        source: ConfigError,
    },
}

impl SagaError {
    /// Returns true if the dependency was not even called.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, SagaError::CircuitOpen { .. })
    }

    /// Returns the step this error is attributed to, if any.
    pub fn step(&self) -> Option<&str> {
        match self {
            SagaError::StepExecution { step, .. }
            | SagaError::CircuitOpen { step, .. }
            | SagaError::UnknownDependency { step, .. }
            | SagaError::DuplicateStep { step, .. } => Some(step),
            SagaError::EmptySaga(_) | SagaError::Config { .. } => None,
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
