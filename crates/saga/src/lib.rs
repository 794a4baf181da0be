//! Saga pattern implementation with per-dependency circuit breaking.
//!
//! A [`Saga`] is an ordered list of [`Step`]s sharing a [`SagaContext`].
//! Steps run one at a time; when one fails, the failed step and then every
//! completed step are compensated in exact reverse order. A compensation
//! failure is recorded and the rollback continues.
//!
//! The [`SagaOrchestrator`] runs sagas with each step's `execute` routed
//! through the circuit breaker of the dependency the step talks to, so an
//! unhealthy dependency fails the step fast and triggers the same rollback.
//!
//! Only the error that triggered a rollback is ever returned to the caller.
//! Whether the rollback itself was clean is reported on the
//! [`SagaExecution`] via [`SagaStatus`] and its compensation errors.

pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod execution;
pub mod orchestrator;
pub mod saga;
pub mod state;
pub mod step;

pub use config::OrchestratorConfig;
pub use context::{ContextUpdate, SagaContext};
pub use error::{CompensationError, Result, SagaError, StepError};
pub use events::{EventSink, InMemoryEventLog, NoopEventSink, SagaEvent};
pub use execution::{SagaExecution, StepRecord};
pub use orchestrator::SagaOrchestrator;
pub use saga::Saga;
pub use state::{SagaStatus, StepStatus};
pub use step::{Step, within};

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use common::{DependencyName, SagaId};
