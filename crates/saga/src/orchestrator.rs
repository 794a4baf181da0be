//! Saga orchestrator: sagas plus per-dependency circuit breakers.

use std::sync::Arc;

use async_trait::async_trait;
use circuit_breaker::{BreakerRegistry, CircuitBreaker, CircuitBreakerError};
use common::DependencyName;

use crate::config::OrchestratorConfig;
use crate::context::{ContextUpdate, SagaContext};
use crate::error::SagaError;
use crate::events::{EventSink, NoopEventSink};
use crate::execution::SagaExecution;
use crate::saga::{DirectGate, Saga, StepGate};
use crate::step::Step;

/// Routes each step through the breaker of the dependency it names.
struct BreakerGate<'a> {
    breakers: &'a BreakerRegistry,
}

#[async_trait]
impl StepGate for BreakerGate<'_> {
    async fn execute(
        &self,
        step: &dyn Step,
        context: &SagaContext,
    ) -> Result<ContextUpdate, SagaError> {
        let Some(dependency) = step.dependency() else {
            return DirectGate.execute(step, context).await;
        };
        let Some(breaker) = self.breakers.get(dependency) else {
            // Checked before the run starts.
            return Err(SagaError::UnknownDependency {
                step: step.name().to_string(),
                dependency: DependencyName::from(dependency),
            });
        };

        breaker
            .call(|| step.execute(context))
            .await
            .map_err(|e| match e {
                CircuitBreakerError::Open { dependency } => SagaError::CircuitOpen {
                    step: step.name().to_string(),
                    dependency,
                },
                CircuitBreakerError::Inner(source) => SagaError::StepExecution {
                    step: step.name().to_string(),
                    source,
                },
            })
    }
}

/// Runs sagas with every step's `execute` guarded by the circuit breaker of
/// the dependency it talks to.
///
/// A call rejected by an open breaker fails the step exactly like an
/// `execute` error would and triggers the same compensation cascade.
/// Compensations are not routed through breakers: a rollback is always
/// attempted. The orchestrator never retries; a step that wants retries
/// performs them inside its own `execute`.
///
/// One orchestrator is meant to be shared by all concurrent saga executions
/// of a process so that they share breaker state.
pub struct SagaOrchestrator {
    breakers: BreakerRegistry,
    events: Arc<dyn EventSink>,
}

impl SagaOrchestrator {
    /// Creates an orchestrator with one breaker per configured dependency.
    pub fn new(config: OrchestratorConfig) -> Result<Self, SagaError> {
        let mut breakers = BreakerRegistry::new();
        for (dependency, breaker_config) in config.dependencies {
            breakers
                .register(dependency.clone(), breaker_config)
                .map_err(|source| SagaError::Config { dependency, source })?;
        }
        Ok(Self::with_registry(breakers))
    }

    /// Creates an orchestrator around an existing breaker registry.
    pub fn with_registry(breakers: BreakerRegistry) -> Self {
        Self {
            breakers,
            events: Arc::new(NoopEventSink),
        }
    }

    /// Sends lifecycle events of every run to `sink`.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Returns the breaker guarding `dependency`.
    pub fn breaker(&self, dependency: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(dependency)
    }

    /// Returns the breaker registry.
    pub fn breakers(&self) -> &BreakerRegistry {
        &self.breakers
    }

    /// Runs `saga` and returns the full record of the run.
    ///
    /// `Err` means nothing ran: the saga was invalid or one of its steps
    /// names a dependency without a breaker.
    pub async fn execute(
        &self,
        saga: &Saga,
        context: SagaContext,
    ) -> Result<SagaExecution, SagaError> {
        saga.validate()?;
        self.check_dependencies(saga)?;

        let gate = BreakerGate {
            breakers: &self.breakers,
        };
        Ok(saga
            .execute_with(context, &gate, self.events.as_ref())
            .await)
    }

    /// Runs `saga` and returns the final context or the triggering error.
    pub async fn run(&self, saga: &Saga, context: SagaContext) -> Result<SagaContext, SagaError> {
        self.execute(saga, context).await?.into_result()
    }

    fn check_dependencies(&self, saga: &Saga) -> Result<(), SagaError> {
        for step in saga.steps() {
            if let Some(dependency) = step.dependency()
                && !self.breakers.contains(dependency)
            {
                return Err(SagaError::UnknownDependency {
                    step: step.name().to_string(),
                    dependency: DependencyName::from(dependency),
                });
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SagaOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SagaOrchestrator")
            .field("breakers", &self.breakers)
            .finish_non_exhaustive()
    }
}
