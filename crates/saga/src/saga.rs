//! Saga definition and the execute/compensate algorithm.

use std::collections::HashSet;

use async_trait::async_trait;
use common::SagaId;

use crate::context::{ContextUpdate, SagaContext};
use crate::error::{CompensationError, SagaError};
use crate::events::{EventSink, NoopEventSink, SagaEvent};
use crate::execution::SagaExecution;
use crate::state::StepStatus;
use crate::step::Step;

/// Decides how a step's `execute` is invoked.
///
/// A plain saga calls the step directly; the orchestrator routes the call
/// through the dependency's circuit breaker.
#[async_trait]
pub(crate) trait StepGate: Send + Sync {
    async fn execute(&self, step: &dyn Step, context: &SagaContext)
    -> Result<ContextUpdate, SagaError>;
}

/// Calls every step directly.
pub(crate) struct DirectGate;

#[async_trait]
impl StepGate for DirectGate {
    async fn execute(
        &self,
        step: &dyn Step,
        context: &SagaContext,
    ) -> Result<ContextUpdate, SagaError> {
        step.execute(context)
            .await
            .map_err(|source| SagaError::StepExecution {
                step: step.name().to_string(),
                source,
            })
    }
}

/// An ordered list of steps executed one after another, with automatic
/// reverse-order compensation when one of them fails.
///
/// ```text
/// execute:     1 ──► 2 ──► … ──► k ✗
/// compensate:  1 ◄── 2 ◄── … ◄── k
/// ```
///
/// A `Saga` holds no per-run state, so the same definition can be run any
/// number of times, including concurrently.
pub struct Saga {
    name: String,
    steps: Vec<Box<dyn Step>>,
}

impl Saga {
    /// Creates an empty saga.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step. Steps run in the order they are added.
    pub fn add_step(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Appends an already boxed step.
    pub fn add_boxed_step(mut self, step: Box<dyn Step>) -> Self {
        self.steps.push(step);
        self
    }

    /// Returns the saga name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the step names in execution order.
    pub fn step_names(&self) -> Vec<String> {
        self.steps.iter().map(|s| s.name().to_string()).collect()
    }

    pub(crate) fn steps(&self) -> impl Iterator<Item = &dyn Step> {
        self.steps.iter().map(|s| &**s)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Checks that the saga has steps and that their names are unique.
    pub fn validate(&self) -> Result<(), SagaError> {
        if self.steps.is_empty() {
            return Err(SagaError::EmptySaga(self.name.clone()));
        }

        let mut seen = HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.name()) {
                return Err(SagaError::DuplicateStep {
                    saga: self.name.clone(),
                    step: step.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Runs the saga without circuit breakers and returns the full record.
    ///
    /// `Err` means the saga was invalid and nothing ran; a failed run is an
    /// `Ok` execution whose [`error`](SagaExecution::error) is set.
    pub async fn execute(&self, context: SagaContext) -> Result<SagaExecution, SagaError> {
        self.validate()?;
        Ok(self
            .execute_with(context, &DirectGate, &NoopEventSink)
            .await)
    }

    /// Runs the saga and returns the final context or the triggering error.
    ///
    /// Compensation failures are not visible here; use
    /// [`execute`](Self::execute) to inspect them.
    pub async fn run(&self, context: SagaContext) -> Result<SagaContext, SagaError> {
        self.execute(context).await?.into_result()
    }

    #[tracing::instrument(
        name = "saga",
        skip_all,
        fields(saga = %self.name, saga_id = tracing::field::Empty)
    )]
    pub(crate) async fn execute_with(
        &self,
        context: SagaContext,
        gate: &dyn StepGate,
        events: &dyn EventSink,
    ) -> SagaExecution {
        let saga_id = SagaId::new();
        tracing::Span::current().record("saga_id", tracing::field::display(saga_id));
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = std::time::Instant::now();

        let mut execution = SagaExecution::start(saga_id, &self.name, self.step_names(), context);
        events
            .record(
                saga_id,
                SagaEvent::saga_started(saga_id, &self.name, self.step_names()),
            )
            .await;

        for (index, step) in self.steps.iter().enumerate() {
            let step = &**step;
            tracing::info!(step = step.name(), "saga step started");
            execution.set_step_status(index, StepStatus::Executing);
            events
                .record(saga_id, SagaEvent::step_started(step.name()))
                .await;

            match gate.execute(step, execution.context()).await {
                Ok(update) => {
                    let keys: Vec<String> = update.keys().map(str::to_string).collect();
                    execution.context_mut().merge(update);
                    execution.record_completed(index);
                    events
                        .record(saga_id, SagaEvent::step_completed(step.name(), keys))
                        .await;
                    tracing::info!(step = step.name(), "saga step completed");
                }
                Err(error) => {
                    execution.set_step_status(index, StepStatus::Failed);
                    metrics::counter!("saga_step_failures_total", "step" => step.name().to_string())
                        .increment(1);
                    tracing::warn!(step = step.name(), %error, "saga step failed");
                    events
                        .record(
                            saga_id,
                            SagaEvent::step_failed(
                                step.name(),
                                error.to_string(),
                                error.is_circuit_open(),
                            ),
                        )
                        .await;

                    self.compensate(index, &mut execution, events).await;

                    let failures = execution.compensation_errors().len();
                    events
                        .record(
                            saga_id,
                            SagaEvent::saga_compensated(error.to_string(), failures),
                        )
                        .await;
                    execution.fail(error);

                    metrics::histogram!("saga_duration_seconds")
                        .record(saga_start.elapsed().as_secs_f64());
                    if failures == 0 {
                        metrics::counter!("saga_compensated").increment(1);
                        tracing::warn!(%saga_id, "saga failed and was compensated");
                    } else {
                        metrics::counter!("saga_compensation_failed").increment(1);
                        tracing::error!(
                            %saga_id,
                            compensation_failures = failures,
                            "saga failed and could not be fully compensated"
                        );
                    }
                    return execution;
                }
            }
        }

        execution.complete();
        events.record(saga_id, SagaEvent::saga_completed()).await;

        let duration = saga_start.elapsed().as_secs_f64();
        metrics::histogram!("saga_duration_seconds").record(duration);
        metrics::counter!("saga_completed").increment(1);
        tracing::info!(%saga_id, duration, "saga completed successfully");

        execution
    }

    /// Compensates the failed step and then every earlier step, newest first.
    ///
    /// A failing compensation is recorded and the rollback carries on.
    async fn compensate(
        &self,
        failed_index: usize,
        execution: &mut SagaExecution,
        events: &dyn EventSink,
    ) {
        let saga_id = execution.saga_id();
        let failed_step = self.steps[failed_index].name();
        events
            .record(saga_id, SagaEvent::compensation_started(failed_step))
            .await;

        for index in (0..=failed_index).rev() {
            let step = &*self.steps[index];
            execution.record_compensation_attempt(step.name());

            match step.compensate(execution.context()).await {
                Ok(()) => {
                    execution.set_step_status(index, StepStatus::Compensated);
                    events
                        .record(saga_id, SagaEvent::compensation_step_completed(step.name()))
                        .await;
                    tracing::info!(step = step.name(), "compensation step completed");
                }
                Err(source) => {
                    metrics::counter!(
                        "saga_compensation_failures_total",
                        "step" => step.name().to_string()
                    )
                    .increment(1);
                    tracing::error!(step = step.name(), error = %source, "compensation step failed");
                    events
                        .record(
                            saga_id,
                            SagaEvent::compensation_step_failed(step.name(), source.to_string()),
                        )
                        .await;
                    execution.record_compensation_error(CompensationError {
                        step: step.name().to_string(),
                        source,
                    });
                }
            }
        }
    }
}

impl std::fmt::Debug for Saga {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Saga")
            .field("name", &self.name)
            .field("steps", &self.step_names())
            .finish()
    }
}
