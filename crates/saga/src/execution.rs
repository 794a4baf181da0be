//! The record of one saga run.

use common::SagaId;
use serde::Serialize;

use crate::context::SagaContext;
use crate::error::{CompensationError, SagaError};
use crate::state::{SagaStatus, StepStatus};

/// Name and status of one step within an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
}

/// Outcome of a single saga run.
///
/// The triggering error (if any) is available through [`error`](Self::error)
/// and [`into_result`](Self::into_result); compensation failures are only
/// reported here, through [`compensation_errors`](Self::compensation_errors)
/// and a [`SagaStatus::CompensationFailed`] status.
#[derive(Debug)]
pub struct SagaExecution {
    saga_id: SagaId,
    saga_name: String,
    status: SagaStatus,
    steps: Vec<StepRecord>,
    executed_steps: Vec<String>,
    compensation_order: Vec<String>,
    compensation_errors: Vec<CompensationError>,
    error: Option<SagaError>,
    context: SagaContext,
}

impl SagaExecution {
    pub(crate) fn start(
        saga_id: SagaId,
        saga_name: impl Into<String>,
        step_names: impl IntoIterator<Item = String>,
        context: SagaContext,
    ) -> Self {
        Self {
            saga_id,
            saga_name: saga_name.into(),
            status: SagaStatus::Running,
            steps: step_names
                .into_iter()
                .map(|name| StepRecord {
                    name,
                    status: StepStatus::Pending,
                })
                .collect(),
            executed_steps: Vec::new(),
            compensation_order: Vec::new(),
            compensation_errors: Vec::new(),
            error: None,
            context,
        }
    }

    pub(crate) fn set_step_status(&mut self, index: usize, status: StepStatus) {
        if let Some(record) = self.steps.get_mut(index) {
            record.status = status;
        }
    }

    pub(crate) fn record_completed(&mut self, index: usize) {
        self.set_step_status(index, StepStatus::Completed);
        if let Some(record) = self.steps.get(index) {
            self.executed_steps.push(record.name.clone());
        }
    }

    pub(crate) fn record_compensation_attempt(&mut self, step: &str) {
        self.compensation_order.push(step.to_string());
    }

    pub(crate) fn record_compensation_error(&mut self, error: CompensationError) {
        self.compensation_errors.push(error);
    }

    pub(crate) fn context_mut(&mut self) -> &mut SagaContext {
        &mut self.context
    }

    pub(crate) fn complete(&mut self) {
        self.status = SagaStatus::Completed;
    }

    /// Settles the status after a rollback and stores the triggering error.
    pub(crate) fn fail(&mut self, error: SagaError) {
        self.status = if self.compensation_errors.is_empty() {
            SagaStatus::Compensated
        } else {
            SagaStatus::CompensationFailed
        };
        self.error = Some(error);
    }

    /// Returns the execution ID.
    pub fn saga_id(&self) -> SagaId {
        self.saga_id
    }

    /// Returns the saga name.
    pub fn saga_name(&self) -> &str {
        &self.saga_name
    }

    /// Returns the overall status.
    pub fn status(&self) -> SagaStatus {
        self.status
    }

    /// Returns every step of the saga with its final status, in execution order.
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Returns the status of the named step.
    pub fn step_status(&self, name: &str) -> Option<StepStatus> {
        self.steps
            .iter()
            .find(|record| record.name == name)
            .map(|record| record.status)
    }

    /// Returns the names of the steps that completed, in execution order.
    pub fn executed_steps(&self) -> &[String] {
        &self.executed_steps
    }

    /// Returns the names of the steps whose compensation was attempted, in
    /// the order it was attempted.
    pub fn compensation_order(&self) -> &[String] {
        &self.compensation_order
    }

    /// Returns the compensation failures collected during rollback.
    pub fn compensation_errors(&self) -> &[CompensationError] {
        &self.compensation_errors
    }

    /// Returns the error that made the saga fail, if it failed.
    pub fn error(&self) -> Option<&SagaError> {
        self.error.as_ref()
    }

    /// Returns the context as it stood when the run finished.
    pub fn context(&self) -> &SagaContext {
        &self.context
    }

    /// Returns true if every step completed.
    pub fn is_success(&self) -> bool {
        self.status == SagaStatus::Completed
    }

    /// Returns the final context, or the error that triggered the rollback.
    pub fn into_result(self) -> Result<SagaContext, SagaError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.context),
        }
    }
}
