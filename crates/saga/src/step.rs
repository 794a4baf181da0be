//! The unit of work a saga is built from.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::context::{ContextUpdate, SagaContext};
use crate::error::StepError;

/// A named unit of remote work with its inverse.
///
/// Implementations hold their collaborators explicitly (usually an
/// `Arc<dyn SomeService>` passed to a constructor) rather than capturing
/// them, and carry no per-run state: everything a compensation needs must
/// travel through the [`SagaContext`].
#[async_trait]
pub trait Step: Send + Sync {
    /// Name of the step, unique within its saga.
    fn name(&self) -> &str;

    /// The remote dependency this step calls, if any.
    ///
    /// When run through a [`SagaOrchestrator`](crate::SagaOrchestrator) the
    /// `execute` call is routed through that dependency's circuit breaker.
    fn dependency(&self) -> Option<&str> {
        None
    }

    /// Performs the step and returns the values to merge into the context.
    async fn execute(&self, context: &SagaContext) -> Result<ContextUpdate, StepError>;

    /// Undoes `execute`, using only what is already in the context.
    ///
    /// Called on the failed step as well as on completed ones, so it must
    /// check for the keys it needs and do nothing if they are missing.
    async fn compensate(&self, context: &SagaContext) -> Result<(), StepError>;
}

/// Runs `operation` under a deadline, mapping expiry to [`StepError::TimedOut`].
///
/// The saga core imposes no timeouts of its own; steps that talk to slow
/// collaborators use this to honour one.
pub async fn within<T, F>(deadline: Duration, operation: F) -> Result<T, StepError>
where
    F: Future<Output = Result<T, StepError>>,
{
    tokio::time::timeout(deadline, operation)
        .await
        .map_err(|_| StepError::TimedOut(deadline))?
}
