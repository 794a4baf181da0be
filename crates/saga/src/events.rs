//! Saga lifecycle events and the sinks that receive them.
//!
//! Events are a side channel: a sink can persist them, forward them, or
//! drop them, but it can never change the outcome of a saga.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::SagaId;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Events that can occur during saga execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaEvent {
    /// Saga execution started.
    SagaStarted(SagaStartedData),

    /// A saga step started execution.
    StepStarted(StepData),

    /// A saga step completed successfully.
    StepCompleted(StepCompletedData),

    /// A saga step failed, or was rejected by its circuit breaker.
    StepFailed(StepFailedData),

    /// Compensation started after a step failure.
    CompensationStarted(CompensationData),

    /// A compensation step completed successfully.
    CompensationStepCompleted(StepData),

    /// A compensation step failed (logged, compensation continues).
    CompensationStepFailed(StepFailedData),

    /// Saga completed successfully.
    SagaCompleted(SagaCompletedData),

    /// Saga failed and its rollback finished.
    SagaCompensated(SagaCompensatedData),
}

impl SagaEvent {
    /// Returns the event type name.
    pub fn event_type(&self) -> &'static str {
        match self {
            SagaEvent::SagaStarted(_) => "SagaStarted",
            SagaEvent::StepStarted(_) => "StepStarted",
            SagaEvent::StepCompleted(_) => "StepCompleted",
            SagaEvent::StepFailed(_) => "StepFailed",
            SagaEvent::CompensationStarted(_) => "CompensationStarted",
            SagaEvent::CompensationStepCompleted(_) => "CompensationStepCompleted",
            SagaEvent::CompensationStepFailed(_) => "CompensationStepFailed",
            SagaEvent::SagaCompleted(_) => "SagaCompleted",
            SagaEvent::SagaCompensated(_) => "SagaCompensated",
        }
    }
}

/// Data for SagaStarted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaStartedData {
    /// The saga execution ID.
    pub saga_id: SagaId,
    /// The saga name (e.g., "order_fulfillment").
    pub saga_name: String,
    /// Step names in execution order.
    pub steps: Vec<String>,
    /// When the saga started.
    pub started_at: DateTime<Utc>,
}

/// Data for events that only carry a step name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepData {
    /// The step name.
    pub step_name: String,
}

/// Data for StepCompleted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCompletedData {
    /// The step name.
    pub step_name: String,
    /// Context keys written by the step.
    pub context_keys: Vec<String>,
}

/// Data for StepFailed and CompensationStepFailed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailedData {
    /// The step that failed.
    pub step_name: String,
    /// Error message describing the failure.
    pub error: String,
    /// True if the circuit breaker rejected the call without invoking it.
    #[serde(default)]
    pub circuit_open: bool,
}

/// Data for CompensationStarted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationData {
    /// The step that triggered compensation.
    pub from_step: String,
}

/// Data for SagaCompleted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaCompletedData {
    /// When the saga completed.
    pub completed_at: DateTime<Utc>,
}

/// Data for SagaCompensated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaCompensatedData {
    /// The error that triggered the rollback.
    pub reason: String,
    /// Number of compensations that failed; non-zero needs operator attention.
    pub compensation_failures: usize,
    /// When the rollback finished.
    pub compensated_at: DateTime<Utc>,
}

// Convenience constructors
impl SagaEvent {
    /// Creates a SagaStarted event.
    pub fn saga_started(saga_id: SagaId, saga_name: impl Into<String>, steps: Vec<String>) -> Self {
        SagaEvent::SagaStarted(SagaStartedData {
            saga_id,
            saga_name: saga_name.into(),
            steps,
            started_at: Utc::now(),
        })
    }

    /// Creates a StepStarted event.
    pub fn step_started(step_name: impl Into<String>) -> Self {
        SagaEvent::StepStarted(StepData {
            step_name: step_name.into(),
        })
    }

    /// Creates a StepCompleted event.
    pub fn step_completed(step_name: impl Into<String>, context_keys: Vec<String>) -> Self {
        SagaEvent::StepCompleted(StepCompletedData {
            step_name: step_name.into(),
            context_keys,
        })
    }

    /// Creates a StepFailed event.
    pub fn step_failed(
        step_name: impl Into<String>,
        error: impl Into<String>,
        circuit_open: bool,
    ) -> Self {
        SagaEvent::StepFailed(StepFailedData {
            step_name: step_name.into(),
            error: error.into(),
            circuit_open,
        })
    }

    /// Creates a CompensationStarted event.
    pub fn compensation_started(from_step: impl Into<String>) -> Self {
        SagaEvent::CompensationStarted(CompensationData {
            from_step: from_step.into(),
        })
    }

    /// Creates a CompensationStepCompleted event.
    pub fn compensation_step_completed(step_name: impl Into<String>) -> Self {
        SagaEvent::CompensationStepCompleted(StepData {
            step_name: step_name.into(),
        })
    }

    /// Creates a CompensationStepFailed event.
    pub fn compensation_step_failed(
        step_name: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        SagaEvent::CompensationStepFailed(StepFailedData {
            step_name: step_name.into(),
            error: error.into(),
            circuit_open: false,
        })
    }

    /// Creates a SagaCompleted event.
    pub fn saga_completed() -> Self {
        SagaEvent::SagaCompleted(SagaCompletedData {
            completed_at: Utc::now(),
        })
    }

    /// Creates a SagaCompensated event.
    pub fn saga_compensated(reason: impl Into<String>, compensation_failures: usize) -> Self {
        SagaEvent::SagaCompensated(SagaCompensatedData {
            reason: reason.into(),
            compensation_failures,
            compensated_at: Utc::now(),
        })
    }
}

/// Receives lifecycle events from running sagas.
///
/// Recording is infallible from the saga's point of view; a sink that can
/// fail reports the failure itself.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Records one event of the saga execution `saga_id`.
    async fn record(&self, saga_id: SagaId, event: SagaEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventSink;

#[async_trait]
impl EventSink for NoopEventSink {
    async fn record(&self, _saga_id: SagaId, _event: SagaEvent) {}
}

/// In-memory event log, mostly for tests and diagnostics.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventLog {
    events: Arc<RwLock<Vec<(SagaId, SagaEvent)>>>,
}

impl InMemoryEventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of recorded events.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Returns the events of one execution, in recording order.
    pub async fn events_for(&self, saga_id: SagaId) -> Vec<SagaEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|(id, _)| *id == saga_id)
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Returns the event type names of one execution, in recording order.
    pub async fn event_types_for(&self, saga_id: SagaId) -> Vec<&'static str> {
        self.events
            .read()
            .await
            .iter()
            .filter(|(id, _)| *id == saga_id)
            .map(|(_, event)| event.event_type())
            .collect()
    }

    /// Clears all events.
    pub async fn clear(&self) {
        self.events.write().await.clear();
    }
}

#[async_trait]
impl EventSink for InMemoryEventLog {
    async fn record(&self, saga_id: SagaId, event: SagaEvent) {
        self.events.write().await.push((saga_id, event));
    }
}
