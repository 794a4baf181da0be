//! Saga and step status machines.

use serde::{Deserialize, Serialize};

/// Overall status of one saga execution.
///
/// State transitions:
/// ```text
/// Running ──┬──► Completed
///           ├──► Compensated          (every compensation succeeded)
///           └──► CompensationFailed   (at least one compensation failed)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SagaStatus {
    /// Steps are being executed or compensated.
    #[default]
    Running,

    /// All steps completed successfully (terminal state).
    Completed,

    /// A step failed and the rollback finished cleanly (terminal state).
    Compensated,

    /// A step failed and at least one compensation failed too (terminal state).
    CompensationFailed,
}

impl SagaStatus {
    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SagaStatus::Running)
    }

    /// Returns true if the saga failed, whether or not the rollback was clean.
    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            SagaStatus::Compensated | SagaStatus::CompensationFailed
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SagaStatus::Running => "Running",
            SagaStatus::Completed => "Completed",
            SagaStatus::Compensated => "Compensated",
            SagaStatus::CompensationFailed => "CompensationFailed",
        }
    }
}

impl std::fmt::Display for SagaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single step within one saga execution.
///
/// ```text
/// Pending ──► Executing ──┬──► Completed ──► Compensated
///                         └──► Failed ─────► Compensated
/// ```
///
/// A step whose compensation fails keeps its `Completed` or `Failed` status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StepStatus {
    #[default]
    Pending,
    Executing,
    Completed,
    Failed,
    Compensated,
}

impl StepStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "Pending",
            StepStatus::Executing => "Executing",
            StepStatus::Completed => "Completed",
            StepStatus::Failed => "Failed",
            StepStatus::Compensated => "Compensated",
        }
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_status_is_running() {
        assert_eq!(SagaStatus::default(), SagaStatus::Running);
        assert_eq!(StepStatus::default(), StepStatus::Pending);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!SagaStatus::Running.is_terminal());
        assert!(SagaStatus::Completed.is_terminal());
        assert!(SagaStatus::Compensated.is_terminal());
        assert!(SagaStatus::CompensationFailed.is_terminal());
    }

    #[test]
    fn test_failed_states() {
        assert!(!SagaStatus::Running.is_failed());
        assert!(!SagaStatus::Completed.is_failed());
        assert!(SagaStatus::Compensated.is_failed());
        assert!(SagaStatus::CompensationFailed.is_failed());
    }

    #[test]
    fn test_display() {
        assert_eq!(SagaStatus::CompensationFailed.to_string(), "CompensationFailed");
        assert_eq!(StepStatus::Compensated.to_string(), "Compensated");
        assert_eq!(StepStatus::Executing.to_string(), "Executing");
    }

    #[test]
    fn test_serialization() {
        let status = SagaStatus::Compensated;
        let json = serde_json::to_string(&status).unwrap();
        assert_eq!(json, "\"Compensated\"");
        let deserialized: SagaStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, deserialized);
    }
}
