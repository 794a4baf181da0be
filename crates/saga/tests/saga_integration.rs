//! Integration tests for running sagas without circuit breakers.

mod support;

use async_trait::async_trait;
use saga::{
    ContextUpdate, Saga, SagaContext, SagaError, SagaStatus, Step, StepError, StepStatus,
};
use support::{Journal, RecordingStep};

fn order_saga(journal: &Journal) -> (Saga, RecordingStep, RecordingStep, RecordingStep) {
    let reserve = RecordingStep::new("reserve", journal);
    let charge = RecordingStep::new("charge", journal);
    let ship = RecordingStep::new("ship", journal);
    let saga = Saga::new("order")
        .add_step(reserve.clone())
        .add_step(charge.clone())
        .add_step(ship.clone());
    (saga, reserve, charge, ship)
}

#[tokio::test]
async fn test_happy_path_runs_every_step_in_order() {
    let journal = Journal::new();
    let (saga, ..) = order_saga(&journal);

    let execution = saga
        .execute(SagaContext::new().with("order_id", "ORD-1"))
        .await
        .unwrap();

    assert_eq!(execution.status(), SagaStatus::Completed);
    assert_eq!(execution.executed_steps(), ["reserve", "charge", "ship"]);
    assert!(
        execution
            .steps()
            .iter()
            .all(|r| r.status == StepStatus::Completed)
    );
    assert_eq!(
        journal.entries(),
        ["execute:reserve", "execute:charge", "execute:ship"]
    );

    let context = execution.into_result().unwrap();
    assert_eq!(context.get_str("order_id"), Some("ORD-1"));
    // Each step sees everything written before it.
    assert_eq!(context.get_str("reserve_id"), Some("RESERVE-1"));
    assert_eq!(context.get_str("charge_id"), Some("CHARGE-2"));
    assert_eq!(context.get_str("ship_id"), Some("SHIP-3"));
}

#[tokio::test]
async fn test_charge_failure_compensates_charge_then_reserve() {
    let journal = Journal::new();
    let (saga, _, charge, ship) = order_saga(&journal);
    charge.set_fail_execute(true);

    let execution = saga.execute(SagaContext::new()).await.unwrap();

    assert_eq!(execution.status(), SagaStatus::Compensated);
    assert_eq!(journal.compensations(), ["charge", "reserve"]);
    assert_eq!(journal.undone(), ["reserve"]);
    assert!(!journal.touched("ship"));
    assert_eq!(ship.executions(), 0);

    assert_eq!(execution.executed_steps(), ["reserve"]);
    assert_eq!(execution.step_status("reserve"), Some(StepStatus::Compensated));
    assert_eq!(execution.step_status("charge"), Some(StepStatus::Compensated));
    assert_eq!(execution.step_status("ship"), Some(StepStatus::Pending));

    match execution.into_result() {
        Err(SagaError::StepExecution { step, source }) => {
            assert_eq!(step, "charge");
            assert_eq!(source.to_string(), "charge failed");
        }
        other => panic!("expected charge failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_reserve_compensation_still_returns_charge_error() {
    let journal = Journal::new();
    let reserve = RecordingStep::new("reserve", &journal).failing_compensation();
    let charge = RecordingStep::new("charge", &journal).failing();
    let ship = RecordingStep::new("ship", &journal);
    let saga = Saga::new("order")
        .add_step(reserve)
        .add_step(charge)
        .add_step(ship);

    let execution = saga.execute(SagaContext::new()).await.unwrap();

    assert_eq!(execution.status(), SagaStatus::CompensationFailed);
    assert_eq!(journal.compensations(), ["charge", "reserve"]);
    assert_eq!(execution.compensation_errors().len(), 1);
    assert_eq!(execution.compensation_errors()[0].step, "reserve");
    assert_eq!(
        execution.compensation_errors()[0].source.to_string(),
        "reserve undo failed"
    );
    assert_eq!(execution.step_status("charge"), Some(StepStatus::Compensated));

    let err = execution.into_result().unwrap_err();
    assert_eq!(err.step(), Some("charge"));
    assert!(matches!(err, SagaError::StepExecution { .. }));
}

#[tokio::test]
async fn test_every_compensation_failing_still_attempts_all() {
    let journal = Journal::new();
    let saga = Saga::new("grim")
        .add_step(RecordingStep::new("a", &journal).failing_compensation())
        .add_step(RecordingStep::new("b", &journal).failing_compensation())
        .add_step(RecordingStep::new("c", &journal).failing_compensation())
        .add_step(RecordingStep::new("d", &journal).failing());

    let execution = saga.execute(SagaContext::new()).await.unwrap();

    assert_eq!(journal.compensations(), ["d", "c", "b", "a"]);
    assert_eq!(execution.compensation_order(), ["d", "c", "b", "a"]);
    let failed: Vec<_> = execution
        .compensation_errors()
        .iter()
        .map(|e| e.step.as_str())
        .collect();
    assert_eq!(failed, ["c", "b", "a"]);
    assert_eq!(execution.status(), SagaStatus::CompensationFailed);
}

#[tokio::test]
async fn test_same_saga_can_run_repeatedly() {
    let journal = Journal::new();
    let (saga, _, charge, _) = order_saga(&journal);

    charge.set_fail_execute(true);
    assert!(saga.run(SagaContext::new()).await.is_err());

    charge.set_fail_execute(false);
    let context = saga.run(SagaContext::new()).await.unwrap();
    assert!(context.contains("ship_id"));
}

/// Compensation that reads what its own execute wrote.
struct IssueTicket;

#[async_trait]
impl Step for IssueTicket {
    fn name(&self) -> &str {
        "issue_ticket"
    }

    async fn execute(&self, context: &SagaContext) -> Result<ContextUpdate, StepError> {
        let seat = context
            .get_as::<u32>("seat")
            .ok_or_else(|| StepError::failed("no seat selected"))?;
        Ok(ContextUpdate::new().with("ticket", format!("TICKET-{seat}")))
    }

    async fn compensate(&self, context: &SagaContext) -> Result<(), StepError> {
        match context.get_str("ticket") {
            Some(ticket) if ticket.starts_with("TICKET-") => Ok(()),
            Some(other) => Err(StepError::failed(format!("unexpected ticket {other}"))),
            None => Ok(()),
        }
    }
}

#[tokio::test]
async fn test_compensation_sees_keys_written_by_its_step() {
    let journal = Journal::new();
    let saga = Saga::new("tickets")
        .add_step(IssueTicket)
        .add_step(RecordingStep::new("notify", &journal).failing());

    let execution = saga
        .execute(SagaContext::new().with("seat", 12))
        .await
        .unwrap();

    assert_eq!(execution.status(), SagaStatus::Compensated);
    assert_eq!(execution.context().get_str("ticket"), Some("TICKET-12"));
    assert_eq!(
        execution.step_status("issue_ticket"),
        Some(StepStatus::Compensated)
    );
}

#[tokio::test]
async fn test_missing_input_fails_first_step() {
    let saga = Saga::new("tickets").add_step(IssueTicket);

    let err = saga.run(SagaContext::new()).await.unwrap_err();
    assert_eq!(err.to_string(), "Saga step 'issue_ticket' failed: no seat selected");
}
