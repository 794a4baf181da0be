//! Shared step fixture for the saga integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use saga::{ContextUpdate, SagaContext, Step, StepError};

/// Ordered log of every execute/compensate call across all steps of a test.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, entry: String) {
        self.0.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn compensations(&self) -> Vec<String> {
        self.entries()
            .iter()
            .filter_map(|e| e.strip_prefix("compensate:").map(str::to_string))
            .collect()
    }

    pub fn undone(&self) -> Vec<String> {
        self.entries()
            .iter()
            .filter_map(|e| e.strip_prefix("undo:").map(str::to_string))
            .collect()
    }

    pub fn touched(&self, step: &str) -> bool {
        self.entries()
            .iter()
            .any(|e| e.split_once(':').is_some_and(|(_, name)| name == step))
    }
}

/// Step that records its calls, writes `<name>_id` into the context and
/// fails on demand. Compensation is always recorded as `compensate:<name>`;
/// it only undoes anything (recorded as `undo:<name>`) when its own key is
/// present in the context.
#[derive(Clone)]
pub struct RecordingStep {
    name: String,
    dependency: Option<String>,
    journal: Journal,
    fail_execute: Arc<AtomicBool>,
    fail_compensate: Arc<AtomicBool>,
    executions: Arc<AtomicUsize>,
}

impl RecordingStep {
    pub fn new(name: &str, journal: &Journal) -> Self {
        Self {
            name: name.to_string(),
            dependency: None,
            journal: journal.clone(),
            fail_execute: Arc::new(AtomicBool::new(false)),
            fail_compensate: Arc::new(AtomicBool::new(false)),
            executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn on(mut self, dependency: &str) -> Self {
        self.dependency = Some(dependency.to_string());
        self
    }

    pub fn failing(self) -> Self {
        self.set_fail_execute(true);
        self
    }

    pub fn failing_compensation(self) -> Self {
        self.fail_compensate.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_fail_execute(&self, fail: bool) {
        self.fail_execute.store(fail, Ordering::SeqCst);
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }

    pub fn key(&self) -> String {
        format!("{}_id", self.name)
    }
}

#[async_trait]
impl Step for RecordingStep {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependency(&self) -> Option<&str> {
        self.dependency.as_deref()
    }

    async fn execute(&self, context: &SagaContext) -> Result<ContextUpdate, StepError> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        self.journal.push(format!("execute:{}", self.name));
        if self.fail_execute.load(Ordering::SeqCst) {
            return Err(StepError::failed(format!("{} failed", self.name)));
        }
        Ok(ContextUpdate::new()
            .with(self.key(), format!("{}-{}", self.name.to_uppercase(), context.len())))
    }

    async fn compensate(&self, context: &SagaContext) -> Result<(), StepError> {
        self.journal.push(format!("compensate:{}", self.name));
        if self.fail_compensate.load(Ordering::SeqCst) {
            return Err(StepError::failed(format!("{} undo failed", self.name)));
        }
        if context.contains(&self.key()) {
            self.journal.push(format!("undo:{}", self.name));
        }
        Ok(())
    }
}
