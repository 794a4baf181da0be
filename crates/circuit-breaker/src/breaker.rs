//! The circuit breaker itself.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use common::DependencyName;
use serde::Serialize;
use tokio::time::Instant;

use crate::config::CircuitBreakerConfig;
use crate::error::{CircuitBreakerError, ConfigError};
use crate::state::CircuitState;

#[derive(Debug, Default)]
struct BreakerFields {
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    last_failure_at: Option<Instant>,
}

/// Point-in-time view of a breaker, for logs and health output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub dependency: DependencyName,
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
}

/// Failure-aware gate in front of one remote dependency.
///
/// The breaker never imposes a timeout of its own. It only classifies what
/// the wrapped operation returns, so deadlines belong inside the operation.
///
/// # Concurrency
///
/// State lives behind a single mutex that is never held across an `.await`.
/// Admission (including the `Open` → `HalfOpen` transition) is one critical
/// section and recording the outcome is another. Concurrent calls admitted
/// while `HalfOpen` are all let through and each outcome is counted on its
/// own; a success that arrives after another probe already reopened the
/// circuit is ignored.
#[derive(Debug)]
pub struct CircuitBreaker {
    dependency: DependencyName,
    config: CircuitBreakerConfig,
    fields: Mutex<BreakerFields>,
}

impl CircuitBreaker {
    /// Creates a closed breaker for `dependency`.
    pub fn new(
        dependency: impl Into<DependencyName>,
        config: CircuitBreakerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            dependency: dependency.into(),
            config,
            fields: Mutex::new(BreakerFields::default()),
        })
    }

    /// Returns the dependency this breaker guards.
    pub fn dependency(&self) -> &DependencyName {
        &self.dependency
    }

    /// Returns the breaker configuration.
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Returns the current state.
    ///
    /// An `Open` breaker whose open period has elapsed still reports `Open`
    /// until the next call moves it to `HalfOpen`.
    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Returns the consecutive failure count.
    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }

    /// Returns the consecutive success count accumulated while `HalfOpen`.
    pub fn success_count(&self) -> u32 {
        self.lock().success_count
    }

    /// Returns a consistent snapshot of state and counters.
    pub fn snapshot(&self) -> BreakerSnapshot {
        let fields = self.lock();
        BreakerSnapshot {
            dependency: self.dependency.clone(),
            state: fields.state,
            failure_count: fields.failure_count,
            success_count: fields.success_count,
        }
    }

    /// Forces the breaker back to `Closed` and clears all counters.
    pub fn reset(&self) {
        let mut fields = self.lock();
        if fields.state != CircuitState::Closed {
            self.transition(&mut fields, CircuitState::Closed);
        }
        fields.failure_count = 0;
        fields.success_count = 0;
        fields.last_failure_at = None;
    }

    /// Runs `operation` through the breaker.
    ///
    /// Returns [`CircuitBreakerError::Open`] without calling `operation` while
    /// the circuit is open. Otherwise the operation runs and its error, if
    /// any, is returned unchanged inside [`CircuitBreakerError::Inner`].
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.admit() {
            metrics::counter!(
                "circuit_breaker_rejections_total",
                "dependency" => self.dependency.to_string()
            )
            .increment(1);
            tracing::debug!(dependency = %self.dependency, "circuit open, call rejected");
            return Err(CircuitBreakerError::Open {
                dependency: self.dependency.clone(),
            });
        }

        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(CircuitBreakerError::Inner(e))
            }
        }
    }

    /// Decides whether a call may proceed, moving `Open` to `HalfOpen` once
    /// the open period has passed.
    fn admit(&self) -> bool {
        let mut fields = self.lock();
        if fields.state != CircuitState::Open {
            return true;
        }

        let cooling_down = fields
            .last_failure_at
            .is_some_and(|at| at.elapsed() <= self.config.open_duration);
        if cooling_down {
            return false;
        }

        self.transition(&mut fields, CircuitState::HalfOpen);
        true
    }

    fn record_success(&self) {
        let mut fields = self.lock();
        match fields.state {
            CircuitState::Closed => fields.failure_count = 0,
            CircuitState::HalfOpen => {
                fields.success_count = fields.success_count.saturating_add(1);
                if fields.success_count >= self.config.success_threshold {
                    self.transition(&mut fields, CircuitState::Closed);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut fields = self.lock();
        fields.failure_count = fields.failure_count.saturating_add(1);
        fields.last_failure_at = Some(Instant::now());

        match fields.state {
            CircuitState::Closed if fields.failure_count >= self.config.failure_threshold => {
                self.transition(&mut fields, CircuitState::Open);
            }
            // No partial credit while probing.
            CircuitState::HalfOpen => self.transition(&mut fields, CircuitState::Open),
            _ => {}
        }
    }

    fn transition(&self, fields: &mut BreakerFields, to: CircuitState) {
        let from = fields.state;
        fields.state = to;
        match to {
            CircuitState::Closed => {
                fields.failure_count = 0;
                fields.success_count = 0;
                tracing::info!(dependency = %self.dependency, %from, "circuit breaker closed");
            }
            CircuitState::Open => {
                fields.success_count = 0;
                tracing::warn!(
                    dependency = %self.dependency,
                    %from,
                    failures = fields.failure_count,
                    "circuit breaker opened"
                );
            }
            CircuitState::HalfOpen => {
                fields.success_count = 0;
                tracing::info!(dependency = %self.dependency, "circuit breaker half-open, probing");
            }
        }

        metrics::counter!(
            "circuit_breaker_transitions_total",
            "dependency" => self.dependency.to_string(),
            "to" => to.as_str()
        )
        .increment(1);
    }

    // The guarded data is plain counters, so a panic elsewhere cannot leave
    // it logically inconsistent.
    fn lock(&self) -> MutexGuard<'_, BreakerFields> {
        self.fields.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
