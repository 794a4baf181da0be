//! One breaker per dependency.

use std::collections::BTreeMap;
use std::sync::Arc;

use common::DependencyName;

use crate::breaker::{BreakerSnapshot, CircuitBreaker};
use crate::config::CircuitBreakerConfig;
use crate::error::ConfigError;

/// Owns the circuit breaker of every known dependency.
///
/// Built once when the orchestrator is constructed; breakers are handed out
/// as `Arc` clones so concurrent saga executions share the same state.
#[derive(Debug, Default)]
pub struct BreakerRegistry {
    breakers: BTreeMap<DependencyName, Arc<CircuitBreaker>>,
}

impl BreakerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a breaker for `dependency`, replacing any existing one.
    pub fn register(
        &mut self,
        dependency: impl Into<DependencyName>,
        config: CircuitBreakerConfig,
    ) -> Result<Arc<CircuitBreaker>, ConfigError> {
        let dependency = dependency.into();
        let breaker = Arc::new(CircuitBreaker::new(dependency.clone(), config)?);
        self.breakers.insert(dependency, Arc::clone(&breaker));
        Ok(breaker)
    }

    /// Returns the breaker guarding `dependency`.
    pub fn get(&self, dependency: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(dependency).cloned()
    }

    /// Returns true if a breaker exists for `dependency`.
    pub fn contains(&self, dependency: &str) -> bool {
        self.breakers.contains_key(dependency)
    }

    /// Returns the registered dependency names in sorted order.
    pub fn dependencies(&self) -> impl Iterator<Item = &DependencyName> {
        self.breakers.keys()
    }

    /// Returns a snapshot of every breaker, sorted by dependency name.
    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        self.breakers.values().map(|b| b.snapshot()).collect()
    }

    /// Returns the number of registered breakers.
    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    /// Returns true if no breaker is registered.
    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
