//! Orchestrator configuration loaded from environment variables.

use std::collections::BTreeMap;
use std::time::Duration;

use circuit_breaker::CircuitBreakerConfig;
use common::DependencyName;

/// Breaker settings for every dependency the orchestrator knows about.
///
/// Reads from environment variables:
/// - `SAGA_BREAKER_FAILURE_THRESHOLD`: consecutive failures that open a breaker (default: `5`)
/// - `SAGA_BREAKER_SUCCESS_THRESHOLD`: half-open successes that close it (default: `2`)
/// - `SAGA_BREAKER_OPEN_DURATION_SECS`: seconds a breaker stays open (default: `30`)
/// - `SAGA_DEPENDENCIES`: comma-separated dependency names, each given the
///   breaker settings above (default: none)
#[derive(Debug, Clone, Default)]
pub struct OrchestratorConfig {
    pub default_breaker: CircuitBreakerConfig,
    pub dependencies: BTreeMap<DependencyName, CircuitBreakerConfig>,
}

impl OrchestratorConfig {
    /// Creates a configuration with default breaker settings and no dependencies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dependency with its own breaker settings.
    pub fn with_dependency(
        mut self,
        dependency: impl Into<DependencyName>,
        breaker: CircuitBreakerConfig,
    ) -> Self {
        self.dependencies.insert(dependency.into(), breaker);
        self
    }

    /// Adds a dependency that uses [`default_breaker`](Self::default_breaker).
    pub fn with_default_dependency(self, dependency: impl Into<DependencyName>) -> Self {
        let breaker = self.default_breaker;
        self.with_dependency(dependency, breaker)
    }

    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fallback = CircuitBreakerConfig::default();
        let parse = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        let default_breaker = CircuitBreakerConfig {
            failure_threshold: parse("SAGA_BREAKER_FAILURE_THRESHOLD")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(fallback.failure_threshold),
            success_threshold: parse("SAGA_BREAKER_SUCCESS_THRESHOLD")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(fallback.success_threshold),
            open_duration: parse("SAGA_BREAKER_OPEN_DURATION_SECS")
                .map(Duration::from_secs)
                .unwrap_or(fallback.open_duration),
        };

        let dependencies: BTreeMap<_, _> = lookup("SAGA_DEPENDENCIES")
            .map(|names| {
                names
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(|name| (DependencyName::from(name), default_breaker))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            default_breaker,
            dependencies,
        }
    }
}
