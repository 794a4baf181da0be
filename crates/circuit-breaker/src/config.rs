//! Circuit breaker configuration.

use std::time::Duration;

use crate::error::ConfigError;

/// Thresholds and timing for one circuit breaker.
///
/// All three values must be greater than zero; see [`validate`](Self::validate).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures in `Closed` that open the circuit.
    pub failure_threshold: u32,
    /// Consecutive successes in `HalfOpen` that close the circuit.
    pub success_threshold: u32,
    /// How long the circuit stays `Open`, measured from the last failure.
    pub open_duration: Duration,
}

impl CircuitBreakerConfig {
    /// Creates a validated configuration.
    pub fn new(
        failure_threshold: u32,
        success_threshold: u32,
        open_duration: Duration,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            failure_threshold,
            success_threshold,
            open_duration,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks that every threshold and the open duration are non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::ZeroFailureThreshold);
        }
        if self.success_threshold == 0 {
            return Err(ConfigError::ZeroSuccessThreshold);
        }
        if self.open_duration.is_zero() {
            return Err(ConfigError::ZeroOpenDuration);
        }
        Ok(())
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            open_duration: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.success_threshold, 2);
        assert_eq!(config.open_duration, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_new_rejects_zero_values() {
        assert_eq!(
            CircuitBreakerConfig::new(0, 1, Duration::from_secs(1)),
            Err(ConfigError::ZeroFailureThreshold)
        );
        assert_eq!(
            CircuitBreakerConfig::new(1, 0, Duration::from_secs(1)),
            Err(ConfigError::ZeroSuccessThreshold)
        );
        assert_eq!(
            CircuitBreakerConfig::new(1, 1, Duration::ZERO),
            Err(ConfigError::ZeroOpenDuration)
        );
    }

    #[test]
    fn test_new_accepts_positive_values() {
        let config = CircuitBreakerConfig::new(3, 1, Duration::from_millis(250)).unwrap();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.success_threshold, 1);
        assert_eq!(config.open_duration, Duration::from_millis(250));
    }
}
