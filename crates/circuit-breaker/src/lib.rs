//! Circuit breaker for remote saga dependencies.
//!
//! A breaker tracks consecutive failures of one dependency and, once a
//! threshold is crossed, rejects calls without invoking them until an open
//! period has elapsed. After that it lets trial calls through and either
//! closes again or reopens on the first failure.
//!
//! ```text
//! Closed ──[failure_threshold consecutive failures]──► Open
//!   ▲                                                    │
//!   │                                                    │ open_duration elapsed
//!   │                                                    ▼
//!   └──[success_threshold consecutive successes]── HalfOpen
//!                        [any failure] ─────────────────► Open
//! ```
//!
//! Breakers are created once per dependency and shared (behind `Arc`) by every
//! saga execution that talks to that dependency. See [`BreakerRegistry`].

pub mod breaker;
pub mod config;
pub mod error;
pub mod registry;
pub mod state;

pub use breaker::{BreakerSnapshot, CircuitBreaker};
pub use common::DependencyName;
pub use config::CircuitBreakerConfig;
pub use error::{CircuitBreakerError, ConfigError};
pub use registry::BreakerRegistry;
pub use state::CircuitState;
