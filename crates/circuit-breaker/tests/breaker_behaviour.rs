//! Integration tests for circuit breakers shared between concurrent callers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use circuit_breaker::{BreakerRegistry, CircuitBreakerConfig, CircuitBreakerError, CircuitState};
use futures_util::future::join_all;

fn config(failure_threshold: u32, success_threshold: u32) -> CircuitBreakerConfig {
    CircuitBreakerConfig::new(failure_threshold, success_threshold, Duration::from_secs(30))
        .unwrap()
}

#[tokio::test]
async fn test_concurrent_failures_open_shared_breaker() {
    let mut registry = BreakerRegistry::new();
    let breaker = registry.register("payment", config(5, 1)).unwrap();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let breaker = Arc::clone(&breaker);
            tokio::spawn(async move {
                breaker
                    .call(|| async { Err::<(), _>("gateway timeout") })
                    .await
            })
        })
        .collect();

    let mut attempted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Err(CircuitBreakerError::Inner(_)) => attempted += 1,
            Err(CircuitBreakerError::Open { .. }) => rejected += 1,
            Ok(()) => panic!("operation cannot succeed"),
        }
    }

    assert_eq!(attempted + rejected, 10);
    assert!(attempted >= 5);
    assert_eq!(breaker.state(), CircuitState::Open);
}

#[tokio::test]
async fn test_breakers_are_isolated_per_dependency() {
    let mut registry = BreakerRegistry::new();
    let payment = registry.register("payment", config(2, 1)).unwrap();
    let inventory = registry.register("inventory", config(2, 1)).unwrap();

    for _ in 0..2 {
        let _ = payment.call(|| async { Err::<(), _>("declined") }).await;
    }

    assert_eq!(payment.state(), CircuitState::Open);
    assert_eq!(inventory.state(), CircuitState::Closed);
    assert!(inventory.call(|| async { Ok::<_, &str>(7) }).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_half_open_probes_all_let_through() {
    let mut registry = BreakerRegistry::new();
    let breaker = registry.register("shipping", config(1, 3)).unwrap();
    let _ = breaker.call(|| async { Err::<(), _>("down") }).await;
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(31)).await;

    let calls = AtomicUsize::new(0);
    let probes = (0..3).map(|_| {
        breaker.call(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::task::yield_now().await;
            Ok::<_, &str>(())
        })
    });
    let results = join_all(probes).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_full_cycle_closed_open_half_open_closed() {
    let mut registry = BreakerRegistry::new();
    let breaker = registry.register("inventory", config(2, 2)).unwrap();

    for _ in 0..2 {
        let _ = breaker.call(|| async { Err::<(), _>("refused") }).await;
    }
    assert_eq!(breaker.state(), CircuitState::Open);

    tokio::time::advance(Duration::from_secs(31)).await;
    breaker.call(|| async { Ok::<_, &str>(()) }).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::HalfOpen);

    breaker.call(|| async { Ok::<_, &str>(()) }).await.unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);

    let snapshots = registry.snapshots();
    assert_eq!(snapshots.len(), 1);
    assert_eq!(snapshots[0].failure_count, 0);
}
