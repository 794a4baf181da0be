//! Shipping service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::ServiceError;

const SERVICE: &str = "shipping";

/// Result of a successful shipment creation.
#[derive(Debug, Clone)]
pub struct ShipmentResult {
    /// The tracking number assigned by the shipping service.
    pub tracking_number: String,
}

/// Trait for shipping operations.
#[async_trait]
pub trait ShippingService: Send + Sync {
    /// Creates a shipment for an order.
    async fn create_shipment(&self, order_id: &str) -> Result<ShipmentResult, ServiceError>;

    /// Cancels a previously created shipment.
    async fn cancel_shipment(&self, tracking_number: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryShippingState {
    shipments: HashMap<String, String>,
    next_id: u32,
    fail_on_create: bool,
}

/// In-memory shipping service for tests and the demo.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingService {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingService {
    /// Creates a new in-memory shipping service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following create_shipment call fail until reset.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.write().fail_on_create = fail;
    }

    /// Returns the number of active shipments.
    pub fn shipment_count(&self) -> usize {
        self.read().shipments.len()
    }

    /// Returns true if a shipment exists with the given tracking number.
    pub fn has_shipment(&self, tracking_number: &str) -> bool {
        self.read().shipments.contains_key(tracking_number)
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryShippingState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryShippingState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ShippingService for InMemoryShippingService {
    async fn create_shipment(&self, order_id: &str) -> Result<ShipmentResult, ServiceError> {
        let mut state = self.write();

        if state.fail_on_create {
            return Err(ServiceError::Unavailable(SERVICE));
        }

        state.next_id += 1;
        let tracking_number = format!("TRACK-{:04}", state.next_id);
        state
            .shipments
            .insert(tracking_number.clone(), order_id.to_string());

        Ok(ShipmentResult { tracking_number })
    }

    async fn cancel_shipment(&self, tracking_number: &str) -> Result<(), ServiceError> {
        self.write()
            .shipments
            .remove(tracking_number)
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound {
                service: SERVICE,
                id: tracking_number.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_cancel() {
        let service = InMemoryShippingService::new();

        let result = service.create_shipment("ORD-1").await.unwrap();
        assert!(result.tracking_number.starts_with("TRACK-"));
        assert_eq!(service.shipment_count(), 1);
        assert!(service.has_shipment(&result.tracking_number));

        service
            .cancel_shipment(&result.tracking_number)
            .await
            .unwrap();
        assert_eq!(service.shipment_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_on_create() {
        let service = InMemoryShippingService::new();
        service.set_fail_on_create(true);

        let result = service.create_shipment("ORD-1").await;
        assert!(matches!(result, Err(ServiceError::Unavailable("shipping"))));
        assert_eq!(service.shipment_count(), 0);
    }

    #[tokio::test]
    async fn test_sequential_tracking_numbers() {
        let service = InMemoryShippingService::new();

        let r1 = service.create_shipment("ORD-1").await.unwrap();
        let r2 = service.create_shipment("ORD-2").await.unwrap();

        assert_eq!(r1.tracking_number, "TRACK-0001");
        assert_eq!(r2.tracking_number, "TRACK-0002");
    }
}
