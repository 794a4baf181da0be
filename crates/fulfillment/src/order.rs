//! Orders and the saga that fulfils them.

use std::sync::Arc;

use saga::{OrchestratorConfig, Saga, SagaContext};

use crate::services::{InventoryService, PaymentService, ReservationItem, ShippingService};
use crate::steps::{
    CreateShipment, INVENTORY, PAYMENT, ProcessPayment, ReserveInventory, SHIPPING, keys,
};

/// Name of the saga built by [`order_fulfillment_saga`].
pub const SAGA_NAME: &str = "order_fulfillment";

/// An order to fulfil.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub order_id: String,
    pub customer_id: String,
    pub items: Vec<ReservationItem>,
    pub amount_cents: u64,
}

impl Order {
    /// Creates an empty order.
    pub fn new(order_id: impl Into<String>, customer_id: impl Into<String>) -> Self {
        Self {
            order_id: order_id.into(),
            customer_id: customer_id.into(),
            items: Vec::new(),
            amount_cents: 0,
        }
    }

    /// Adds `quantity` units of `sku` priced at `unit_price_cents` each.
    pub fn with_item(mut self, sku: impl Into<String>, quantity: u32, unit_price_cents: u64) -> Self {
        self.amount_cents += u64::from(quantity) * unit_price_cents;
        self.items.push(ReservationItem::new(sku, quantity));
        self
    }

    /// Builds the initial saga context for this order.
    pub fn to_context(&self) -> Result<SagaContext, serde_json::Error> {
        let items = serde_json::to_value(&self.items)?;
        Ok(SagaContext::new()
            .with(keys::ORDER_ID, self.order_id.as_str())
            .with(keys::CUSTOMER_ID, self.customer_id.as_str())
            .with(keys::AMOUNT_CENTS, self.amount_cents)
            .with(keys::ITEMS, items))
    }
}

/// Builds the reserve, charge, ship saga.
pub fn order_fulfillment_saga(
    inventory: Arc<dyn InventoryService>,
    payment: Arc<dyn PaymentService>,
    shipping: Arc<dyn ShippingService>,
) -> Saga {
    Saga::new(SAGA_NAME)
        .add_step(ReserveInventory::new(inventory))
        .add_step(ProcessPayment::new(payment))
        .add_step(CreateShipment::new(shipping))
}

/// Makes sure `config` has a breaker for every fulfillment dependency.
///
/// Dependencies already present keep their settings; missing ones get the
/// default breaker.
pub fn fulfillment_config(mut config: OrchestratorConfig) -> OrchestratorConfig {
    for dependency in [INVENTORY, PAYMENT, SHIPPING] {
        if !config.dependencies.contains_key(dependency) {
            config = config.with_default_dependency(dependency);
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use saga::CircuitBreakerConfig;

    use super::*;
    use crate::services::{
        InMemoryInventoryService, InMemoryPaymentService, InMemoryShippingService,
    };

    #[test]
    fn test_with_item_accumulates_amount() {
        let order = Order::new("ORD-1", "CUST-1")
            .with_item("SKU-001", 2, 1250)
            .with_item("SKU-002", 1, 500);

        assert_eq!(order.amount_cents, 3000);
        assert_eq!(order.items.len(), 2);
    }

    #[test]
    fn test_to_context() {
        let order = Order::new("ORD-1", "CUST-1").with_item("SKU-001", 3, 100);
        let context = order.to_context().unwrap();

        assert_eq!(context.get_str(keys::ORDER_ID), Some("ORD-1"));
        assert_eq!(context.get_str(keys::CUSTOMER_ID), Some("CUST-1"));
        assert_eq!(context.get_as::<u64>(keys::AMOUNT_CENTS), Some(300));
        assert_eq!(
            context.get_as::<Vec<ReservationItem>>(keys::ITEMS),
            Some(order.items)
        );
    }

    #[test]
    fn test_saga_layout() {
        let saga = order_fulfillment_saga(
            Arc::new(InMemoryInventoryService::new()),
            Arc::new(InMemoryPaymentService::new()),
            Arc::new(InMemoryShippingService::new()),
        );

        assert_eq!(saga.name(), SAGA_NAME);
        assert_eq!(
            saga.step_names(),
            ["reserve_inventory", "process_payment", "create_shipment"]
        );
    }

    #[test]
    fn test_fulfillment_config_keeps_existing_settings() {
        let payment = CircuitBreakerConfig::new(1, 1, Duration::from_secs(2)).unwrap();
        let config = fulfillment_config(OrchestratorConfig::new().with_dependency(PAYMENT, payment));

        assert_eq!(config.dependencies.len(), 3);
        assert_eq!(config.dependencies.get(PAYMENT), Some(&payment));
        assert_eq!(
            config.dependencies.get(SHIPPING),
            Some(&CircuitBreakerConfig::default())
        );
    }
}
