//! The three steps of order fulfillment.
//!
//! Each step reads its inputs from the saga context and writes the identifier
//! its compensation needs back into it. Compensations run on the failed step
//! too, so every one of them is a no-op when its identifier is missing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use saga::{ContextUpdate, SagaContext, Step, StepError, within};

use crate::services::{InventoryService, PaymentService, ReservationItem, ShippingService};

/// Dependency name of the inventory service.
pub const INVENTORY: &str = "inventory";
/// Dependency name of the payment service.
pub const PAYMENT: &str = "payment";
/// Dependency name of the shipping service.
pub const SHIPPING: &str = "shipping";

/// Deadline applied to every service call unless overridden.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

pub mod keys {
    pub const ORDER_ID: &str = "order_id";
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const AMOUNT_CENTS: &str = "amount_cents";
    pub const ITEMS: &str = "items";
    pub const RESERVATION_ID: &str = "reservation_id";
    pub const PAYMENT_ID: &str = "payment_id";
    pub const TRACKING_NUMBER: &str = "tracking_number";
}

fn required_str<'a>(context: &'a SagaContext, key: &str) -> Result<&'a str, StepError> {
    context
        .get_str(key)
        .ok_or_else(|| StepError::failed(format!("missing '{key}' in saga context")))
}

/// Reserves stock for the order's items. Undone by releasing the reservation.
pub struct ReserveInventory {
    inventory: Arc<dyn InventoryService>,
    timeout: Duration,
}

impl ReserveInventory {
    pub fn new(inventory: Arc<dyn InventoryService>) -> Self {
        Self {
            inventory,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Step for ReserveInventory {
    fn name(&self) -> &str {
        "reserve_inventory"
    }

    fn dependency(&self) -> Option<&str> {
        Some(INVENTORY)
    }

    async fn execute(&self, context: &SagaContext) -> Result<ContextUpdate, StepError> {
        let order_id = required_str(context, keys::ORDER_ID)?;
        let items: Vec<ReservationItem> = context
            .get_as(keys::ITEMS)
            .ok_or_else(|| StepError::failed("order has no readable items"))?;

        let reservation = within(self.timeout, async {
            self.inventory.reserve(order_id, &items).await.map_err(StepError::from)
        })
        .await?;

        tracing::info!(%order_id, reservation_id = %reservation.reservation_id, "inventory reserved");
        Ok(ContextUpdate::new().with(keys::RESERVATION_ID, reservation.reservation_id))
    }

    async fn compensate(&self, context: &SagaContext) -> Result<(), StepError> {
        let Some(reservation_id) = context.get_str(keys::RESERVATION_ID) else {
            return Ok(());
        };
        within(self.timeout, async {
            self.inventory.release(reservation_id).await.map_err(StepError::from)
        })
        .await?;
        tracing::info!(%reservation_id, "inventory released");
        Ok(())
    }
}

/// Charges the customer. Undone by refunding the payment.
pub struct ProcessPayment {
    payment: Arc<dyn PaymentService>,
    timeout: Duration,
}

impl ProcessPayment {
    pub fn new(payment: Arc<dyn PaymentService>) -> Self {
        Self {
            payment,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Step for ProcessPayment {
    fn name(&self) -> &str {
        "process_payment"
    }

    fn dependency(&self) -> Option<&str> {
        Some(PAYMENT)
    }

    async fn execute(&self, context: &SagaContext) -> Result<ContextUpdate, StepError> {
        let order_id = required_str(context, keys::ORDER_ID)?;
        let customer_id = required_str(context, keys::CUSTOMER_ID)?;
        let amount_cents: u64 = context
            .get_as(keys::AMOUNT_CENTS)
            .ok_or_else(|| StepError::failed("order has no readable amount"))?;

        let payment = within(self.timeout, async {
            self.payment
                .charge(order_id, customer_id, amount_cents)
                .await
                .map_err(StepError::from)
        })
        .await?;

        tracing::info!(%order_id, payment_id = %payment.payment_id, amount_cents, "payment captured");
        Ok(ContextUpdate::new().with(keys::PAYMENT_ID, payment.payment_id))
    }

    async fn compensate(&self, context: &SagaContext) -> Result<(), StepError> {
        let Some(payment_id) = context.get_str(keys::PAYMENT_ID) else {
            return Ok(());
        };
        within(self.timeout, async {
            self.payment.refund(payment_id).await.map_err(StepError::from)
        })
        .await?;
        tracing::info!(%payment_id, "payment refunded");
        Ok(())
    }
}

/// Books a shipment. Undone by cancelling it.
pub struct CreateShipment {
    shipping: Arc<dyn ShippingService>,
    timeout: Duration,
}

impl CreateShipment {
    pub fn new(shipping: Arc<dyn ShippingService>) -> Self {
        Self {
            shipping,
            timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Step for CreateShipment {
    fn name(&self) -> &str {
        "create_shipment"
    }

    fn dependency(&self) -> Option<&str> {
        Some(SHIPPING)
    }

    async fn execute(&self, context: &SagaContext) -> Result<ContextUpdate, StepError> {
        let order_id = required_str(context, keys::ORDER_ID)?;

        let shipment = within(self.timeout, async {
            self.shipping.create_shipment(order_id).await.map_err(StepError::from)
        })
        .await?;

        tracing::info!(%order_id, tracking_number = %shipment.tracking_number, "shipment created");
        Ok(ContextUpdate::new().with(keys::TRACKING_NUMBER, shipment.tracking_number))
    }

    async fn compensate(&self, context: &SagaContext) -> Result<(), StepError> {
        let Some(tracking_number) = context.get_str(keys::TRACKING_NUMBER) else {
            return Ok(());
        };
        within(self.timeout, async {
            self.shipping.cancel_shipment(tracking_number).await.map_err(StepError::from)
        })
        .await?;
        tracing::info!(%tracking_number, "shipment cancelled");
        Ok(())
    }
}
