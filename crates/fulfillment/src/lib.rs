//! Order fulfillment built on the saga orchestrator.
//!
//! Three collaborators (inventory, payment, shipping) are modelled as
//! `#[async_trait]` service traits with in-memory implementations. The
//! [`order_fulfillment_saga`] reserves stock, charges the customer and books
//! a shipment; a failure anywhere releases, refunds and cancels whatever was
//! already done.

pub mod error;
pub mod order;
pub mod services;
pub mod steps;

pub use error::ServiceError;
pub use order::{Order, SAGA_NAME, fulfillment_config, order_fulfillment_saga};
pub use services::{
    InMemoryInventoryService, InMemoryPaymentService, InMemoryShippingService, InventoryService,
    PaymentService, ReservationItem, ShippingService,
};
pub use steps::{CreateShipment, INVENTORY, PAYMENT, ProcessPayment, ReserveInventory, SHIPPING};
