//! Payment service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use crate::error::ServiceError;

const SERVICE: &str = "payment";

/// Result of a successful payment charge.
#[derive(Debug, Clone)]
pub struct PaymentResult {
    /// The payment ID assigned by the payment service.
    pub payment_id: String,
}

/// Trait for payment processing operations.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges a customer for an order.
    async fn charge(
        &self,
        order_id: &str,
        customer_id: &str,
        amount_cents: u64,
    ) -> Result<PaymentResult, ServiceError>;

    /// Refunds a previously made payment.
    async fn refund(&self, payment_id: &str) -> Result<(), ServiceError>;
}

#[derive(Debug)]
struct Payment {
    order_id: String,
    amount_cents: u64,
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<String, Payment>,
    refunded_cents: u64,
    next_id: u32,
    fail_on_charge: bool,
    fail_on_refund: bool,
}

/// In-memory payment service for tests and the demo.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following charge call fail until reset.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.write().fail_on_charge = fail;
    }

    /// Makes every following refund call fail until reset.
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.write().fail_on_refund = fail;
    }

    /// Returns the number of captured (not refunded) payments.
    pub fn payment_count(&self) -> usize {
        self.read().payments.len()
    }

    /// Returns true if a payment exists with the given ID.
    pub fn has_payment(&self, payment_id: &str) -> bool {
        self.read().payments.contains_key(payment_id)
    }

    /// Returns the order a payment was taken for.
    pub fn order_for(&self, payment_id: &str) -> Option<String> {
        self.read()
            .payments
            .get(payment_id)
            .map(|p| p.order_id.clone())
    }

    /// Total amount refunded so far.
    pub fn refunded_cents(&self) -> u64 {
        self.read().refunded_cents
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryPaymentState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryPaymentState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn charge(
        &self,
        order_id: &str,
        customer_id: &str,
        amount_cents: u64,
    ) -> Result<PaymentResult, ServiceError> {
        let mut state = self.write();

        if state.fail_on_charge {
            return Err(ServiceError::rejected(SERVICE, "payment declined"));
        }
        if amount_cents == 0 {
            return Err(ServiceError::rejected(SERVICE, "amount must be positive"));
        }

        state.next_id += 1;
        let payment_id = format!("PAY-{:04}", state.next_id);
        tracing::debug!(%payment_id, %customer_id, amount_cents, "payment captured");
        state.payments.insert(
            payment_id.clone(),
            Payment {
                order_id: order_id.to_string(),
                amount_cents,
            },
        );

        Ok(PaymentResult { payment_id })
    }

    async fn refund(&self, payment_id: &str) -> Result<(), ServiceError> {
        let mut state = self.write();

        if state.fail_on_refund {
            return Err(ServiceError::Unavailable(SERVICE));
        }
        let payment = state
            .payments
            .remove(payment_id)
            .ok_or_else(|| ServiceError::NotFound {
                service: SERVICE,
                id: payment_id.to_string(),
            })?;
        state.refunded_cents += payment.amount_cents;
        Ok(())
    }
}
