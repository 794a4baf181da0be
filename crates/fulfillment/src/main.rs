//! Fulfillment demo entry point.
//!
//! Runs a handful of orders through the orchestrator against in-memory
//! services, including a payment outage that opens the payment breaker, then
//! prints the Prometheus exposition of everything that was recorded.

use std::sync::Arc;

use fulfillment::{
    InMemoryInventoryService, InMemoryPaymentService, InMemoryShippingService, Order, PAYMENT,
    fulfillment_config, order_fulfillment_saga, steps::keys,
};
use saga::{InMemoryEventLog, OrchestratorConfig, Saga, SagaOrchestrator};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

async fn fulfil(orchestrator: &SagaOrchestrator, saga: &Saga, order: Order) {
    let order_id = order.order_id.as_str();
    let context = match order.to_context() {
        Ok(context) => context,
        Err(error) => {
            tracing::error!(%order_id, %error, "order could not be encoded");
            return;
        }
    };

    let execution = match orchestrator.execute(saga, context).await {
        Ok(execution) => execution,
        Err(error) => {
            tracing::error!(%order_id, %error, "saga rejected before running");
            return;
        }
    };

    let status = execution.status();
    metrics::counter!("fulfillment_orders_total", "status" => status.as_str()).increment(1);
    match execution.error() {
        None => tracing::info!(
            %order_id,
            tracking_number = ?execution.context().get_str(keys::TRACKING_NUMBER),
            "order fulfilled"
        ),
        Some(error) => tracing::warn!(
            %order_id,
            %status,
            circuit_open = error.is_circuit_open(),
            %error,
            "order rolled back"
        ),
    }
}

#[tokio::main]
async fn main() {
    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Build the orchestrator from the environment
    let events = InMemoryEventLog::new();
    let orchestrator = match SagaOrchestrator::new(fulfillment_config(OrchestratorConfig::from_env()))
    {
        Ok(orchestrator) => orchestrator.with_event_sink(Arc::new(events.clone())),
        Err(error) => {
            tracing::error!(%error, "invalid orchestrator configuration");
            std::process::exit(1);
        }
    };

    // 4. Wire the services into the saga
    let inventory = InMemoryInventoryService::new();
    let payment = InMemoryPaymentService::new();
    let shipping = InMemoryShippingService::new();
    let saga = order_fulfillment_saga(
        Arc::new(inventory.clone()),
        Arc::new(payment.clone()),
        Arc::new(shipping.clone()),
    );

    // 5. A clean order
    fulfil(
        &orchestrator,
        &saga,
        Order::new("ORD-1001", "CUST-1").with_item("SKU-001", 2, 1250),
    )
    .await;

    // 6. Payment outage: declines until the breaker opens, then fails fast
    payment.set_fail_on_charge(true);
    let threshold = orchestrator
        .breaker(PAYMENT)
        .map_or(0, |breaker| breaker.config().failure_threshold);
    for n in 0..=threshold {
        let order = Order::new(format!("ORD-{}", 2001 + n), "CUST-2").with_item("SKU-002", 1, 999);
        fulfil(&orchestrator, &saga, order).await;
    }
    payment.set_fail_on_charge(false);

    // 7. Shipping outage: payment is refunded and stock released
    shipping.set_fail_on_create(true);
    fulfil(
        &orchestrator,
        &saga,
        Order::new("ORD-3001", "CUST-3").with_item("SKU-003", 1, 4500),
    )
    .await;
    shipping.set_fail_on_create(false);

    for snapshot in orchestrator.breakers().snapshots() {
        match serde_json::to_string(&snapshot) {
            Ok(json) => tracing::info!(breaker = %json, "breaker state"),
            Err(error) => tracing::warn!(%error, "could not encode breaker snapshot"),
        }
    }
    tracing::info!(
        events = events.event_count().await,
        reservations = inventory.reservation_count(),
        payments = payment.payment_count(),
        shipments = shipping.shipment_count(),
        "demo finished"
    );

    println!("{}", metrics_handle.render());
}
