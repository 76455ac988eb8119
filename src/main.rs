use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use delivery_service::api::{start_api_server, ApiState};
use delivery_service::config::Config;
use delivery_service::delivery::{spawn_sweeper, Correlator};
use delivery_service::health::HealthCheckable;
use delivery_service::messaging::{create_consumer, run_consumer, DeliveryListener, RedpandaClient};
use delivery_service::metrics::Metrics;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Override with RUST_LOG, e.g. RUST_LOG=debug
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,delivery_service=debug"))
        )
        .init();

    let config = Config::parse();
    tracing::info!(?config, "🚀 Starting delivery service");

    // === 1. Metrics ===
    let metrics = Arc::new(Metrics::new()?);

    // === 2. Outbound producer (circuit breaker + retry) ===
    let redpanda = Arc::new(RedpandaClient::new(&config.brokers, metrics.clone())?);

    // === 3. Correlator owns the per-order state ===
    let correlator = Arc::new(Correlator::new(
        redpanda.clone(),
        metrics.clone(),
        config.ready_emission.into(),
    ));

    // === 4. Inbound consumers ===
    let listener = Arc::new(DeliveryListener::new(correlator.clone(), metrics.clone()));
    let settings = config.consumer_settings();
    for worker in 0..config.consumer_workers.max(1) {
        let consumer = create_consumer(&settings)?;
        tokio::spawn(run_consumer(worker, consumer, listener.clone()));
    }

    // === 5. Optional TTL eviction ===
    let sweeper = config
        .order_ttl()
        .map(|ttl| spawn_sweeper(correlator.clone(), ttl, config.sweep_interval()));

    // === 6. HTTP: manual delivery, health, metrics ===
    let state = ApiState {
        correlator,
        metrics,
        health_checks: vec![redpanda as Arc<dyn HealthCheckable>],
    };
    let served = start_api_server(state, config.http_port).await;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    tracing::info!("👋 Delivery service stopped");

    served.map_err(Into::into)
}
