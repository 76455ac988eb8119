use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

// ============================================================================
// Metrics Module - Prometheus metrics for the delivery join
// ============================================================================
//
// Covers:
// - Inbound facts received and rejected
// - Ready / delivered notifications and publish failures
// - Orders currently tracked and orders evicted by TTL
// - Producer circuit breaker state
//
// Scraped via GET /metrics on the API server.
// ============================================================================

pub struct Metrics {
    registry: Registry,

    // Inbound
    pub events_received: IntCounterVec,
    pub decode_failures: IntCounterVec,

    // Outbound
    pub ready_published: IntCounter,
    pub delivered: IntCounter,
    pub not_ready: IntCounter,
    pub publish_failures: IntCounterVec,

    // Store
    pub tracked_orders: IntGauge,
    pub evicted_orders: IntCounter,

    // Broker
    pub circuit_breaker_state: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let events_received = IntCounterVec::new(
            Opts::new("delivery_events_received_total", "Inbound facts recorded"),
            &["kind"],
        )?;
        registry.register(Box::new(events_received.clone()))?;

        let decode_failures = IntCounterVec::new(
            Opts::new("delivery_decode_failures_total", "Inbound messages that failed to decode"),
            &["kind"],
        )?;
        registry.register(Box::new(decode_failures.clone()))?;

        let ready_published = IntCounter::new(
            "delivery_ready_published_total",
            "Ready-for-delivery notifications published",
        )?;
        registry.register(Box::new(ready_published.clone()))?;

        let delivered = IntCounter::new("delivery_delivered_total", "Orders delivered")?;
        registry.register(Box::new(delivered.clone()))?;

        let not_ready = IntCounter::new(
            "delivery_not_ready_total",
            "Manual deliveries rejected because the order was not ready",
        )?;
        registry.register(Box::new(not_ready.clone()))?;

        let publish_failures = IntCounterVec::new(
            Opts::new("delivery_publish_failures_total", "Outbound publishes that failed"),
            &["topic"],
        )?;
        registry.register(Box::new(publish_failures.clone()))?;

        let tracked_orders = IntGauge::new("delivery_tracked_orders", "Orders currently held in memory")?;
        registry.register(Box::new(tracked_orders.clone()))?;

        let evicted_orders = IntCounter::new(
            "delivery_evicted_orders_total",
            "Undelivered orders dropped by TTL eviction",
        )?;
        registry.register(Box::new(evicted_orders.clone()))?;

        let circuit_breaker_state = IntGauge::new(
            "delivery_circuit_breaker_state",
            "Producer circuit breaker state (0=Closed, 1=Open, 2=HalfOpen)",
        )?;
        registry.register(Box::new(circuit_breaker_state.clone()))?;

        Ok(Self {
            registry,
            events_received,
            decode_failures,
            ready_published,
            delivered,
            not_ready,
            publish_failures,
            tracked_orders,
            evicted_orders,
            circuit_breaker_state,
        })
    }

    /// Get the Prometheus registry for exposing metrics via HTTP
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_received(&self, kind: &str) {
        self.events_received.with_label_values(&[kind]).inc();
    }

    pub fn record_decode_failure(&self, kind: &str) {
        self.decode_failures.with_label_values(&[kind]).inc();
    }

    pub fn record_publish_failure(&self, topic: &str) {
        self.publish_failures.with_label_values(&[topic]).inc();
    }

    pub fn set_tracked_orders(&self, count: usize) {
        self.tracked_orders.set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn update_circuit_breaker_state(&self, state: u8) {
        self.circuit_breaker_state.set(i64::from(state));
    }
}
