use std::sync::Arc;
use std::time::Duration;

use super::correlator::Correlator;

/// Periodically drops orders older than `ttl`. Runs until the task is aborted.
pub fn spawn_sweeper(correlator: Arc<Correlator>, ttl: Duration, every: Duration) -> tokio::task::JoinHandle<()> {
    tracing::info!(
        ttl_secs = ttl.as_secs(),
        interval_secs = every.as_secs(),
        "Starting undelivered-order sweeper"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            sweep_once(&correlator, ttl);
        }
    })
}

pub fn sweep_once(correlator: &Correlator, ttl: Duration) -> usize {
    let ttl = match chrono::Duration::from_std(ttl) {
        Ok(ttl) => ttl,
        Err(e) => {
            tracing::error!(error = %e, "Order TTL out of range, skipping sweep");
            return 0;
        }
    };

    let evicted = correlator.evict_older_than(chrono::Utc::now() - ttl);
    if evicted > 0 {
        tracing::info!(evicted, remaining = correlator.store().len(), "Sweep evicted stale orders");
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::ReadyEmission;
    use crate::messaging::InMemoryPublisher;
    use crate::metrics::Metrics;

    #[tokio::test]
    async fn test_sweep_once_evicts_only_stale_orders() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let correlator = Correlator::new(Arc::new(InMemoryPublisher::new()), metrics.clone(), ReadyEmission::Once);

        correlator.store().update("stale", |state| {
            state.record_payment();
            state.created_at = chrono::Utc::now() - chrono::Duration::minutes(10);
        });
        correlator.store().update("fresh", |state| state.record_payment());

        let evicted = sweep_once(&correlator, Duration::from_secs(60));

        assert_eq!(evicted, 1);
        assert!(correlator.store().get("stale").is_none());
        assert!(correlator.store().get("fresh").is_some());
        assert_eq!(metrics.evicted_orders.get(), 1);
        assert_eq!(metrics.tracked_orders.get(), 1);
    }

    #[tokio::test]
    async fn test_spawned_sweeper_sweeps_on_first_tick() {
        let correlator = Arc::new(Correlator::new(
            Arc::new(InMemoryPublisher::new()),
            Arc::new(Metrics::new().unwrap()),
            ReadyEmission::Once,
        ));
        correlator.store().update("stale", |state| {
            state.created_at = chrono::Utc::now() - chrono::Duration::hours(1);
        });

        let handle = spawn_sweeper(correlator.clone(), Duration::from_secs(60), Duration::from_secs(5));
        // first tick of an interval fires immediately
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(correlator.store().is_empty());
    }
}
