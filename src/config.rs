use clap::{Parser, ValueEnum};
use std::time::Duration;

use crate::delivery::ReadyEmission;
use crate::messaging::ConsumerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmissionArg {
    /// Announce readiness once per order
    Once,
    /// Announce readiness on every fact that finds the order ready
    EveryJoin,
}

impl From<EmissionArg> for ReadyEmission {
    fn from(arg: EmissionArg) -> Self {
        match arg {
            EmissionArg::Once => ReadyEmission::Once,
            EmissionArg::EveryJoin => ReadyEmission::EveryJoin,
        }
    }
}

/// Joins "item prepared" and "payment completed" events into delivery notifications
#[derive(Debug, Clone, Parser)]
#[command(name = "delivery-service", version)]
pub struct Config {
    /// Comma-separated bootstrap servers
    #[arg(long, env = "DELIVERY_BROKERS", default_value = "127.0.0.1:9092")]
    pub brokers: String,

    #[arg(long, env = "DELIVERY_GROUP_ID", default_value = "delivery-service")]
    pub group_id: String,

    #[arg(long, env = "DELIVERY_AUTO_OFFSET_RESET", default_value = "earliest")]
    pub auto_offset_reset: String,

    /// Consumers in the group, one task each
    #[arg(long, env = "DELIVERY_CONSUMER_WORKERS", default_value_t = 1)]
    pub consumer_workers: usize,

    #[arg(long, env = "DELIVERY_HTTP_PORT", default_value_t = 8080)]
    pub http_port: u16,

    #[arg(long, env = "DELIVERY_READY_EMISSION", value_enum, default_value_t = EmissionArg::Once)]
    pub ready_emission: EmissionArg,

    /// Drop undelivered orders older than this many seconds; 0 keeps them forever
    #[arg(long, env = "DELIVERY_ORDER_TTL_SECS", default_value_t = 0)]
    pub order_ttl_secs: u64,

    #[arg(long, env = "DELIVERY_SWEEP_INTERVAL_SECS", default_value_t = 60)]
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn consumer_settings(&self) -> ConsumerSettings {
        ConsumerSettings {
            brokers: self.brokers.clone(),
            group_id: self.group_id.clone(),
            auto_offset_reset: self.auto_offset_reset.clone(),
        }
    }

    pub fn order_ttl(&self) -> Option<Duration> {
        (self.order_ttl_secs > 0).then(|| Duration::from_secs(self.order_ttl_secs))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}
