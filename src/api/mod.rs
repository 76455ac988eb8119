// HTTP surface: manual delivery trigger, health, Prometheus scrape
mod server;

pub use server::{routes, start_api_server, ApiState};
