pub mod api;
pub mod config;
pub mod delivery;
pub mod health;
pub mod messaging;
pub mod metrics;
pub mod models;
pub mod utils;
