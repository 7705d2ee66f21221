//! pastesalvo: fires salvos of paste fetches with retries and timeouts,
//! records per-call telemetry and character analytics, and aggregates
//! them into per-salvo statistics.

pub mod analysis;
pub mod client;
pub mod config;
pub mod fetch;
pub mod models;
pub mod repository;
pub mod schema;
pub mod server;
pub mod sources;
pub mod stats;
pub mod store;

pub use config::{load_settings, Settings};
pub use fetch::{FetchEngine, FetchError, FetchEvent};
pub use stats::{SalvoStats, StatsAggregator};
pub use store::{open_store, Store, StoreError};
