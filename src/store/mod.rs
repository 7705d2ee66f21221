//! Storage abstraction for calls, character frequencies and longest lines.
//!
//! Two backends implement [`Store`]: the SQLite-backed
//! [`DieselStore`](crate::repository::DieselStore) and the in-process
//! [`MemoryStore`]. Everything past this boundary works with the typed
//! records in [`crate::models`].

mod memory;

pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::{Settings, StoreBackend};
use crate::models::{Call, CharFrequency, LongestLine, NewCall, NewCharFrequency};
use crate::repository::{self, DieselStore};

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Append-mostly document store: inserts, filtered finds and counts.
#[async_trait]
pub trait Store: Send + Sync {
    /// Insert a call record and return it with its assigned id.
    async fn insert_call(&self, call: NewCall) -> StoreResult<Call>;

    /// All calls belonging to a salvo.
    async fn calls_for_salvo(&self, salvo_no: i64) -> StoreResult<Vec<Call>>;

    /// Number of calls in a salvo with `attempt_no > 1`.
    async fn count_retries(&self, salvo_no: i64) -> StoreResult<u64>;

    async fn call_ids_for_salvo(&self, salvo_no: i64) -> StoreResult<Vec<i64>>;

    /// Highest salvo number recorded so far, if any.
    async fn max_salvo_no(&self) -> StoreResult<Option<i64>>;

    async fn insert_char_frequency(&self, record: NewCharFrequency)
        -> StoreResult<CharFrequency>;

    /// Sum of every frequency ever recorded.
    async fn total_char_frequency(&self) -> StoreResult<u64>;

    async fn frequencies_for_calls(&self, call_ids: &[i64]) -> StoreResult<Vec<CharFrequency>>;

    async fn frequencies_for_call(&self, call_id: i64) -> StoreResult<Vec<CharFrequency>>;

    async fn longest_line_for(&self, url: &str) -> StoreResult<Option<LongestLine>>;

    /// Insert a longest-line record unless one exists for `url`.
    /// Returns `false` when an existing record was left in place.
    async fn insert_longest_line(&self, url: &str, longest_length: u64) -> StoreResult<bool>;

    async fn longest_lines(&self) -> StoreResult<Vec<LongestLine>>;
}

/// Open the store selected by `settings.store_backend`.
pub async fn open_store(settings: &Settings) -> StoreResult<Arc<dyn Store>> {
    match settings.store_backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            settings
                .ensure_directories()
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let db_path = settings.database_path();
            info!("Using SQLite store at {}", db_path.display());

            let pool = repository::create_diesel_pool(&db_path)
                .map_err(|e| StoreError::Pool(e.to_string()))?;
            repository::migrations::run_migrations(pool.clone()).await?;
            Ok(Arc::new(DieselStore::new(pool)))
        }
    }
}
