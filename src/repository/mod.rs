//! SQLite persistence via Diesel.
//!
//! Each table gets its own repository; [`DieselStore`] bundles them behind
//! the [`Store`] trait.

pub mod diesel_call;
pub mod diesel_character;
pub mod diesel_line;
pub mod diesel_models;
pub mod diesel_pool;
pub mod migrations;

pub use diesel_call::DieselCallRepository;
pub use diesel_character::DieselCharacterRepository;
pub use diesel_line::DieselLineRepository;
pub use diesel_pool::{create_diesel_pool, create_diesel_pool_from_url, run_blocking, SqlitePool};

use async_trait::async_trait;

use crate::models::{Call, CharFrequency, LongestLine, NewCall, NewCharFrequency};
use crate::store::{Store, StoreResult};

#[derive(diesel::QueryableByName)]
pub(crate) struct LastInsertRowId {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub(crate) id: i64,
}

/// SQLite-backed [`Store`].
#[derive(Clone)]
pub struct DieselStore {
    calls: DieselCallRepository,
    characters: DieselCharacterRepository,
    lines: DieselLineRepository,
}

impl DieselStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            calls: DieselCallRepository::new(pool.clone()),
            characters: DieselCharacterRepository::new(pool.clone()),
            lines: DieselLineRepository::new(pool),
        }
    }
}

#[async_trait]
impl Store for DieselStore {
    async fn insert_call(&self, call: NewCall) -> StoreResult<Call> {
        Ok(self.calls.insert(call).await?)
    }

    async fn calls_for_salvo(&self, salvo_no: i64) -> StoreResult<Vec<Call>> {
        Ok(self.calls.get_by_salvo(salvo_no).await?)
    }

    async fn count_retries(&self, salvo_no: i64) -> StoreResult<u64> {
        Ok(self.calls.count_retries(salvo_no).await?)
    }

    async fn call_ids_for_salvo(&self, salvo_no: i64) -> StoreResult<Vec<i64>> {
        Ok(self.calls.ids_by_salvo(salvo_no).await?)
    }

    async fn max_salvo_no(&self) -> StoreResult<Option<i64>> {
        Ok(self.calls.max_salvo_no().await?)
    }

    async fn insert_char_frequency(
        &self,
        record: NewCharFrequency,
    ) -> StoreResult<CharFrequency> {
        Ok(self.characters.insert(record).await?)
    }

    async fn total_char_frequency(&self) -> StoreResult<u64> {
        Ok(self.characters.total_frequency().await?)
    }

    async fn frequencies_for_calls(&self, call_ids: &[i64]) -> StoreResult<Vec<CharFrequency>> {
        Ok(self.characters.get_by_calls(call_ids).await?)
    }

    async fn frequencies_for_call(&self, call_id: i64) -> StoreResult<Vec<CharFrequency>> {
        Ok(self.characters.get_by_call(call_id).await?)
    }

    async fn longest_line_for(&self, url: &str) -> StoreResult<Option<LongestLine>> {
        Ok(self.lines.get(url).await?)
    }

    async fn insert_longest_line(&self, url: &str, longest_length: u64) -> StoreResult<bool> {
        Ok(self.lines.insert_if_absent(url, longest_length).await?)
    }

    async fn longest_lines(&self) -> StoreResult<Vec<LongestLine>> {
        Ok(self.lines.get_all().await?)
    }
}
