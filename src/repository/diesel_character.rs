//! Diesel-based character frequency repository for SQLite.

use diesel::prelude::*;

use super::diesel_models::{CharacterRecord, NewCharacterRecord};
use super::diesel_pool::{run_blocking, SqlitePool};
use super::LastInsertRowId;
use crate::models::{CharFrequency, NewCharFrequency};
use crate::schema::characters;

/// Call ids per `IN (...)` query; keeps well under SQLite's bound-parameter limit.
const CALL_ID_CHUNK: usize = 500;

#[derive(Clone)]
pub struct DieselCharacterRepository {
    pool: SqlitePool,
}

impl DieselCharacterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn insert(
        &self,
        record: NewCharFrequency,
    ) -> Result<CharFrequency, diesel::result::Error> {
        let row = NewCharacterRecord::from(&record);
        let pool = self.pool.clone();

        let id = run_blocking(pool, move |conn| {
            diesel::insert_into(characters::table)
                .values(&row)
                .execute(conn)?;

            diesel::sql_query("SELECT last_insert_rowid() AS id")
                .get_result::<LastInsertRowId>(conn)
                .map(|r| r.id)
        })
        .await?;

        Ok(record.into_frequency(id))
    }

    /// Sum of all recorded frequencies across the store's lifetime.
    pub async fn total_frequency(&self) -> Result<u64, diesel::result::Error> {
        let pool = self.pool.clone();

        run_blocking(pool, move |conn| {
            diesel::sql_query("SELECT COALESCE(SUM(freq), 0) AS total FROM characters")
                .get_result::<FrequencyTotal>(conn)
                .map(|row| row.total.max(0) as u64)
        })
        .await
    }

    /// Get frequencies for a set of calls.
    pub async fn get_by_calls(
        &self,
        call_ids: &[i64],
    ) -> Result<Vec<CharFrequency>, diesel::result::Error> {
        if call_ids.is_empty() {
            return Ok(Vec::new());
        }
        let call_ids = call_ids.to_vec();
        let pool = self.pool.clone();

        run_blocking(pool, move |conn| {
            let mut records = Vec::new();
            for chunk in call_ids.chunks(CALL_ID_CHUNK) {
                let rows = characters::table
                    .filter(characters::call_id.eq_any(chunk.to_vec()))
                    .load::<CharacterRecord>(conn)?;
                records.extend(rows);
            }
            Ok(records)
        })
        .await
        .map(|records| records.into_iter().map(CharFrequency::from).collect())
    }

    pub async fn get_by_call(&self, call_id: i64) -> Result<Vec<CharFrequency>, diesel::result::Error> {
        let pool = self.pool.clone();

        run_blocking(pool, move |conn| {
            characters::table
                .filter(characters::call_id.eq(call_id))
                .order(characters::ch.asc())
                .load::<CharacterRecord>(conn)
        })
        .await
        .map(|records| records.into_iter().map(CharFrequency::from).collect())
    }
}

#[derive(diesel::QueryableByName)]
struct FrequencyTotal {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    total: i64,
}
