//! Diesel-based longest-line repository for SQLite.

use diesel::prelude::*;

use super::diesel_models::{LineRecord, NewLineRecord};
use super::diesel_pool::{run_blocking, SqlitePool};
use crate::models::LongestLine;
use crate::schema::lines;

#[derive(Clone)]
pub struct DieselLineRepository {
    pool: SqlitePool,
}

impl DieselLineRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the longest-line record for a source URL.
    pub async fn get(&self, url: &str) -> Result<Option<LongestLine>, diesel::result::Error> {
        let url = url.to_string();
        let pool = self.pool.clone();

        run_blocking(pool, move |conn| {
            lines::table
                .filter(lines::url.eq(&url))
                .first::<LineRecord>(conn)
                .optional()
        })
        .await
        .map(|opt| opt.map(LongestLine::from))
    }

    /// Insert unless the URL already has a record (`UNIQUE(url)`).
    /// Returns whether a row was written.
    pub async fn insert_if_absent(
        &self,
        url: &str,
        longest_length: u64,
    ) -> Result<bool, diesel::result::Error> {
        let url = url.to_string();
        let pool = self.pool.clone();

        run_blocking(pool, move |conn| {
            let rows = diesel::insert_or_ignore_into(lines::table)
                .values(NewLineRecord {
                    url: &url,
                    longest_length: longest_length as i64,
                })
                .execute(conn)?;
            Ok(rows > 0)
        })
        .await
    }

    pub async fn get_all(&self) -> Result<Vec<LongestLine>, diesel::result::Error> {
        let pool = self.pool.clone();

        run_blocking(pool, move |conn| {
            lines::table.order(lines::url.asc()).load::<LineRecord>(conn)
        })
        .await
        .map(|records| records.into_iter().map(LongestLine::from).collect())
    }
}
