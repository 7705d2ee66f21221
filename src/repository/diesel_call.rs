//! Diesel-based call telemetry repository for SQLite.

use diesel::prelude::*;

use super::diesel_models::{CallRecord, NewCallRecord};
use super::diesel_pool::{run_blocking, SqlitePool};
use super::LastInsertRowId;
use crate::models::{Call, NewCall};
use crate::schema::calls;

/// Diesel-based call repository with compile-time query checking.
#[derive(Clone)]
pub struct DieselCallRepository {
    pool: SqlitePool,
}

impl DieselCallRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a call and return it with its row id.
    pub async fn insert(&self, call: NewCall) -> Result<Call, diesel::result::Error> {
        let record = NewCallRecord::from(&call);
        let pool = self.pool.clone();

        let id = run_blocking(pool, move |conn| {
            diesel::insert_into(calls::table)
                .values(&record)
                .execute(conn)?;

            diesel::sql_query("SELECT last_insert_rowid() AS id")
                .get_result::<LastInsertRowId>(conn)
                .map(|r| r.id)
        })
        .await?;

        Ok(call.into_call(id))
    }

    /// Get all calls for a salvo, oldest first.
    pub async fn get_by_salvo(&self, salvo_no: i64) -> Result<Vec<Call>, diesel::result::Error> {
        let pool = self.pool.clone();

        run_blocking(pool, move |conn| {
            calls::table
                .filter(calls::salvo_no.eq(salvo_no))
                .order(calls::id.asc())
                .load::<CallRecord>(conn)
        })
        .await
        .map(|records| records.into_iter().map(Call::from).collect())
    }

    /// Get just the ids of a salvo's calls.
    pub async fn ids_by_salvo(&self, salvo_no: i64) -> Result<Vec<i64>, diesel::result::Error> {
        let pool = self.pool.clone();

        run_blocking(pool, move |conn| {
            calls::table
                .filter(calls::salvo_no.eq(salvo_no))
                .select(calls::id)
                .order(calls::id.asc())
                .load::<i64>(conn)
        })
        .await
    }

    /// Count retried attempts (attempt_no > 1) in a salvo.
    pub async fn count_retries(&self, salvo_no: i64) -> Result<u64, diesel::result::Error> {
        let pool = self.pool.clone();

        run_blocking(pool, move |conn| {
            use diesel::dsl::count_star;
            let count: i64 = calls::table
                .filter(calls::salvo_no.eq(salvo_no))
                .filter(calls::attempt_no.gt(1))
                .select(count_star())
                .first(conn)?;
            Ok(count as u64)
        })
        .await
    }

    /// Highest salvo number on record.
    pub async fn max_salvo_no(&self) -> Result<Option<i64>, diesel::result::Error> {
        let pool = self.pool.clone();

        run_blocking(pool, move |conn| {
            calls::table
                .select(calls::salvo_no)
                .order(calls::salvo_no.desc())
                .first::<i64>(conn)
                .optional()
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::diesel_pool::create_diesel_pool_from_url;
    use crate::repository::migrations::run_migrations;
    use tempfile::tempdir;

    async fn setup_test_db() -> (SqlitePool, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let pool = create_diesel_pool_from_url(&db_path.display().to_string()).unwrap();
        run_migrations(pool.clone()).await.unwrap();
        (pool, dir)
    }

    fn new_call(salvo_no: i64, req_no: i64, attempt_no: u32) -> NewCall {
        NewCall {
            salvo_no,
            req_no,
            status: 200,
            req_start: 10_000,
            res_finish: 10_250,
            attempt_no,
            char_count: 42,
        }
    }

    #[tokio::test]
    async fn test_insert_and_load_by_salvo() {
        let (pool, _dir) = setup_test_db().await;
        let repo = DieselCallRepository::new(pool);

        let first = repo.insert(new_call(1, 0, 1)).await.unwrap();
        let second = repo.insert(new_call(1, 1, 1)).await.unwrap();
        repo.insert(new_call(2, 0, 1)).await.unwrap();
        assert!(second.id > first.id);

        let salvo = repo.get_by_salvo(1).await.unwrap();
        assert_eq!(salvo.len(), 2);
        assert_eq!(salvo[0], first);
        assert_eq!(salvo[0].duration_ms(), 250);

        assert_eq!(repo.ids_by_salvo(1).await.unwrap(), vec![first.id, second.id]);
    }

    #[tokio::test]
    async fn test_count_retries_is_salvo_scoped() {
        let (pool, _dir) = setup_test_db().await;
        let repo = DieselCallRepository::new(pool);

        repo.insert(new_call(1, 0, 1)).await.unwrap();
        repo.insert(new_call(1, 0, 2)).await.unwrap();
        repo.insert(new_call(1, 0, 3)).await.unwrap();
        repo.insert(new_call(2, 0, 2)).await.unwrap();

        assert_eq!(repo.count_retries(1).await.unwrap(), 2);
        assert_eq!(repo.count_retries(2).await.unwrap(), 1);
        assert_eq!(repo.count_retries(3).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_max_salvo_no() {
        let (pool, _dir) = setup_test_db().await;
        let repo = DieselCallRepository::new(pool);

        assert_eq!(repo.max_salvo_no().await.unwrap(), None);
        repo.insert(new_call(4, 0, 1)).await.unwrap();
        repo.insert(new_call(2, 0, 1)).await.unwrap();
        assert_eq!(repo.max_salvo_no().await.unwrap(), Some(4));
    }
}
