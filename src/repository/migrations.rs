//! Idempotent schema setup for the SQLite store.

use diesel::connection::SimpleConnection;

use super::diesel_pool::{run_blocking, DieselError, SqlitePool};

const SCHEMA: &str = r#"
    -- One row per fetch attempt, including failed ones
    CREATE TABLE IF NOT EXISTS calls (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        salvo_no INTEGER NOT NULL,
        req_no INTEGER NOT NULL,
        status INTEGER NOT NULL,
        req_start INTEGER NOT NULL,
        res_finish INTEGER NOT NULL,
        attempt_no INTEGER NOT NULL,
        char_count INTEGER NOT NULL DEFAULT 0
    );

    -- Character distribution per successful call
    CREATE TABLE IF NOT EXISTS characters (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        call_id INTEGER NOT NULL REFERENCES calls(id),
        ch TEXT NOT NULL,
        freq INTEGER NOT NULL
    );

    -- First-write-wins longest line per source
    CREATE TABLE IF NOT EXISTS lines (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        url TEXT NOT NULL UNIQUE,
        longest_length INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_calls_salvo
        ON calls(salvo_no, attempt_no);
    CREATE INDEX IF NOT EXISTS idx_characters_call
        ON characters(call_id);
"#;

/// Create all tables and indexes if they do not exist yet.
pub async fn run_migrations(pool: SqlitePool) -> Result<(), DieselError> {
    run_blocking(pool, |conn| conn.batch_execute(SCHEMA)).await
}
