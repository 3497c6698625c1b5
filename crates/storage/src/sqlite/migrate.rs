use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs the consolidated migration for the current schema version.
///
/// Creates the session store: a `sessions` table shared by completed and
/// in-progress sessions, a `slots` table for the per-question records, and a
/// partial unique index that enforces the at-most-one-in-progress invariant
/// at the database level.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS sessions (
                    id TEXT PRIMARY KEY,
                    status TEXT NOT NULL CHECK (status IN ('in-progress', 'completed')),
                    name TEXT NOT NULL,
                    email TEXT NOT NULL,
                    phone TEXT NOT NULL,
                    resume_text TEXT NOT NULL,
                    current_slot_index INTEGER NOT NULL
                        CHECK (current_slot_index BETWEEN 0 AND 6),
                    total_score INTEGER NOT NULL CHECK (total_score >= 0),
                    summary TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    completed_at TEXT
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS slots (
                    session_id TEXT NOT NULL,
                    slot_index INTEGER NOT NULL CHECK (slot_index BETWEEN 0 AND 5),
                    question TEXT NOT NULL,
                    answer TEXT NOT NULL,
                    difficulty TEXT NOT NULL CHECK (difficulty IN ('easy', 'medium', 'hard')),
                    score INTEGER NOT NULL CHECK (score >= 0),
                    max_score INTEGER NOT NULL CHECK (max_score > 0),
                    feedback TEXT NOT NULL,
                    time_limit_secs INTEGER NOT NULL CHECK (time_limit_secs > 0),
                    PRIMARY KEY (session_id, slot_index),
                    FOREIGN KEY (session_id) REFERENCES sessions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // At most one in-progress session, enforced by the store itself.
        sqlx::query(
            r"
                CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_single_in_progress
                    ON sessions(status) WHERE status = 'in-progress';
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_sessions_status_completed_at
                    ON sessions(status, completed_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
