use interview_core::model::{Session, SessionId, SessionStatus, Slot};
use sqlx::{Sqlite, Transaction};

use super::SqliteRepository;
use super::mapping::{map_session_row, map_slot_row, ser};
use crate::repository::{SessionRecord, SessionRepository, StorageError};

fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

async fn insert_session(
    tx: &mut Transaction<'_, Sqlite>,
    record: &SessionRecord,
) -> Result<(), StorageError> {
    sqlx::query(
        r"
            INSERT INTO sessions (
                id, status, name, email, phone, resume_text,
                current_slot_index, total_score, summary, created_at, completed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ",
    )
    .bind(record.id.to_string())
    .bind(record.status.as_str())
    .bind(&record.name)
    .bind(&record.email)
    .bind(&record.phone)
    .bind(&record.resume_text)
    .bind(i64::try_from(record.current_slot_index).map_err(ser)?)
    .bind(i64::from(record.total_score))
    .bind(&record.summary)
    .bind(record.created_at)
    .bind(record.completed_at)
    .execute(&mut **tx)
    .await
    .map_err(conn)?;

    for (slot_index, slot) in record.slots.iter().enumerate() {
        insert_slot(tx, record.id, slot_index, slot).await?;
    }

    Ok(())
}

async fn insert_slot(
    tx: &mut Transaction<'_, Sqlite>,
    session_id: SessionId,
    slot_index: usize,
    slot: &Slot,
) -> Result<(), StorageError> {
    sqlx::query(
        r"
            INSERT INTO slots (
                session_id, slot_index, question, answer, difficulty,
                score, max_score, feedback, time_limit_secs
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ",
    )
    .bind(session_id.to_string())
    .bind(i64::try_from(slot_index).map_err(ser)?)
    .bind(&slot.question)
    .bind(&slot.answer)
    .bind(slot.difficulty.as_str())
    .bind(i64::from(slot.score))
    .bind(i64::from(slot.max_score))
    .bind(&slot.feedback)
    .bind(i64::from(slot.time_limit_secs))
    .execute(&mut **tx)
    .await
    .map_err(conn)?;
    Ok(())
}

impl SqliteRepository {
    async fn fetch_slots(&self, session_id: SessionId) -> Result<Vec<Slot>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT question, answer, difficulty, score, max_score,
                       feedback, time_limit_secs
                FROM slots
                WHERE session_id = ?1
                ORDER BY slot_index ASC
            ",
        )
        .bind(session_id.to_string())
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        let mut slots = Vec::with_capacity(rows.len());
        for row in rows {
            slots.push(map_slot_row(&row)?);
        }
        Ok(slots)
    }

    async fn fetch_session(
        &self,
        row: sqlx::sqlite::SqliteRow,
    ) -> Result<Session, StorageError> {
        let id: SessionId = sqlx::Row::try_get::<String, _>(&row, "id")
            .map_err(ser)?
            .parse()
            .map_err(ser)?;
        let slots = self.fetch_slots(id).await?;
        map_session_row(&row, slots)?.into_session().map_err(ser)
    }
}

#[async_trait::async_trait]
impl SessionRepository for SqliteRepository {
    async fn get_in_progress(&self) -> Result<Option<Session>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, status, name, email, phone, resume_text,
                       current_slot_index, total_score, summary, created_at, completed_at
                FROM sessions
                WHERE status = 'in-progress'
            ",
        )
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?;

        match row {
            Some(row) => Ok(Some(self.fetch_session(row).await?)),
            None => Ok(None),
        }
    }

    async fn set_in_progress(&self, session: Option<&Session>) -> Result<(), StorageError> {
        let mut tx = self.pool().begin().await.map_err(conn)?;

        // The singleton slot is replaced wholesale; slot rows go with the
        // session via the cascade.
        sqlx::query("DELETE FROM sessions WHERE status = 'in-progress'")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        if let Some(session) = session {
            if session.status() != SessionStatus::InProgress {
                return Err(StorageError::Serialization(
                    "in-progress slot only accepts in-progress sessions".into(),
                ));
            }
            let record = SessionRecord::from_session(session);
            insert_session(&mut tx, &record).await?;
        }

        tx.commit().await.map_err(conn)
    }

    async fn save_completed(&self, session: &Session) -> Result<(), StorageError> {
        if session.status() != SessionStatus::Completed {
            return Err(StorageError::Serialization(
                "completed collection only accepts completed sessions".into(),
            ));
        }

        let mut tx = self.pool().begin().await.map_err(conn)?;

        // Replace-or-append keyed by id: re-completing the same session must
        // not leave a duplicate row.
        sqlx::query("DELETE FROM sessions WHERE id = ?1")
            .bind(session.id().to_string())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        let record = SessionRecord::from_session(session);
        insert_session(&mut tx, &record).await?;

        tx.commit().await.map_err(conn)
    }

    async fn list_completed(&self) -> Result<Vec<Session>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, status, name, email, phone, resume_text,
                       current_slot_index, total_score, summary, created_at, completed_at
                FROM sessions
                WHERE status = 'completed'
                ORDER BY completed_at DESC, id ASC
            ",
        )
        .fetch_all(self.pool())
        .await
        .map_err(conn)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in rows {
            sessions.push(self.fetch_session(row).await?);
        }
        Ok(sessions)
    }

    async fn get_completed(&self, id: SessionId) -> Result<Session, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, status, name, email, phone, resume_text,
                       current_slot_index, total_score, summary, created_at, completed_at
                FROM sessions
                WHERE id = ?1 AND status = 'completed'
            ",
        )
        .bind(id.to_string())
        .fetch_optional(self.pool())
        .await
        .map_err(conn)?
        .ok_or(StorageError::NotFound)?;

        self.fetch_session(row).await
    }
}
