use sqlx::Row;

use interview_core::model::{Difficulty, SessionId, SessionStatus, Slot};

use crate::repository::{SessionRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn usize_from_i64(field: &'static str, v: i64) -> Result<usize, StorageError> {
    usize::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_slot_row(row: &sqlx::sqlite::SqliteRow) -> Result<Slot, StorageError> {
    let difficulty =
        Difficulty::parse(&row.try_get::<String, _>("difficulty").map_err(ser)?).map_err(ser)?;

    Ok(Slot {
        question: row.try_get("question").map_err(ser)?,
        answer: row.try_get("answer").map_err(ser)?,
        difficulty,
        score: u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?,
        max_score: u32_from_i64("max_score", row.try_get::<i64, _>("max_score").map_err(ser)?)?,
        feedback: row.try_get("feedback").map_err(ser)?,
        time_limit_secs: u32_from_i64(
            "time_limit_secs",
            row.try_get::<i64, _>("time_limit_secs").map_err(ser)?,
        )?,
    })
}

pub(crate) fn map_session_row(
    row: &sqlx::sqlite::SqliteRow,
    slots: Vec<Slot>,
) -> Result<SessionRecord, StorageError> {
    let id: SessionId = row
        .try_get::<String, _>("id")
        .map_err(ser)?
        .parse()
        .map_err(ser)?;
    let status = SessionStatus::parse(&row.try_get::<String, _>("status").map_err(ser)?)
        .map_err(ser)?;

    Ok(SessionRecord {
        id,
        name: row.try_get("name").map_err(ser)?,
        email: row.try_get("email").map_err(ser)?,
        phone: row.try_get("phone").map_err(ser)?,
        resume_text: row.try_get("resume_text").map_err(ser)?,
        status,
        current_slot_index: usize_from_i64(
            "current_slot_index",
            row.try_get::<i64, _>("current_slot_index").map_err(ser)?,
        )?,
        slots,
        total_score: u32_from_i64(
            "total_score",
            row.try_get::<i64, _>("total_score").map_err(ser)?,
        )?,
        summary: row.try_get("summary").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
        completed_at: row.try_get("completed_at").map_err(ser)?,
    })
}
