use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use interview_core::model::{
    CandidateIdentity, Session, SessionId, SessionStatus, Slot, StateError,
};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a session.
///
/// This mirrors the domain `Session` so repositories can serialize and
/// rehydrate without leaking storage concerns into the domain layer.
/// Rehydration goes through `Session::from_persisted`, which re-validates
/// the aggregate invariants.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub id: SessionId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub resume_text: String,
    pub status: SessionStatus,
    pub current_slot_index: usize,
    pub slots: Vec<Slot>,
    pub total_score: u32,
    pub summary: String,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    #[must_use]
    pub fn from_session(session: &Session) -> Self {
        let identity = session.identity();
        Self {
            id: session.id(),
            name: identity.name.clone(),
            email: identity.email.clone(),
            phone: identity.phone.clone(),
            resume_text: identity.resume_text.clone(),
            status: session.status(),
            current_slot_index: session.current_slot_index(),
            slots: session.slots().to_vec(),
            total_score: session.total_score(),
            summary: session.summary().to_string(),
            created_at: session.created_at(),
            completed_at: session.completed_at(),
        }
    }

    /// Convert the record back into a domain `Session`.
    ///
    /// # Errors
    ///
    /// Returns `StateError::InvalidPersistedState` if the stored fields
    /// violate a session invariant.
    pub fn into_session(self) -> Result<Session, StateError> {
        let identity = CandidateIdentity {
            name: self.name,
            email: self.email,
            phone: self.phone,
            resume_text: self.resume_text,
        };
        Session::from_persisted(
            self.id,
            identity,
            self.status,
            self.current_slot_index,
            self.slots,
            self.total_score,
            self.summary,
            self.created_at,
            self.completed_at,
        )
    }
}

/// Repository contract for the session store: a durable slot holding at most
/// one in-progress session, plus the collection of completed sessions keyed
/// by id.
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Fetch the in-progress session, if one was persisted.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails or the stored state is
    /// corrupt.
    async fn get_in_progress(&self) -> Result<Option<Session>, StorageError>;

    /// Replace the in-progress slot: `Some` stores a snapshot, `None` clears
    /// it. The write must be atomic with respect to concurrent reads.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn set_in_progress(&self, session: Option<&Session>) -> Result<(), StorageError>;

    /// Insert or replace a completed session, keyed by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the write fails.
    async fn save_completed(&self, session: &Session) -> Result<(), StorageError>;

    /// All completed sessions, most recently completed first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the read fails.
    async fn list_completed(&self) -> Result<Vec<Session>, StorageError>;

    /// Fetch one completed session by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_completed(&self, id: SessionId) -> Result<Session, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    in_progress: Arc<Mutex<Option<Session>>>,
    completed: Arc<Mutex<Vec<Session>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_err<T>(e: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl SessionRepository for InMemoryRepository {
    async fn get_in_progress(&self) -> Result<Option<Session>, StorageError> {
        let guard = self.in_progress.lock().map_err(lock_err)?;
        Ok(guard.clone())
    }

    async fn set_in_progress(&self, session: Option<&Session>) -> Result<(), StorageError> {
        let mut guard = self.in_progress.lock().map_err(lock_err)?;
        *guard = session.cloned();
        Ok(())
    }

    async fn save_completed(&self, session: &Session) -> Result<(), StorageError> {
        let mut guard = self.completed.lock().map_err(lock_err)?;
        match guard.iter_mut().find(|s| s.id() == session.id()) {
            Some(existing) => *existing = session.clone(),
            None => guard.push(session.clone()),
        }
        Ok(())
    }

    async fn list_completed(&self) -> Result<Vec<Session>, StorageError> {
        let guard = self.completed.lock().map_err(lock_err)?;
        let mut sessions = guard.clone();
        sessions.sort_by_key(|s| std::cmp::Reverse(s.completed_at()));
        Ok(sessions)
    }

    async fn get_completed(&self, id: SessionId) -> Result<Session, StorageError> {
        let guard = self.completed.lock().map_err(lock_err)?;
        guard
            .iter()
            .find(|s| s.id() == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }
}

/// Aggregates the session repository behind a trait object so backends can
/// be swapped without touching services.
#[derive(Clone)]
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            sessions: Arc::new(InMemoryRepository::new()),
        }
    }
}
