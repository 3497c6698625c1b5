use std::sync::Arc;

use interview_core::model::{CandidateIdentity, Session, Slot, StateError};
use interview_core::Clock;
use storage::repository::SessionRepository;

use crate::error::InterviewError;

/// Owner of the single in-progress session.
///
/// Every mutation goes through the in-memory `Session` first and is then
/// written back to the repository, so a crash at any point resumes from the
/// last recorded slot rather than from scratch.
pub struct SessionLifecycle {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    current: Option<Session>,
}

impl SessionLifecycle {
    pub fn new(clock: Clock, sessions: Arc<dyn SessionRepository>) -> Self {
        Self {
            clock,
            sessions,
            current: None,
        }
    }

    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    #[must_use]
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn has_session(&self) -> bool {
        self.current.is_some()
    }

    /// Loads the persisted in-progress session, if any, into memory.
    ///
    /// # Errors
    ///
    /// Returns `InterviewError::Storage` when the repository read fails.
    pub async fn load(&mut self) -> Result<Option<&Session>, InterviewError> {
        self.current = self.sessions.get_in_progress().await?;
        Ok(self.current.as_ref())
    }

    /// Creates a new in-progress session for the candidate.
    ///
    /// # Errors
    ///
    /// Returns `StateError::SessionAlreadyInProgress` when a session is
    /// already loaded, or `InterviewError::Storage` when persistence fails.
    pub async fn create(
        &mut self,
        identity: CandidateIdentity,
    ) -> Result<&Session, InterviewError> {
        if self.current.is_some() {
            return Err(StateError::SessionAlreadyInProgress.into());
        }
        let session = Session::new(identity, self.clock.now());
        self.sessions.set_in_progress(Some(&session)).await?;
        Ok(self.current.insert(session))
    }

    /// Records an issued question on the current slot and persists the
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NoSessionInProgress` without a session, any
    /// `StateError` the session rejects the slot with, or
    /// `InterviewError::Storage` when persistence fails.
    pub async fn record_question(&mut self, slot: Slot) -> Result<(), InterviewError> {
        let session = self
            .current
            .as_mut()
            .ok_or(StateError::NoSessionInProgress)?;
        session.record_question(slot)?;
        self.sessions.set_in_progress(Some(session)).await?;
        Ok(())
    }

    /// Records an answer with its score and feedback, then persists.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NoSessionInProgress` without a session, any
    /// `StateError` from the session, or `InterviewError::Storage` when
    /// persistence fails.
    pub async fn record_answer(
        &mut self,
        slot_index: usize,
        answer: impl Into<String>,
        score: u32,
        feedback: impl Into<String>,
    ) -> Result<(), InterviewError> {
        let session = self
            .current
            .as_mut()
            .ok_or(StateError::NoSessionInProgress)?;
        session.record_answer(slot_index, answer, score, feedback)?;
        self.sessions.set_in_progress(Some(session)).await?;
        Ok(())
    }

    /// Completes the current session: moves it into the completed
    /// collection and clears the in-progress slot. Returns the completed
    /// session.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NoSessionInProgress` without a session,
    /// `StateError::SessionIncomplete` while answers are missing, or
    /// `InterviewError::Storage` when persistence fails.
    pub async fn complete(
        &mut self,
        summary: impl Into<String>,
    ) -> Result<Session, InterviewError> {
        let mut session = self
            .current
            .take()
            .ok_or(StateError::NoSessionInProgress)?;
        if let Err(err) = self.finish(&mut session, summary.into()).await {
            // Keep the session live so the caller can retry or abandon.
            self.current = Some(session);
            return Err(err);
        }
        Ok(session)
    }

    async fn finish(
        &mut self,
        session: &mut Session,
        summary: String,
    ) -> Result<(), InterviewError> {
        session.complete(summary, self.clock.now())?;
        self.sessions.save_completed(session).await?;
        self.sessions.set_in_progress(None).await?;
        Ok(())
    }

    /// Discards the current session entirely. Nothing of it survives in the
    /// completed collection.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NoSessionInProgress` without a session, or
    /// `InterviewError::Storage` when clearing persistence fails.
    pub async fn abandon_and_reset(&mut self) -> Result<(), InterviewError> {
        if self.current.is_none() {
            return Err(StateError::NoSessionInProgress.into());
        }
        self.sessions.set_in_progress(None).await?;
        self.current = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use interview_core::model::{SessionStatus, Slot};
    use interview_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    fn identity() -> CandidateIdentity {
        CandidateIdentity {
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "+1 555 0100".into(),
            resume_text: "mathematics, analytical engines".into(),
        }
    }

    fn lifecycle() -> SessionLifecycle {
        SessionLifecycle::new(fixed_clock(), Arc::new(InMemoryRepository::new()))
    }

    #[tokio::test]
    async fn create_rejects_a_second_session() {
        let mut lifecycle = lifecycle();
        lifecycle.create(identity()).await.unwrap();

        let err = lifecycle.create(identity()).await.unwrap_err();
        assert!(matches!(
            err,
            InterviewError::State(StateError::SessionAlreadyInProgress)
        ));
    }

    #[tokio::test]
    async fn mutations_without_a_session_fail_loudly() {
        let mut lifecycle = lifecycle();

        let err = lifecycle
            .record_answer(0, "answer", 5, "fine")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            InterviewError::State(StateError::NoSessionInProgress)
        ));
        assert!(matches!(
            lifecycle.abandon_and_reset().await.unwrap_err(),
            InterviewError::State(StateError::NoSessionInProgress)
        ));
    }

    #[tokio::test]
    async fn every_mutation_is_persisted() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut lifecycle = SessionLifecycle::new(fixed_clock(), repo.clone());

        lifecycle.create(identity()).await.unwrap();
        let slot = Slot::issued(0, "What is ownership?").unwrap();
        lifecycle.record_question(slot).await.unwrap();
        lifecycle
            .record_answer(0, "Move semantics", 7, "Solid")
            .await
            .unwrap();

        let stored = repo.get_in_progress().await.unwrap().unwrap();
        assert_eq!(stored.current_slot_index(), 1);
        assert_eq!(stored.total_score(), 7);
        assert_eq!(stored.slots()[0].answer, "Move semantics");
    }

    #[tokio::test]
    async fn load_restores_the_stored_session() {
        let repo = Arc::new(InMemoryRepository::new());
        {
            let mut lifecycle = SessionLifecycle::new(fixed_clock(), repo.clone());
            lifecycle.create(identity()).await.unwrap();
            let slot = Slot::issued(0, "What is ownership?").unwrap();
            lifecycle.record_question(slot).await.unwrap();
        }

        let mut restarted = SessionLifecycle::new(fixed_clock(), repo);
        let restored = restarted.load().await.unwrap().unwrap();
        assert_eq!(restored.slots().len(), 1);
        assert_eq!(restored.current_slot_index(), 0);
    }

    #[tokio::test]
    async fn complete_moves_the_session_and_clears_in_progress() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut lifecycle = SessionLifecycle::new(fixed_clock(), repo.clone());
        lifecycle.create(identity()).await.unwrap();
        for index in 0..6 {
            let slot = Slot::issued(index, format!("Question {}", index + 1)).unwrap();
            lifecycle.record_question(slot).await.unwrap();
            lifecycle
                .record_answer(index, "answer", 1, "ok")
                .await
                .unwrap();
        }

        let completed = lifecycle.complete("Strong candidate.").await.unwrap();
        assert_eq!(completed.status(), SessionStatus::Completed);
        assert!(!lifecycle.has_session());
        assert!(repo.get_in_progress().await.unwrap().is_none());
        assert_eq!(repo.list_completed().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn abandon_discards_without_a_trace() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut lifecycle = SessionLifecycle::new(fixed_clock(), repo.clone());
        lifecycle.create(identity()).await.unwrap();
        lifecycle.abandon_and_reset().await.unwrap();

        assert!(repo.get_in_progress().await.unwrap().is_none());
        assert!(repo.list_completed().await.unwrap().is_empty());
    }
}
