use std::sync::Arc;

use interview_core::model::SLOT_COUNT;
use storage::repository::{SessionRepository, Storage};

use crate::collaborator::Collaborator;
use crate::error::AppServicesError;
use crate::scheduler::QuestionScheduler;
use crate::Clock;

/// Details for the welcome-back prompt shown when an interrupted interview
/// is found in storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePrompt {
    pub candidate_name: String,
    pub answered: usize,
    pub slot_count: usize,
}

/// Assembles the interview services over a storage backend and a
/// collaborator.
#[derive(Clone)]
pub struct AppServices {
    clock: Clock,
    sessions: Arc<dyn SessionRepository>,
    collaborator: Arc<dyn Collaborator>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        collaborator: Arc<dyn Collaborator>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self {
            clock,
            sessions: storage.sessions,
            collaborator,
        })
    }

    /// Build services over in-memory storage.
    #[must_use]
    pub fn in_memory(clock: Clock, collaborator: Arc<dyn Collaborator>) -> Self {
        let storage = Storage::in_memory();
        Self {
            clock,
            sessions: storage.sessions,
            collaborator,
        }
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<dyn SessionRepository> {
        Arc::clone(&self.sessions)
    }

    /// A fresh scheduler over the shared storage and collaborator. The
    /// scheduler owns the live session; hold exactly one at a time.
    #[must_use]
    pub fn scheduler(&self) -> QuestionScheduler {
        QuestionScheduler::new(
            self.clock,
            Arc::clone(&self.sessions),
            Arc::clone(&self.collaborator),
        )
    }

    /// Checks storage for an interrupted interview worth prompting about.
    ///
    /// A stored session with every slot already answered is not prompted
    /// for; resuming completes it without candidate input.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::Storage` when the read fails.
    pub async fn detect_resumable(&self) -> Result<Option<ResumePrompt>, AppServicesError> {
        let Some(session) = self.sessions.get_in_progress().await? else {
            return Ok(None);
        };
        if session.all_slots_answered() {
            return Ok(None);
        }
        Ok(Some(ResumePrompt {
            candidate_name: session.identity().name.clone(),
            answered: session.answered_count(),
            slot_count: SLOT_COUNT,
        }))
    }
}
