//! Shared error types for the services crate.

use thiserror::Error;

use interview_core::model::StateError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Failures on the collaborator boundary: extraction, question generation,
/// evaluation or summarization. Always treated as recoverable; how each call
/// site recovers is its own policy.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CollaboratorError {
    #[error("collaborator request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("collaborator rejected the request: {0}")]
    Rejected(String),

    #[error("collaborator returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Errors emitted by the session services.
///
/// `State` variants are wiring bugs and should fail loudly; `Collaborator`
/// and `Storage` are environmental and surfaced to the operator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InterviewError {
    #[error(transparent)]
    State(#[from] StateError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
