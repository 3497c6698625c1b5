use async_trait::async_trait;

use interview_core::model::{Difficulty, ExtractedFields, Slot};

use crate::error::CollaboratorError;

/// Raw resume document handed to the extraction collaborator.
#[derive(Debug, Clone)]
pub struct ResumeDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Evaluation result for one answer. Both fields are optional on the wire;
/// the ledger applies the documented defaults when they are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub score: Option<u32>,
    pub feedback: Option<String>,
}

/// The external AI/document service boundary.
///
/// All four calls are request/response and transport-agnostic; the session
/// core never depends on how questions or scores are produced. Implementors
/// must be cheap to share behind an `Arc`.
#[async_trait]
pub trait Collaborator: Send + Sync {
    /// Extract identity fields and resume text from an uploaded document.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError` on transport or service failure. The
    /// caller surfaces this with a retry invitation; no session state is
    /// touched.
    async fn extract_identity(
        &self,
        document: &ResumeDocument,
    ) -> Result<ExtractedFields, CollaboratorError>;

    /// Generate the question for the given 1-based `question_number`.
    ///
    /// `previous_questions` carries everything already asked this session so
    /// the service can avoid repeats; `resume_text` lets it personalize.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError` on failure; the slot is not created and
    /// the same slot index may be retried.
    async fn generate_question(
        &self,
        difficulty: Difficulty,
        question_number: u32,
        previous_questions: &[String],
        resume_text: &str,
    ) -> Result<String, CollaboratorError>;

    /// Score one answer against its question.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError` on failure; the ledger absorbs it and
    /// records the slot with score 0 so the session still progresses.
    async fn evaluate_answer(
        &self,
        question: &str,
        answer: &str,
        difficulty: Difficulty,
    ) -> Result<Evaluation, CollaboratorError>;

    /// Produce the final interview summary. `Ok(None)` means the service had
    /// nothing to say; the caller substitutes the default summary.
    ///
    /// # Errors
    ///
    /// Returns `CollaboratorError` on failure; completion absorbs it with
    /// the default summary.
    async fn generate_summary(
        &self,
        candidate_name: &str,
        slots: &[Slot],
        total_score: u32,
    ) -> Result<Option<String>, CollaboratorError>;
}
