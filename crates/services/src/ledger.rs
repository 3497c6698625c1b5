use interview_core::model::{Slot, NO_ANSWER_PLACEHOLDER};

use crate::collaborator::{Collaborator, Evaluation};
use crate::error::{CollaboratorError, InterviewError};
use crate::lifecycle::SessionLifecycle;

/// Feedback recorded when the evaluator returns none.
pub const NO_FEEDBACK: &str = "No feedback";

/// What the ledger recorded for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAnswer {
    pub slot_index: usize,
    pub answer: String,
    pub score: u32,
    pub feedback: String,
}

/// Turns raw answer text into exactly one recorded slot.
///
/// Evaluation failures never stall the interview: the slot is recorded with
/// score 0 and an explanatory feedback line, and the session advances.
pub struct AnswerLedger<C: Collaborator + ?Sized> {
    collaborator: std::sync::Arc<C>,
}

impl<C: Collaborator + ?Sized> AnswerLedger<C> {
    pub fn new(collaborator: std::sync::Arc<C>) -> Self {
        Self { collaborator }
    }

    /// Evaluates `raw_answer` against the current slot's question and records
    /// the result on the session.
    ///
    /// An empty answer (timer expiry with nothing typed) is substituted
    /// with the placeholder text before evaluation.
    ///
    /// # Errors
    ///
    /// Returns `StateError` when the session rejects the write, or
    /// `InterviewError::Storage` when persisting it fails. Collaborator
    /// failures are absorbed, not returned.
    pub async fn submit(
        &self,
        lifecycle: &mut SessionLifecycle,
        raw_answer: &str,
    ) -> Result<RecordedAnswer, InterviewError> {
        let (slot_index, slot) = current_slot(lifecycle)?;
        let question = slot.question.clone();
        let difficulty = slot.difficulty;
        let max_score = slot.max_score;

        // The placeholder goes through evaluation like any other answer.
        let answer = if raw_answer.is_empty() {
            NO_ANSWER_PLACEHOLDER.to_string()
        } else {
            raw_answer.to_string()
        };

        let (score, feedback) = match self
            .collaborator
            .evaluate_answer(&question, &answer, difficulty)
            .await
        {
            Ok(evaluation) => apply_defaults(evaluation, max_score, slot_index),
            Err(err) => {
                tracing::warn!(slot_index, error = %err, "evaluation failed, recording zero");
                (0, evaluation_failure_feedback(&err))
            }
        };

        lifecycle
            .record_answer(slot_index, answer.clone(), score, feedback.clone())
            .await?;

        Ok(RecordedAnswer {
            slot_index,
            answer,
            score,
            feedback,
        })
    }
}

fn current_slot(
    lifecycle: &SessionLifecycle,
) -> Result<(usize, Slot), InterviewError> {
    use interview_core::model::StateError;

    let session = lifecycle
        .current()
        .ok_or(StateError::NoSessionInProgress)?;
    let index = session.current_slot_index();
    let slot = session
        .slots()
        .get(index)
        .cloned()
        .ok_or(StateError::QuestionNotIssued { index })?;
    Ok((index, slot))
}

fn apply_defaults(evaluation: Evaluation, max_score: u32, slot_index: usize) -> (u32, String) {
    let mut score = evaluation.score.unwrap_or(0);
    if score > max_score {
        tracing::warn!(slot_index, score, max_score, "clamping out-of-range score");
        score = max_score;
    }
    let feedback = evaluation
        .feedback
        .filter(|f| !f.is_empty())
        .unwrap_or_else(|| NO_FEEDBACK.to_string());
    (score, feedback)
}

fn evaluation_failure_feedback(err: &CollaboratorError) -> String {
    format!("Evaluation unavailable: {err}")
}
