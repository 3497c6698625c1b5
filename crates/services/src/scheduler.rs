use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use interview_core::model::{
    CandidateIdentity, Difficulty, Session, Slot, StateError, SLOT_COUNT, SLOT_PLAN,
};
use interview_core::Clock;
use storage::repository::SessionRepository;

use crate::collaborator::Collaborator;
use crate::error::InterviewError;
use crate::ledger::{AnswerLedger, RecordedAnswer};
use crate::lifecycle::SessionLifecycle;

/// Summary used when the collaborator has nothing to say or fails.
pub const DEFAULT_SUMMARY: &str = "Interview completed successfully.";

/// Pause between showing feedback for one slot and issuing the next
/// question.
pub const INTER_QUESTION_DELAY: Duration = Duration::from_secs(2);

/// Opaque handle tying an expiry notification to the countdown it was armed
/// for. A ticket from a countdown that has since been cancelled or replaced
/// is stale and its expiry is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownTicket(u64);

#[derive(Debug)]
struct Countdown {
    slot_index: usize,
    deadline: DateTime<Utc>,
    generation: u64,
}

/// Everything the front end needs to present the current question.
#[derive(Debug, Clone)]
pub struct ActiveQuestion {
    pub slot_index: usize,
    /// 1-based position shown to the candidate.
    pub question_number: u32,
    pub question: String,
    pub difficulty: Difficulty,
    pub max_score: u32,
    pub time_limit_secs: u32,
    pub deadline: DateTime<Utc>,
    pub ticket: CountdownTicket,
}

/// A finished interview, ready for display.
#[derive(Debug, Clone)]
pub struct CompletedInterview {
    pub session: Session,
}

impl CompletedInterview {
    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.session.total_score()
    }

    #[must_use]
    pub fn percentage(&self) -> u32 {
        self.session.score_percentage()
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        self.session.summary()
    }
}

/// What happens after a slot is recorded.
#[derive(Debug)]
pub enum NextStep {
    /// More slots remain; wait `delay` before requesting the next question.
    NextSlot { delay: Duration },
    Finished(CompletedInterview),
}

/// The recorded slot plus where the interview goes next.
#[derive(Debug)]
pub struct SlotOutcome {
    pub recorded: RecordedAnswer,
    pub next: NextStep,
}

/// Result of checking storage for an interrupted interview.
#[derive(Debug)]
pub enum ResumeOutcome {
    /// No stored session; start fresh.
    Fresh,
    /// Picked up mid-interview at the returned question.
    Resumed(ActiveQuestion),
    /// The stored session already had every answer; it was completed on the
    /// spot.
    Finished(CompletedInterview),
}

/// Drives one interview end to end: issues questions in the fixed slot
/// order, arms a countdown per question, and routes both submissions and
/// expirations through the ledger so each slot is recorded exactly once.
pub struct QuestionScheduler {
    lifecycle: SessionLifecycle,
    collaborator: Arc<dyn Collaborator>,
    ledger: AnswerLedger<dyn Collaborator>,
    countdown: Option<Countdown>,
    next_generation: u64,
}

impl QuestionScheduler {
    pub fn new(
        clock: Clock,
        sessions: Arc<dyn SessionRepository>,
        collaborator: Arc<dyn Collaborator>,
    ) -> Self {
        Self {
            lifecycle: SessionLifecycle::new(clock, sessions),
            collaborator: collaborator.clone(),
            ledger: AnswerLedger::new(collaborator),
            countdown: None,
            next_generation: 1,
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.lifecycle.current()
    }

    /// Deadline of the armed countdown, if one is live.
    #[must_use]
    pub fn active_deadline(&self) -> Option<DateTime<Utc>> {
        self.countdown.as_ref().map(|c| c.deadline)
    }

    /// Creates a session for the candidate and issues the first question.
    ///
    /// # Errors
    ///
    /// Returns `StateError::SessionAlreadyInProgress` when one is live,
    /// `InterviewError::Collaborator` when question generation fails (retry
    /// with another `next_question` call), or `InterviewError::Storage`.
    pub async fn begin(
        &mut self,
        identity: CandidateIdentity,
    ) -> Result<ActiveQuestion, InterviewError> {
        self.lifecycle.create(identity).await?;
        self.next_question().await
    }

    /// Loads any persisted in-progress session and puts the interview back
    /// where it left off.
    ///
    /// An already-issued question is reasked as-is with a fresh countdown; a
    /// session interrupted between its last answer and completion is
    /// completed immediately.
    ///
    /// # Errors
    ///
    /// Returns `InterviewError::Collaborator` when a question had to be
    /// generated and the call failed, or `InterviewError::Storage`.
    pub async fn resume(&mut self) -> Result<ResumeOutcome, InterviewError> {
        let Some(session) = self.lifecycle.load().await? else {
            return Ok(ResumeOutcome::Fresh);
        };
        if session.all_slots_answered() {
            tracing::info!(id = %session.id(), "stored session fully answered, completing");
            let completed = self.finish_interview().await?;
            return Ok(ResumeOutcome::Finished(completed));
        }
        let question = self.next_question().await?;
        Ok(ResumeOutcome::Resumed(question))
    }

    /// Issues (or re-issues) the question for the current slot and arms its
    /// countdown.
    ///
    /// On a generation failure no state changes; calling again retries the
    /// same slot.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NoSessionInProgress` without a session,
    /// `StateError::SlotSequenceFull` when all slots are answered,
    /// `InterviewError::Collaborator` on generation failure, or
    /// `InterviewError::Storage`.
    pub async fn next_question(&mut self) -> Result<ActiveQuestion, InterviewError> {
        let session = self
            .lifecycle
            .current()
            .ok_or(StateError::NoSessionInProgress)?;
        let slot_index = session.current_slot_index();
        if slot_index >= SLOT_COUNT {
            return Err(StateError::SlotSequenceFull { len: SLOT_COUNT }.into());
        }

        let question = if let Some(slot) = session.slots().get(slot_index) {
            // Already issued before an interruption; ask the same question.
            slot.question.clone()
        } else {
            let config = &SLOT_PLAN[slot_index];
            let question = self
                .collaborator
                .generate_question(
                    config.difficulty,
                    question_number(slot_index),
                    &session.previous_questions(),
                    &session.identity().resume_text,
                )
                .await?;
            let slot = Slot::issued(slot_index, question.clone())
                .ok_or(StateError::SlotSequenceFull { len: SLOT_COUNT })?;
            self.lifecycle.record_question(slot).await?;
            question
        };

        let config = &SLOT_PLAN[slot_index];
        let (deadline, ticket) = self.arm_countdown(slot_index, config.time_limit_secs);
        Ok(ActiveQuestion {
            slot_index,
            question_number: question_number(slot_index),
            question,
            difficulty: config.difficulty,
            max_score: config.max_score,
            time_limit_secs: config.time_limit_secs,
            deadline,
            ticket,
        })
    }

    /// Records the candidate's answer for the active question and cancels
    /// its countdown. A later expiry for that countdown is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `StateError::QuestionNotIssued` when no countdown is armed,
    /// any `StateError` from the session, or `InterviewError::Storage`.
    pub async fn submit_answer(
        &mut self,
        raw_answer: &str,
    ) -> Result<SlotOutcome, InterviewError> {
        let countdown = self.countdown.take().ok_or_else(|| {
            let index = self
                .lifecycle
                .current()
                .map_or(0, Session::current_slot_index);
            StateError::QuestionNotIssued { index }
        })?;
        tracing::debug!(slot_index = countdown.slot_index, "answer submitted");
        self.record_and_advance(raw_answer).await
    }

    /// Handles a countdown expiry.
    ///
    /// Returns `Ok(None)` when the ticket is stale, meaning the slot was
    /// already resolved by a submission that won the race; exactly one of
    /// the two paths records the slot.
    ///
    /// # Errors
    ///
    /// Returns `StateError` from the session or `InterviewError::Storage`.
    pub async fn handle_expiry(
        &mut self,
        ticket: CountdownTicket,
    ) -> Result<Option<SlotOutcome>, InterviewError> {
        match &self.countdown {
            Some(countdown) if countdown.generation == ticket.0 => {}
            _ => {
                tracing::debug!(ticket = ticket.0, "stale expiry ignored");
                return Ok(None);
            }
        }
        let countdown = self.countdown.take();
        if let Some(countdown) = countdown {
            tracing::info!(slot_index = countdown.slot_index, "time expired");
        }
        self.record_and_advance("").await.map(Some)
    }

    /// Discards the live interview and disarms any countdown.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NoSessionInProgress` without a session, or
    /// `InterviewError::Storage`.
    pub async fn abandon(&mut self) -> Result<(), InterviewError> {
        self.lifecycle.abandon_and_reset().await?;
        self.countdown = None;
        Ok(())
    }

    /// Declines a stored interview without reattaching to it: loads the
    /// persisted session and abandons it in one step.
    ///
    /// # Errors
    ///
    /// Returns `StateError::NoSessionInProgress` when nothing is stored, or
    /// `InterviewError::Storage`.
    pub async fn discard_stored(&mut self) -> Result<(), InterviewError> {
        if self.lifecycle.load().await?.is_none() {
            return Err(StateError::NoSessionInProgress.into());
        }
        self.abandon().await
    }

    async fn record_and_advance(
        &mut self,
        raw_answer: &str,
    ) -> Result<SlotOutcome, InterviewError> {
        let recorded = self.ledger.submit(&mut self.lifecycle, raw_answer).await?;
        let next = if self
            .lifecycle
            .current()
            .is_some_and(Session::all_slots_answered)
        {
            NextStep::Finished(self.finish_interview().await?)
        } else {
            NextStep::NextSlot {
                delay: INTER_QUESTION_DELAY,
            }
        };
        Ok(SlotOutcome { recorded, next })
    }

    async fn finish_interview(&mut self) -> Result<CompletedInterview, InterviewError> {
        let summary = {
            let session = self
                .lifecycle
                .current()
                .ok_or(StateError::NoSessionInProgress)?;
            match self
                .collaborator
                .generate_summary(
                    &session.identity().name,
                    session.slots(),
                    session.total_score(),
                )
                .await
            {
                Ok(Some(summary)) => summary,
                Ok(None) => DEFAULT_SUMMARY.to_string(),
                Err(err) => {
                    tracing::warn!(error = %err, "summary generation failed, using default");
                    DEFAULT_SUMMARY.to_string()
                }
            }
        };
        let session = self.lifecycle.complete(summary).await?;
        self.countdown = None;
        Ok(CompletedInterview { session })
    }

    fn arm_countdown(
        &mut self,
        slot_index: usize,
        time_limit_secs: u32,
    ) -> (DateTime<Utc>, CountdownTicket) {
        let generation = self.next_generation;
        self.next_generation += 1;
        let deadline = self.lifecycle.clock().deadline_in_secs(time_limit_secs);
        self.countdown = Some(Countdown {
            slot_index,
            deadline,
            generation,
        });
        (deadline, CountdownTicket(generation))
    }
}

fn question_number(slot_index: usize) -> u32 {
    u32::try_from(slot_index).unwrap_or(0) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_numbers_are_one_based() {
        assert_eq!(question_number(0), 1);
        assert_eq!(question_number(5), 6);
    }

    #[test]
    fn tickets_from_different_generations_differ() {
        assert_ne!(CountdownTicket(1), CountdownTicket(2));
    }
}
