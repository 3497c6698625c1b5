use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::identity::CandidateIdentity;
use crate::model::ids::SessionId;
use crate::model::slot::{score_percentage, Slot, SLOT_COUNT, SLOT_PLAN};

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Illegal lifecycle transitions. These indicate wiring bugs in the caller,
/// not recoverable runtime conditions, so they carry enough context to debug.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StateError {
    #[error("a session is already in progress")]
    SessionAlreadyInProgress,

    #[error("no session is in progress")]
    NoSessionInProgress,

    #[error("session is already completed")]
    SessionAlreadyCompleted,

    #[error("all {len} question slots have already been issued")]
    SlotSequenceFull { len: usize },

    #[error("slot {index} already has an unanswered question")]
    QuestionAlreadyIssued { index: usize },

    #[error("no question has been issued for slot {index}")]
    QuestionNotIssued { index: usize },

    #[error("answer for slot {index} rejected; current slot is {expected}")]
    SlotOutOfOrder { expected: usize, index: usize },

    #[error("score {score} exceeds slot maximum {max_score}")]
    ScoreExceedsMax { score: u32, max_score: u32 },

    #[error("session has only {answered} of {SLOT_COUNT} answers recorded")]
    SessionIncomplete { answered: usize },

    #[error("invalid persisted session state: {0}")]
    InvalidPersistedState(String),
}

//
// ─── STATUS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    #[serde(rename = "in-progress")]
    InProgress,
    #[serde(rename = "completed")]
    Completed,
}

impl SessionStatus {
    /// Storage representation of the status.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in-progress",
            SessionStatus::Completed => "completed",
        }
    }

    /// Parses the storage representation.
    ///
    /// # Errors
    ///
    /// Returns `StateError::InvalidPersistedState` for unknown values.
    pub fn parse(value: &str) -> Result<Self, StateError> {
        match value {
            "in-progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            other => Err(StateError::InvalidPersistedState(format!(
                "unknown status: {other}"
            ))),
        }
    }
}

//
// ─── SESSION ──────────────────────────────────────────────────────────────────
//

/// One full interview attempt for one candidate: the aggregate root.
///
/// All mutation goes through `record_question`, `record_answer` and
/// `complete`; nothing else may touch a slot after it is created. That funnel
/// is what keeps `total_score` and `current_slot_index` consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    identity: CandidateIdentity,
    status: SessionStatus,
    current_slot_index: usize,
    slots: Vec<Slot>,
    total_score: u32,
    summary: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Starts a fresh in-progress session for the given candidate.
    #[must_use]
    pub fn new(identity: CandidateIdentity, created_at: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::generate(),
            identity,
            status: SessionStatus::InProgress,
            current_slot_index: 0,
            slots: Vec::new(),
            total_score: 0,
            summary: String::new(),
            created_at,
            completed_at: None,
        }
    }

    /// Appends the next issued question slot.
    ///
    /// # Errors
    ///
    /// Returns `StateError::SessionAlreadyCompleted` after completion,
    /// `StateError::SlotSequenceFull` when all slots are issued, and
    /// `StateError::QuestionAlreadyIssued` when the current slot is still
    /// waiting for an answer.
    pub fn record_question(&mut self, slot: Slot) -> Result<(), StateError> {
        if self.status == SessionStatus::Completed {
            return Err(StateError::SessionAlreadyCompleted);
        }
        if self.slots.len() >= SLOT_COUNT {
            return Err(StateError::SlotSequenceFull {
                len: self.slots.len(),
            });
        }
        if self.slots.len() > self.current_slot_index {
            return Err(StateError::QuestionAlreadyIssued {
                index: self.current_slot_index,
            });
        }
        self.slots.push(slot);
        Ok(())
    }

    /// Records the scored answer for the current slot and advances.
    ///
    /// This is the single mutation path for slots: it writes answer, score
    /// and feedback, folds the score into `total_score`, and bumps
    /// `current_slot_index` by one, all together.
    ///
    /// # Errors
    ///
    /// Returns `StateError::SlotOutOfOrder` unless `slot_index` is exactly
    /// the current slot, `StateError::QuestionNotIssued` when the slot has no
    /// question yet, and `StateError::ScoreExceedsMax` when the score is out
    /// of range for the slot.
    pub fn record_answer(
        &mut self,
        slot_index: usize,
        answer: impl Into<String>,
        score: u32,
        feedback: impl Into<String>,
    ) -> Result<(), StateError> {
        if self.status == SessionStatus::Completed {
            return Err(StateError::SessionAlreadyCompleted);
        }
        if slot_index != self.current_slot_index {
            return Err(StateError::SlotOutOfOrder {
                expected: self.current_slot_index,
                index: slot_index,
            });
        }
        let Some(slot) = self.slots.get_mut(slot_index) else {
            return Err(StateError::QuestionNotIssued { index: slot_index });
        };
        if score > slot.max_score {
            return Err(StateError::ScoreExceedsMax {
                score,
                max_score: slot.max_score,
            });
        }

        slot.answer = answer.into();
        slot.score = score;
        slot.feedback = feedback.into();
        self.total_score += score;
        self.current_slot_index += 1;
        Ok(())
    }

    /// Marks the session completed once all slots are answered.
    ///
    /// # Errors
    ///
    /// Returns `StateError::SessionIncomplete` while answers are missing and
    /// `StateError::SessionAlreadyCompleted` on a second call.
    pub fn complete(
        &mut self,
        summary: impl Into<String>,
        completed_at: DateTime<Utc>,
    ) -> Result<(), StateError> {
        if self.status == SessionStatus::Completed {
            return Err(StateError::SessionAlreadyCompleted);
        }
        if self.current_slot_index < SLOT_COUNT {
            return Err(StateError::SessionIncomplete {
                answered: self.current_slot_index,
            });
        }
        self.status = SessionStatus::Completed;
        self.summary = summary.into();
        self.completed_at = Some(completed_at);
        Ok(())
    }

    /// Rehydrates a session from storage, re-validating every invariant the
    /// mutation methods normally maintain.
    ///
    /// # Errors
    ///
    /// Returns `StateError::InvalidPersistedState` describing the first
    /// violated invariant.
    #[allow(clippy::too_many_arguments)]
    pub fn from_persisted(
        id: SessionId,
        identity: CandidateIdentity,
        status: SessionStatus,
        current_slot_index: usize,
        slots: Vec<Slot>,
        total_score: u32,
        summary: String,
        created_at: DateTime<Utc>,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, StateError> {
        let invalid = |msg: String| Err(StateError::InvalidPersistedState(msg));

        if slots.len() > SLOT_COUNT {
            return invalid(format!(
                "{} slots exceed the plan of {SLOT_COUNT}",
                slots.len()
            ));
        }
        if current_slot_index > slots.len() {
            return invalid(format!(
                "current slot {current_slot_index} beyond issued slots {}",
                slots.len()
            ));
        }
        for (index, slot) in slots.iter().enumerate() {
            let config = SLOT_PLAN[index];
            if slot.max_score != config.max_score
                || slot.time_limit_secs != config.time_limit_secs
                || slot.difficulty != config.difficulty
            {
                return invalid(format!("slot {index} does not match the fixed plan"));
            }
            if slot.score > slot.max_score {
                return invalid(format!("slot {index} score exceeds its maximum"));
            }
        }
        let answered_sum: u32 = slots[..current_slot_index].iter().map(|s| s.score).sum();
        if answered_sum != total_score {
            return invalid(format!(
                "total score {total_score} does not match answered slots ({answered_sum})"
            ));
        }
        match status {
            SessionStatus::Completed => {
                if current_slot_index < SLOT_COUNT {
                    return invalid(format!(
                        "completed session with only {current_slot_index} answers"
                    ));
                }
                if completed_at.is_none() {
                    return invalid("completed session without a completion time".into());
                }
            }
            SessionStatus::InProgress => {
                if completed_at.is_some() {
                    return invalid("in-progress session with a completion time".into());
                }
            }
        }

        Ok(Self {
            id,
            identity,
            status,
            current_slot_index,
            slots,
            total_score,
            summary,
            created_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn identity(&self) -> &CandidateIdentity {
        &self.identity
    }

    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    #[must_use]
    pub fn current_slot_index(&self) -> usize {
        self.current_slot_index
    }

    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    #[must_use]
    pub fn total_score(&self) -> u32 {
        self.total_score
    }

    #[must_use]
    pub fn score_percentage(&self) -> u32 {
        score_percentage(self.total_score)
    }

    #[must_use]
    pub fn summary(&self) -> &str {
        &self.summary
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Number of slots that have a recorded answer.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.current_slot_index
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed
    }

    /// True when every plan slot has an answer but `complete` has not run.
    #[must_use]
    pub fn all_slots_answered(&self) -> bool {
        self.current_slot_index >= SLOT_COUNT
    }

    /// Text of every question issued so far, oldest first. Passed back to
    /// the question collaborator so it can avoid repeats.
    #[must_use]
    pub fn previous_questions(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.question.clone()).collect()
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn identity() -> CandidateIdentity {
        CandidateIdentity {
            name: "Ana".into(),
            email: "ana@example.com".into(),
            phone: "+1-555-0100".into(),
            resume_text: "resume".into(),
        }
    }

    fn answered_session(scores: [u32; SLOT_COUNT]) -> Session {
        let mut session = Session::new(identity(), fixed_now());
        for (index, score) in scores.into_iter().enumerate() {
            session
                .record_question(Slot::issued(index, format!("Q{index}")).unwrap())
                .unwrap();
            session
                .record_answer(index, format!("A{index}"), score, "ok")
                .unwrap();
        }
        session
    }

    #[test]
    fn total_score_accumulates_per_answer() {
        let session = answered_session([8, 9, 12, 13, 18, 17]);
        assert_eq!(session.total_score(), 77);
        assert_eq!(session.score_percentage(), 86);
        assert_eq!(session.current_slot_index(), SLOT_COUNT);
        let sum: u32 = session.slots().iter().map(|s| s.score).sum();
        assert_eq!(session.total_score(), sum);
    }

    #[test]
    fn record_answer_rejects_wrong_slot_index() {
        let mut session = Session::new(identity(), fixed_now());
        session
            .record_question(Slot::issued(0, "Q0").unwrap())
            .unwrap();

        let err = session.record_answer(1, "A", 5, "fb").unwrap_err();
        assert_eq!(
            err,
            StateError::SlotOutOfOrder {
                expected: 0,
                index: 1
            }
        );

        session.record_answer(0, "A", 5, "fb").unwrap();
        let err = session.record_answer(0, "again", 5, "fb").unwrap_err();
        assert_eq!(
            err,
            StateError::SlotOutOfOrder {
                expected: 1,
                index: 0
            }
        );
    }

    #[test]
    fn record_answer_requires_issued_question() {
        let mut session = Session::new(identity(), fixed_now());
        let err = session.record_answer(0, "A", 5, "fb").unwrap_err();
        assert_eq!(err, StateError::QuestionNotIssued { index: 0 });
    }

    #[test]
    fn record_question_rejects_double_issue() {
        let mut session = Session::new(identity(), fixed_now());
        session
            .record_question(Slot::issued(0, "Q0").unwrap())
            .unwrap();
        let err = session
            .record_question(Slot::issued(1, "Q1").unwrap())
            .unwrap_err();
        assert_eq!(err, StateError::QuestionAlreadyIssued { index: 0 });
    }

    #[test]
    fn record_question_stops_at_six_slots() {
        let mut session = answered_session([1, 2, 3, 4, 5, 6]);
        let err = session
            .record_question(Slot::issued(5, "extra").unwrap())
            .unwrap_err();
        assert_eq!(err, StateError::SlotSequenceFull { len: SLOT_COUNT });
    }

    #[test]
    fn score_above_slot_maximum_is_rejected() {
        let mut session = Session::new(identity(), fixed_now());
        session
            .record_question(Slot::issued(0, "Q0").unwrap())
            .unwrap();
        let err = session.record_answer(0, "A", 11, "fb").unwrap_err();
        assert_eq!(
            err,
            StateError::ScoreExceedsMax {
                score: 11,
                max_score: 10
            }
        );
        // The failed write must not advance or count anything.
        assert_eq!(session.current_slot_index(), 0);
        assert_eq!(session.total_score(), 0);
    }

    #[test]
    fn complete_requires_all_answers() {
        let mut session = Session::new(identity(), fixed_now());
        let err = session.complete("summary", fixed_now()).unwrap_err();
        assert_eq!(err, StateError::SessionIncomplete { answered: 0 });

        let mut session = answered_session([8, 9, 12, 13, 18, 17]);
        session.complete("Strong candidate.", fixed_now()).unwrap();
        assert!(session.is_complete());
        assert_eq!(session.summary(), "Strong candidate.");
        assert!(session.completed_at().is_some());

        let err = session.complete("again", fixed_now()).unwrap_err();
        assert_eq!(err, StateError::SessionAlreadyCompleted);
    }

    #[test]
    fn completed_session_rejects_further_writes() {
        let mut session = answered_session([1, 2, 3, 4, 5, 6]);
        session.complete("done", fixed_now()).unwrap();

        assert_eq!(
            session.record_answer(5, "A", 1, "fb").unwrap_err(),
            StateError::SessionAlreadyCompleted
        );
        assert_eq!(
            session
                .record_question(Slot::issued(0, "Q").unwrap())
                .unwrap_err(),
            StateError::SessionAlreadyCompleted
        );
    }

    #[test]
    fn previous_questions_preserve_issue_order() {
        let session = answered_session([1, 2, 3, 4, 5, 6]);
        assert_eq!(
            session.previous_questions(),
            vec!["Q0", "Q1", "Q2", "Q3", "Q4", "Q5"]
        );
    }

    #[test]
    fn from_persisted_round_trips_a_live_session() {
        let mut original = Session::new(identity(), fixed_now());
        original
            .record_question(Slot::issued(0, "Q0").unwrap())
            .unwrap();
        original.record_answer(0, "A0", 7, "fb").unwrap();
        original
            .record_question(Slot::issued(1, "Q1").unwrap())
            .unwrap();

        let restored = Session::from_persisted(
            original.id(),
            original.identity().clone(),
            original.status(),
            original.current_slot_index(),
            original.slots().to_vec(),
            original.total_score(),
            original.summary().to_string(),
            original.created_at(),
            original.completed_at(),
        )
        .unwrap();

        assert_eq!(restored, original);
    }

    #[test]
    fn from_persisted_rejects_mismatched_total() {
        let session = answered_session([8, 9, 12, 13, 18, 17]);
        let err = Session::from_persisted(
            session.id(),
            session.identity().clone(),
            session.status(),
            session.current_slot_index(),
            session.slots().to_vec(),
            76,
            String::new(),
            session.created_at(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, StateError::InvalidPersistedState(_)));
    }

    #[test]
    fn from_persisted_rejects_index_beyond_slots() {
        let err = Session::from_persisted(
            SessionId::generate(),
            identity(),
            SessionStatus::InProgress,
            1,
            Vec::new(),
            0,
            String::new(),
            fixed_now(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, StateError::InvalidPersistedState(_)));
    }

    #[test]
    fn from_persisted_rejects_off_plan_slot() {
        let mut slot = Slot::issued(0, "Q0").unwrap();
        slot.max_score = 50;
        let err = Session::from_persisted(
            SessionId::generate(),
            identity(),
            SessionStatus::InProgress,
            0,
            vec![slot],
            0,
            String::new(),
            fixed_now(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, StateError::InvalidPersistedState(_)));
    }

    #[test]
    fn from_persisted_rejects_incomplete_completed_session() {
        let err = Session::from_persisted(
            SessionId::generate(),
            identity(),
            SessionStatus::Completed,
            0,
            Vec::new(),
            0,
            "done".into(),
            fixed_now(),
            Some(fixed_now()),
        )
        .unwrap_err();
        assert!(matches!(err, StateError::InvalidPersistedState(_)));
    }
}
