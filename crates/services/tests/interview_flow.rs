//! End-to-end interview runs over in-memory storage with a scripted
//! collaborator.

use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;

use interview_core::model::{
    CandidateIdentity, Difficulty, ExtractedFields, SessionStatus, Slot, NO_ANSWER_PLACEHOLDER,
    SLOT_COUNT,
};
use interview_core::time::fixed_clock;
use services::{
    AppServices, Collaborator, CollaboratorError, Evaluation, InterviewError, NextStep,
    QuestionScheduler, ResumeDocument, ResumeOutcome, SlotOutcome, DEFAULT_SUMMARY,
};
use storage::repository::InMemoryRepository;
use storage::SessionRepository;

#[derive(Default)]
struct FakeCollaborator {
    evaluations: Mutex<Vec<Result<Evaluation, CollaboratorError>>>,
    question_failures: Mutex<u32>,
    summary: Mutex<Option<String>>,
}

impl FakeCollaborator {
    fn with_scores(scores: &[u32]) -> Self {
        let evaluations = scores
            .iter()
            .map(|&score| {
                Ok(Evaluation {
                    score: Some(score),
                    feedback: Some(format!("Scored {score}")),
                })
            })
            .collect();
        Self {
            evaluations: Mutex::new(evaluations),
            ..Self::default()
        }
    }
}

#[async_trait]
impl Collaborator for FakeCollaborator {
    async fn extract_identity(
        &self,
        _document: &ResumeDocument,
    ) -> Result<ExtractedFields, CollaboratorError> {
        Ok(ExtractedFields::default())
    }

    async fn generate_question(
        &self,
        difficulty: Difficulty,
        question_number: u32,
        previous_questions: &[String],
        _resume_text: &str,
    ) -> Result<String, CollaboratorError> {
        let mut failures = self.question_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(CollaboratorError::Unavailable("backend down".into()));
        }
        assert_eq!(previous_questions.len() as u32, question_number - 1);
        Ok(format!("Question {question_number} ({})", difficulty.as_str()))
    }

    async fn evaluate_answer(
        &self,
        _question: &str,
        _answer: &str,
        _difficulty: Difficulty,
    ) -> Result<Evaluation, CollaboratorError> {
        let mut evaluations = self.evaluations.lock().unwrap();
        if evaluations.is_empty() {
            Ok(Evaluation::default())
        } else {
            evaluations.remove(0)
        }
    }

    async fn generate_summary(
        &self,
        _candidate_name: &str,
        slots: &[Slot],
        _total_score: u32,
    ) -> Result<Option<String>, CollaboratorError> {
        assert_eq!(slots.len(), SLOT_COUNT);
        Ok(self.summary.lock().unwrap().clone())
    }
}

fn identity() -> CandidateIdentity {
    CandidateIdentity {
        name: "Alan Turing".into(),
        email: "alan@example.com".into(),
        phone: "+44 555 0199".into(),
        resume_text: "computation, cryptanalysis".into(),
    }
}

fn scheduler_over(
    repo: Arc<InMemoryRepository>,
    collaborator: Arc<FakeCollaborator>,
) -> QuestionScheduler {
    QuestionScheduler::new(fixed_clock(), repo, collaborator)
}

#[tokio::test]
async fn full_interview_accumulates_scores_and_completes() {
    let collaborator = Arc::new(FakeCollaborator::with_scores(&[8, 9, 12, 13, 18, 17]));
    *collaborator.summary.lock().unwrap() = Some("Excellent fundamentals.".into());
    let repo = Arc::new(InMemoryRepository::new());
    let mut scheduler = scheduler_over(repo.clone(), collaborator);

    let first = scheduler.begin(identity()).await.unwrap();
    assert_eq!(first.question_number, 1);
    assert_eq!(first.difficulty, Difficulty::Easy);
    assert_eq!(first.time_limit_secs, 20);

    let mut completed = None;
    for _ in 0..SLOT_COUNT {
        let outcome = scheduler.submit_answer("A considered answer").await.unwrap();
        match outcome.next {
            NextStep::NextSlot { delay } => {
                assert_eq!(delay.as_secs(), 2);
                scheduler.next_question().await.unwrap();
            }
            NextStep::Finished(interview) => completed = Some(interview),
        }
    }

    let completed = completed.expect("sixth answer finishes the interview");
    assert_eq!(completed.total_score(), 77);
    assert_eq!(completed.percentage(), 86);
    assert_eq!(completed.summary(), "Excellent fundamentals.");
    assert_eq!(completed.session.status(), SessionStatus::Completed);

    assert!(repo.get_in_progress().await.unwrap().is_none());
    let stored = repo.list_completed().await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].total_score(), 77);
}

#[tokio::test]
async fn evaluation_failure_scores_zero_and_moves_on() {
    let collaborator = Arc::new(FakeCollaborator {
        evaluations: Mutex::new(vec![
            Ok(Evaluation {
                score: Some(7),
                feedback: Some("Fine".into()),
            }),
            Err(CollaboratorError::Unavailable("evaluator offline".into())),
        ]),
        ..FakeCollaborator::default()
    });
    let repo = Arc::new(InMemoryRepository::new());
    let mut scheduler = scheduler_over(repo, collaborator);

    scheduler.begin(identity()).await.unwrap();
    scheduler.submit_answer("First answer").await.unwrap();
    scheduler.next_question().await.unwrap();

    let outcome = scheduler.submit_answer("Second answer").await.unwrap();
    assert_eq!(outcome.recorded.score, 0);
    assert!(!outcome.recorded.feedback.is_empty());
    assert_eq!(outcome.recorded.answer, "Second answer");
    assert!(matches!(outcome.next, NextStep::NextSlot { .. }));

    let third = scheduler.next_question().await.unwrap();
    assert_eq!(third.question_number, 3);
    assert_eq!(third.difficulty, Difficulty::Medium);
    assert_eq!(scheduler.session().unwrap().total_score(), 7);
}

#[tokio::test]
async fn expiry_records_the_placeholder_answer() {
    let collaborator = Arc::new(FakeCollaborator::default());
    let repo = Arc::new(InMemoryRepository::new());
    let mut scheduler = scheduler_over(repo, collaborator);

    let question = scheduler.begin(identity()).await.unwrap();
    let outcome = scheduler
        .handle_expiry(question.ticket)
        .await
        .unwrap()
        .expect("live ticket resolves the slot");

    assert_eq!(outcome.recorded.answer, NO_ANSWER_PLACEHOLDER);
    assert_eq!(outcome.recorded.score, 0);
    let session = scheduler.session().unwrap();
    assert_eq!(session.current_slot_index(), 1);
}

#[tokio::test]
async fn submission_wins_the_race_against_expiry() {
    let collaborator = Arc::new(FakeCollaborator::with_scores(&[5]));
    let repo = Arc::new(InMemoryRepository::new());
    let mut scheduler = scheduler_over(repo, collaborator);

    let question = scheduler.begin(identity()).await.unwrap();
    scheduler.submit_answer("Made it in time").await.unwrap();

    // The late expiry is stale and must not record a second answer.
    let stale = scheduler.handle_expiry(question.ticket).await.unwrap();
    assert!(stale.is_none());

    let session = scheduler.session().unwrap();
    assert_eq!(session.current_slot_index(), 1);
    assert_eq!(session.slots()[0].answer, "Made it in time");
    assert_eq!(session.total_score(), 5);
}

#[tokio::test]
async fn expiry_for_a_previous_question_is_ignored() {
    let collaborator = Arc::new(FakeCollaborator::with_scores(&[5, 4]));
    let repo = Arc::new(InMemoryRepository::new());
    let mut scheduler = scheduler_over(repo, collaborator);

    let first = scheduler.begin(identity()).await.unwrap();
    scheduler.submit_answer("One").await.unwrap();
    let second = scheduler.next_question().await.unwrap();
    assert_ne!(first.ticket, second.ticket);

    // First question's timer fires after its slot is long resolved.
    assert!(scheduler.handle_expiry(first.ticket).await.unwrap().is_none());
    // The second countdown is still armed.
    let outcome = scheduler.handle_expiry(second.ticket).await.unwrap();
    assert!(outcome.is_some());
}

#[tokio::test]
async fn resume_reuses_the_issued_question() {
    let repo = Arc::new(InMemoryRepository::new());
    let collaborator = Arc::new(FakeCollaborator::with_scores(&[8, 9]));
    {
        let mut scheduler = scheduler_over(repo.clone(), collaborator.clone());
        scheduler.begin(identity()).await.unwrap();
        scheduler.submit_answer("One").await.unwrap();
        scheduler.next_question().await.unwrap();
        scheduler.submit_answer("Two").await.unwrap();
        let third = scheduler.next_question().await.unwrap();
        assert_eq!(third.question_number, 3);
        // Interview interrupted here with question 3 issued but unanswered.
    }

    let mut scheduler = scheduler_over(repo, collaborator);
    let outcome = scheduler.resume().await.unwrap();
    let ResumeOutcome::Resumed(question) = outcome else {
        panic!("expected an interrupted interview");
    };
    assert_eq!(question.question_number, 3);
    assert_eq!(question.question, "Question 3 (medium)");
    assert_eq!(scheduler.session().unwrap().total_score(), 17);
}

#[tokio::test]
async fn resume_with_no_stored_session_is_fresh() {
    let repo = Arc::new(InMemoryRepository::new());
    let mut scheduler = scheduler_over(repo, Arc::new(FakeCollaborator::default()));
    assert!(matches!(
        scheduler.resume().await.unwrap(),
        ResumeOutcome::Fresh
    ));
}

#[tokio::test]
async fn question_generation_failure_leaves_the_slot_retryable() {
    let collaborator = Arc::new(FakeCollaborator {
        question_failures: Mutex::new(1),
        ..FakeCollaborator::default()
    });
    let repo = Arc::new(InMemoryRepository::new());
    let mut scheduler = scheduler_over(repo, collaborator);

    let err = scheduler.begin(identity()).await.unwrap_err();
    assert!(matches!(err, InterviewError::Collaborator(_)));
    // The session exists but no slot was created.
    assert_eq!(scheduler.session().unwrap().slots().len(), 0);

    let retried = scheduler.next_question().await.unwrap();
    assert_eq!(retried.question_number, 1);
}

#[tokio::test]
async fn a_second_interview_is_independent_of_the_first() {
    let repo = Arc::new(InMemoryRepository::new());
    let collaborator = Arc::new(FakeCollaborator::default());
    let mut scheduler = scheduler_over(repo.clone(), collaborator.clone());

    scheduler.begin(identity()).await.unwrap();
    let mut finished = false;
    while !finished {
        let SlotOutcome { next, .. } = scheduler.submit_answer("answer").await.unwrap();
        match next {
            NextStep::NextSlot { .. } => {
                scheduler.next_question().await.unwrap();
            }
            NextStep::Finished(interview) => {
                assert_eq!(interview.summary(), DEFAULT_SUMMARY);
                finished = true;
            }
        }
    }
    let first_id = repo.list_completed().await.unwrap()[0].id();

    let second = scheduler.begin(CandidateIdentity {
        name: "Katherine Johnson".into(),
        email: "katherine@example.com".into(),
        phone: "+1 555 0102".into(),
        resume_text: "orbital mechanics".into(),
    })
    .await
    .unwrap();
    assert_eq!(second.question_number, 1);
    assert_eq!(scheduler.session().unwrap().total_score(), 0);
    assert_ne!(scheduler.session().unwrap().id(), first_id);
}

#[tokio::test]
async fn abandon_discards_and_allows_a_fresh_start() {
    let repo = Arc::new(InMemoryRepository::new());
    let collaborator = Arc::new(FakeCollaborator::default());
    let mut scheduler = scheduler_over(repo.clone(), collaborator);

    let question = scheduler.begin(identity()).await.unwrap();
    scheduler.abandon().await.unwrap();

    assert!(repo.get_in_progress().await.unwrap().is_none());
    assert!(repo.list_completed().await.unwrap().is_empty());
    // The old countdown died with the session.
    assert!(scheduler.handle_expiry(question.ticket).await.unwrap().is_none());

    scheduler.begin(identity()).await.unwrap();
    assert_eq!(scheduler.session().unwrap().current_slot_index(), 0);
}

#[tokio::test]
async fn declining_a_resume_discards_the_stored_session() {
    let repo = Arc::new(InMemoryRepository::new());
    let collaborator = Arc::new(FakeCollaborator::with_scores(&[6]));
    {
        let mut scheduler = scheduler_over(repo.clone(), collaborator.clone());
        scheduler.begin(identity()).await.unwrap();
        scheduler.submit_answer("One").await.unwrap();
    }

    let mut scheduler = scheduler_over(repo.clone(), collaborator);
    scheduler.discard_stored().await.unwrap();
    assert!(repo.get_in_progress().await.unwrap().is_none());
    assert!(repo.list_completed().await.unwrap().is_empty());

    // With nothing stored, declining is a wiring bug.
    assert!(scheduler.discard_stored().await.is_err());
}

#[tokio::test]
async fn detect_resumable_reports_progress() {
    let collaborator: Arc<dyn Collaborator> =
        Arc::new(FakeCollaborator::with_scores(&[8]));
    let services = AppServices::in_memory(fixed_clock(), Arc::clone(&collaborator));

    assert!(services.detect_resumable().await.unwrap().is_none());

    let mut scheduler = services.scheduler();
    scheduler.begin(identity()).await.unwrap();
    scheduler.submit_answer("One").await.unwrap();
    drop(scheduler);

    let prompt = services.detect_resumable().await.unwrap().unwrap();
    assert_eq!(prompt.candidate_name, "Alan Turing");
    assert_eq!(prompt.answered, 1);
    assert_eq!(prompt.slot_count, SLOT_COUNT);
}
