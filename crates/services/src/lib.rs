#![forbid(unsafe_code)]

pub mod app_services;
pub mod collaborator;
pub mod error;
pub mod http_collaborator;
pub mod ledger;
pub mod lifecycle;
pub mod scheduler;

pub use interview_core::Clock;

pub use app_services::{AppServices, ResumePrompt};
pub use collaborator::{Collaborator, Evaluation, ResumeDocument};
pub use error::{AppServicesError, CollaboratorError, InterviewError};
pub use http_collaborator::{HttpCollaborator, HttpCollaboratorConfig};
pub use ledger::{AnswerLedger, RecordedAnswer, NO_FEEDBACK};
pub use lifecycle::SessionLifecycle;
pub use scheduler::{
    ActiveQuestion, CompletedInterview, CountdownTicket, NextStep, QuestionScheduler,
    ResumeOutcome, SlotOutcome, DEFAULT_SUMMARY, INTER_QUESTION_DELAY,
};
