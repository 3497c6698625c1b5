use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

/// Errors that can occur when interpreting persisted slot data.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DifficultyError {
    #[error("invalid difficulty value: {0}")]
    Invalid(String),
}

//
// ─── DIFFICULTY ───────────────────────────────────────────────────────────────
//

/// Three-level question difficulty. The interview issues two questions per
/// level, in increasing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Storage and wire representation of the difficulty.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Parses the storage/wire representation back into a `Difficulty`.
    ///
    /// # Errors
    ///
    /// Returns `DifficultyError::Invalid` for any unrecognized value.
    pub fn parse(value: &str) -> Result<Self, DifficultyError> {
        match value {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(DifficultyError::Invalid(other.to_string())),
        }
    }
}

//
// ─── SLOT PLAN ────────────────────────────────────────────────────────────────
//

/// Number of question slots in every interview.
pub const SLOT_COUNT: usize = 6;

/// Sum of all per-slot maximum scores.
pub const MAX_TOTAL_SCORE: u32 = 90;

/// Answer recorded when the countdown expires with no operator input.
pub const NO_ANSWER_PLACEHOLDER: &str = "(No answer provided - time expired)";

/// Fixed parameters for one slot index: what difficulty to ask at, how long
/// the candidate gets, and how many points the answer is worth at most.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotConfig {
    pub difficulty: Difficulty,
    pub time_limit_secs: u32,
    pub max_score: u32,
}

/// The fixed interview plan: two easy, two medium, two hard slots.
pub const SLOT_PLAN: [SlotConfig; SLOT_COUNT] = [
    SlotConfig {
        difficulty: Difficulty::Easy,
        time_limit_secs: 20,
        max_score: 10,
    },
    SlotConfig {
        difficulty: Difficulty::Easy,
        time_limit_secs: 20,
        max_score: 10,
    },
    SlotConfig {
        difficulty: Difficulty::Medium,
        time_limit_secs: 60,
        max_score: 15,
    },
    SlotConfig {
        difficulty: Difficulty::Medium,
        time_limit_secs: 60,
        max_score: 15,
    },
    SlotConfig {
        difficulty: Difficulty::Hard,
        time_limit_secs: 120,
        max_score: 20,
    },
    SlotConfig {
        difficulty: Difficulty::Hard,
        time_limit_secs: 120,
        max_score: 20,
    },
];

/// Rounded percentage of the maximum achievable score.
#[must_use]
pub fn score_percentage(total_score: u32) -> u32 {
    let pct = f64::from(total_score) / f64::from(MAX_TOTAL_SCORE) * 100.0;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        pct.round() as u32
    }
}

//
// ─── SLOT ─────────────────────────────────────────────────────────────────────
//

/// One question/answer/score record in a session.
///
/// Created when the question is issued, with an empty answer and zero score.
/// The scoring step fills in answer, score and feedback exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub question: String,
    pub answer: String,
    pub difficulty: Difficulty,
    pub score: u32,
    pub max_score: u32,
    pub feedback: String,
    pub time_limit_secs: u32,
}

impl Slot {
    /// Builds the unanswered slot for `slot_index` around an issued question.
    ///
    /// Difficulty, time limit and max score come from the fixed plan.
    /// Returns `None` if `slot_index` is outside the plan.
    #[must_use]
    pub fn issued(slot_index: usize, question: impl Into<String>) -> Option<Self> {
        let config = SLOT_PLAN.get(slot_index)?;
        Some(Self {
            question: question.into(),
            answer: String::new(),
            difficulty: config.difficulty,
            score: 0,
            max_score: config.max_score,
            feedback: String::new(),
            time_limit_secs: config.time_limit_secs,
        })
    }
}

//
// ─── TESTS ────────────────────────────────────────────────────────────────────
//
