mod identity;
mod ids;
mod session;
mod slot;

pub use identity::{CandidateIdentity, ExtractedFields, IdentityCollector, IdentityField};
pub use ids::SessionId;
pub use session::{Session, SessionStatus, StateError};
pub use slot::{
    Difficulty, DifficultyError, Slot, SlotConfig, MAX_TOTAL_SCORE, NO_ANSWER_PLACEHOLDER,
    SLOT_COUNT, SLOT_PLAN, score_percentage,
};
