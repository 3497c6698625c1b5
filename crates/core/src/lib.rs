#![forbid(unsafe_code)]

pub mod model;
pub mod time;

pub use time::Clock;

pub use model::{
    CandidateIdentity, Difficulty, ExtractedFields, IdentityCollector, IdentityField, Session,
    SessionId, SessionStatus, Slot, SlotConfig, StateError,
};
