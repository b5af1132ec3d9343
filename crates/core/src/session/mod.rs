//! The proctored exam session: a single reducer over an explicit phase enum.

pub mod camera;
pub mod order;
mod state;

pub use order::QuestionOrder;
pub use state::{
    Effect, ExamSession, SessionEvent, SessionEventError, SessionPhase, SessionSnapshot,
};
