mod registry;
mod runner;
mod service;

// Public API of the exam subsystem.
pub use crate::error::ExamError;
pub use registry::ExamRegistry;
pub use runner::{ExamRunner, TICK};
pub use service::{ExamService, SETUP_TIMEOUT_MINUTES};
