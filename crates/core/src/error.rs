use thiserror::Error;

use crate::model::{QuestionError, TestError};
use crate::session::SessionEventError;

/// Umbrella error for callers that only need to know the domain rejected something.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Test(#[from] TestError),
    #[error(transparent)]
    Session(#[from] SessionEventError),
}
