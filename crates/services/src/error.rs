//! Shared error types for the services crate.

use thiserror::Error;

use mentor_core::model::{QuestionError, Section, SessionToken, TestError, TestId, TestKind};
use mentor_core::session::SessionEventError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by a `CodeJudge`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GradingError {
    #[error("code judge is not configured")]
    Disabled,
    #[error("code judge returned an empty verdict")]
    EmptyVerdict,
    #[error("code judge gave no verdict within {0:?}")]
    TimedOut(std::time::Duration),
    #[error("code judge request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("test {0} not found")]
    TestNotFound(TestId),
    #[error("a {} test has no {section} section", .kind.as_str())]
    SectionNotAllowed { kind: TestKind, section: Section },
    #[error("question {index}: {source}")]
    Question {
        index: usize,
        #[source]
        source: QuestionError,
    },
    #[error(transparent)]
    Test(#[from] TestError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ExamService` and `ExamRunner`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExamError {
    #[error("test {0} not found")]
    TestNotFound(TestId),
    #[error(transparent)]
    Closed(#[from] TestError),
    #[error("all {max} attempts have been used")]
    AttemptsExhausted { max: u32 },
    #[error("exam session {0} not found")]
    UnknownSession(SessionToken),
    #[error("exam session {0} was already submitted")]
    Finished(SessionToken),
    #[error("exam session has no payload to submit")]
    NothingToSubmit,
    #[error("`{0}` events are raised by the server, not clients")]
    ReservedEvent(&'static str),
    #[error(transparent)]
    Event(#[from] SessionEventError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Judge(#[from] GradingError),
}
