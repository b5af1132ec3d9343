mod ids;
mod proctoring;
mod question;
mod section;
mod submission;

pub use ids::{ParseIdError, QuestionId, SessionToken, StudentId, SubmissionId, TestId};

pub use proctoring::{ProctoringPolicy, Severity, ViolationKind, ViolationRecord};
pub use question::{CodeSpec, MAX_OPTIONS, Question, QuestionDraft, QuestionError, TestCase};
pub use section::{QuestionKind, Section, UnknownVariant};
pub use submission::{
    AttemptPayload, ProctoringCounters, QuestionResult, SectionResult, Submission,
    SubmissionStatus, SubmitReason,
};
pub use test::{
    DEFAULT_DURATION_MINUTES, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_TAB_SWITCHES,
    DEFAULT_PASSING_SCORE, TestDefinition, TestDraft, TestError, TestKind, TestStatus,
};
