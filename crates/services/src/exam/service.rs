use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use mentor_core::model::{Question, SessionToken, StudentId, TestId};
use mentor_core::risk::{ProctoringReport, ViolationLedger};
use mentor_core::session::{ExamSession, SessionEvent, SessionSnapshot};
use storage::repository::{
    QuestionRepository, SubmissionRepository, TestRepository, ViolationRepository,
};
use tracing::{debug, info};

use super::registry::ExamRegistry;
use super::runner::{ExamDeps, ExamRunner};
use crate::Clock;
use crate::error::ExamError;
use crate::grading_service::GradingService;

/// How long an exam may wait in setup for a camera grant before it is dropped.
pub const SETUP_TIMEOUT_MINUTES: i64 = 30;

/// Starts exams, routes client events to their runners and reports on them.
#[derive(Clone)]
pub struct ExamService {
    tests: Arc<dyn TestRepository>,
    questions: Arc<dyn QuestionRepository>,
    deps: ExamDeps,
    registry: Arc<ExamRegistry>,
}

impl ExamService {
    #[must_use]
    pub fn new(
        clock: Clock,
        tests: Arc<dyn TestRepository>,
        questions: Arc<dyn QuestionRepository>,
        submissions: Arc<dyn SubmissionRepository>,
        violations: Arc<dyn ViolationRepository>,
        grading: GradingService,
    ) -> Self {
        let registry = Arc::new(ExamRegistry::new());
        Self {
            tests,
            questions,
            deps: ExamDeps {
                clock,
                submissions,
                violations,
                grading,
                registry: Arc::downgrade(&registry),
            },
            registry,
        }
    }

    #[must_use]
    pub fn registry(&self) -> Arc<ExamRegistry> {
        Arc::clone(&self.registry)
    }

    /// Open a new attempt of `test_id` for `student_id`.
    ///
    /// Tests that do not need a camera go straight to `in_progress`; the rest
    /// wait in `setup` for a camera grant.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::TestNotFound` if the test does not exist.
    /// Returns `ExamError::Closed` if it is unpublished or outside its window.
    /// Returns `ExamError::AttemptsExhausted` if stored and live attempts
    /// already reach the test's limit.
    /// Returns `ExamError::Event` (`NoQuestions`) if the test has no questions.
    /// Returns `ExamError::Storage` if repository access fails.
    pub async fn start_exam(
        &self,
        test_id: TestId,
        student_id: StudentId,
    ) -> Result<SessionSnapshot, ExamError> {
        let now = self.deps.clock.now();
        let test = self
            .tests
            .get_test(test_id)
            .await?
            .ok_or(ExamError::TestNotFound(test_id))?;
        test.check_open(now)?;
        self.expire_setups(now);

        let attempts = self
            .deps
            .submissions
            .count_attempts(test_id, student_id)
            .await?;
        if attempts >= test.max_attempts() {
            return Err(ExamError::AttemptsExhausted {
                max: test.max_attempts(),
            });
        }

        let questions = self.questions.list_questions(test_id, None).await?;
        let session = ExamSession::new(
            SessionToken::generate(),
            &test,
            student_id,
            &questions,
            now,
        )?;
        let needs_camera = test.proctoring().needs_camera();
        let max = test.max_attempts();
        let runner = ExamRunner::new(session, test, questions, self.deps.clone());
        if !self.registry.insert_within(runner.clone(), max - attempts) {
            return Err(ExamError::AttemptsExhausted { max });
        }
        info!(
            session = %runner.token(),
            test_id = %test_id,
            student_id = %student_id,
            stored_attempts = attempts,
            live_exams = self.registry.len(),
            "exam opened"
        );

        if needs_camera {
            Ok(runner.snapshot().await)
        } else {
            runner.dispatch(SessionEvent::Begin).await
        }
    }

    /// Drop exams left in setup for longer than [`SETUP_TIMEOUT_MINUTES`]
    /// before `now`. Returns how many were dropped.
    pub fn expire_setups(&self, now: DateTime<Utc>) -> usize {
        let expired = self
            .registry
            .expire_setups(now, Duration::minutes(SETUP_TIMEOUT_MINUTES));
        if expired > 0 {
            debug!(expired, "abandoned exam setups dropped");
        }
        expired
    }

    /// Current state of an exam. Submitted exams are rebuilt from storage.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::UnknownSession` if the exam is neither running nor stored.
    /// Returns `ExamError::Storage` if repository access fails.
    pub async fn snapshot(&self, token: SessionToken) -> Result<SessionSnapshot, ExamError> {
        match self.registry.get(token) {
            Some(runner) => Ok(runner.snapshot().await),
            None => self.archived(token).await,
        }
    }

    /// The exam's questions in this student's order, without answers.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::UnknownSession` if no such exam is running.
    pub async fn questions(&self, token: SessionToken) -> Result<Vec<Question>, ExamError> {
        let runner = self.runner(token)?;
        let order = runner.snapshot().await.question_order;
        Ok(order
            .iter()
            .filter_map(|id| runner.questions().iter().find(|q| q.id() == *id))
            .map(Question::redacted)
            .collect())
    }

    /// Feed a client event into a live exam.
    ///
    /// Countdown ticks and submission outcomes are driven by the runner itself
    /// and refused here.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::ReservedEvent` for server-side events.
    /// Returns `ExamError::UnknownSession` if no such exam is running.
    /// Returns `ExamError::Finished` for events other than a submit request
    /// once the exam was stored.
    /// Returns `ExamError::Event` if the session rejects the event.
    pub async fn dispatch(
        &self,
        token: SessionToken,
        event: SessionEvent,
    ) -> Result<SessionSnapshot, ExamError> {
        if matches!(
            event,
            SessionEvent::Tick
                | SessionEvent::SubmitFailed { .. }
                | SessionEvent::SubmitAcknowledged { .. }
        ) {
            return Err(ExamError::ReservedEvent(event.name()));
        }
        if let Some(runner) = self.registry.get(token) {
            return runner.dispatch(event).await;
        }
        let archived = self.archived(token).await?;
        if event == SessionEvent::SubmitRequested {
            Ok(archived)
        } else {
            Err(ExamError::Finished(token))
        }
    }

    /// Ask a live exam to submit. Repeated calls never produce a second submission.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::UnknownSession` if no such exam is running.
    /// Returns `ExamError::Event` if the exam has not started yet.
    pub async fn submit(&self, token: SessionToken) -> Result<SessionSnapshot, ExamError> {
        self.dispatch(token, SessionEvent::SubmitRequested).await
    }

    /// Integrity report built from the violations persisted for `token`.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Storage` if repository access fails.
    pub async fn report(&self, token: SessionToken) -> Result<ProctoringReport, ExamError> {
        let records = self.deps.violations.violations_for_session(token).await?;
        Ok(ViolationLedger::from_records(&records).report(token))
    }

    async fn archived(&self, token: SessionToken) -> Result<SessionSnapshot, ExamError> {
        let submission = self
            .deps
            .submissions
            .submission_for_session(token)
            .await?
            .ok_or(ExamError::UnknownSession(token))?;
        let duration = self
            .tests
            .get_test(submission.test_id)
            .await?
            .map_or(submission.time_spent_secs, |test| test.duration_secs());
        Ok(SessionSnapshot::archived(&submission, duration))
    }

    fn runner(&self, token: SessionToken) -> Result<ExamRunner, ExamError> {
        self.registry
            .get(token)
            .ok_or(ExamError::UnknownSession(token))
    }
}
