use std::collections::VecDeque;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use mentor_core::model::{
    Question, SessionToken, StudentId, SubmissionId, TestDefinition, ViolationRecord,
};
use mentor_core::session::{Effect, ExamSession, SessionEvent, SessionPhase, SessionSnapshot};
use storage::repository::{StorageError, SubmissionRepository, ViolationRepository};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::Clock;
use crate::error::ExamError;
use crate::grading_service::GradingService;

use super::registry::ExamRegistry;

/// Countdown resolution.
pub const TICK: Duration = Duration::from_secs(1);

/// What a runner needs besides its session.
#[derive(Clone)]
pub(crate) struct ExamDeps {
    pub clock: Clock,
    pub submissions: Arc<dyn SubmissionRepository>,
    pub violations: Arc<dyn ViolationRepository>,
    pub grading: GradingService,
    pub registry: Weak<ExamRegistry>,
}

/// Owns one live exam: the session state machine, its countdown and the
/// side effects its transitions ask for.
///
/// Cloning is cheap and every clone drives the same session.
#[derive(Clone)]
pub struct ExamRunner {
    inner: Arc<RunnerInner>,
}

struct RunnerInner {
    token: SessionToken,
    student: StudentId,
    session: Mutex<ExamSession>,
    test: TestDefinition,
    questions: Vec<Question>,
    deps: ExamDeps,
    timer: StdMutex<Option<JoinHandle<()>>>,
}

impl Drop for RunnerInner {
    fn drop(&mut self) {
        let slot = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = slot.take() {
            handle.abort();
        }
    }
}

impl ExamRunner {
    pub(crate) fn new(
        session: ExamSession,
        test: TestDefinition,
        questions: Vec<Question>,
        deps: ExamDeps,
    ) -> Self {
        Self {
            inner: Arc::new(RunnerInner {
                token: session.token(),
                student: session.student_id(),
                session: Mutex::new(session),
                test,
                questions,
                deps,
                timer: StdMutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn token(&self) -> SessionToken {
        self.inner.token
    }

    #[must_use]
    pub fn student(&self) -> StudentId {
        self.inner.student
    }

    #[must_use]
    pub fn test(&self) -> &TestDefinition {
        &self.inner.test
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.inner.questions
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.session.lock().await.snapshot()
    }

    /// True when the exam is still waiting in setup and was opened at least
    /// `ttl` before `now`. A session busy with another event is not idle.
    #[must_use]
    pub fn idle_in_setup(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        self.inner.session.try_lock().is_ok_and(|session| {
            session.phase() == SessionPhase::Setup && now - session.created_at() >= ttl
        })
    }

    /// Whether the countdown task is currently alive.
    #[must_use]
    pub fn timer_running(&self) -> bool {
        self.inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Apply `event` and carry out every effect it produces, including grading
    /// and persisting the attempt when the session decides to submit.
    ///
    /// Events are serialized: a second caller waits until the first one,
    /// submission included, has finished.
    ///
    /// # Errors
    ///
    /// Returns `ExamError::Event` when the session rejects the event.
    pub async fn dispatch(&self, event: SessionEvent) -> Result<SessionSnapshot, ExamError> {
        let mut session = self.inner.session.lock().await;
        let effects = session.apply(event, self.inner.deps.clock.now())?;
        self.run_effects(&mut session, effects).await?;
        Ok(session.snapshot())
    }

    async fn run_effects(
        &self,
        session: &mut ExamSession,
        effects: Vec<Effect>,
    ) -> Result<(), ExamError> {
        let token = self.inner.token;
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Started => {
                    info!(session = %token, remaining_secs = session.remaining_secs(), "exam started");
                    self.start_timer();
                }
                Effect::Blocked => {
                    info!(session = %token, "camera permission denied");
                }
                Effect::Violation { kind, action } => {
                    let record = ViolationRecord::new(token, kind, self.inner.deps.clock.now());
                    if let Err(err) = self.inner.deps.violations.append_violation(&record).await {
                        warn!(session = %token, kind = kind.as_str(), error = %err, "violation not persisted");
                    }
                    info!(
                        session = %token,
                        kind = kind.as_str(),
                        action = ?action,
                        score = session.ledger().score(),
                        "violation logged"
                    );
                }
                Effect::TabSwitchWarning { count, remaining } => {
                    debug!(session = %token, count, remaining, "tab switch warning");
                }
                Effect::Submit { reason } => {
                    if reason.is_automatic() {
                        info!(session = %token, reason = reason.as_str(), "auto-submitting exam");
                    }
                    let follow_up = match self.persist(session).await {
                        Ok(id) => SessionEvent::SubmitAcknowledged {
                            submission_id: Some(id),
                        },
                        Err(err) => SessionEvent::SubmitFailed {
                            message: err.to_string(),
                        },
                    };
                    let now = self.inner.deps.clock.now();
                    queue.extend(session.apply(follow_up, now)?);
                }
                Effect::SubmitFailed { message } => {
                    warn!(session = %token, error = %message, "submission failed");
                }
                Effect::Completed { submission_id } => {
                    self.stop_timer();
                    if let Some(registry) = self.inner.deps.registry.upgrade() {
                        registry.remove(token);
                    }
                    info!(session = %token, submission_id = ?submission_id, "submission persisted");
                }
            }
        }
        Ok(())
    }

    /// Grade the attempt and store it once per session, provided the student
    /// still has an attempt left.
    async fn persist(&self, session: &ExamSession) -> Result<SubmissionId, ExamError> {
        let payload = session.payload().ok_or(ExamError::NothingToSubmit)?;
        let submissions = &self.inner.deps.submissions;

        // A retry after a lost acknowledgement finds the earlier row.
        if let Some(id) = submissions
            .submission_for_session(payload.session)
            .await?
            .and_then(|s| s.id)
        {
            return Ok(id);
        }

        let used = submissions
            .count_attempts(payload.test_id, payload.student_id)
            .await?;
        let max = self.inner.test.max_attempts();
        if used >= max {
            return Err(ExamError::AttemptsExhausted { max });
        }

        let now = self.inner.deps.clock.now();
        let submission = self
            .inner
            .deps
            .grading
            .grade(&self.inner.test, &self.inner.questions, &payload, now)
            .await;

        match submissions.insert_submission(&submission).await {
            Ok(id) => Ok(id),
            Err(StorageError::Conflict) => submissions
                .submission_for_session(payload.session)
                .await?
                .and_then(|s| s.id)
                .ok_or(ExamError::Storage(StorageError::Conflict)),
            Err(err) => Err(err.into()),
        }
    }

    fn start_timer(&self) {
        let mut slot = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return;
        }
        *slot = Some(tokio::spawn(countdown(Arc::downgrade(&self.inner))));
    }

    fn stop_timer(&self) {
        let handle = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

/// Feeds one `Tick` per second until the session leaves `in_progress` or the
/// runner is dropped.
async fn countdown(inner: Weak<RunnerInner>) {
    let mut interval = tokio::time::interval(TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let runner = ExamRunner { inner };
        match runner.dispatch(SessionEvent::Tick).await {
            Ok(snapshot) if snapshot.phase == SessionPhase::InProgress => {}
            Ok(_) => break,
            Err(err) => {
                warn!(session = %runner.token(), error = %err, "countdown stopped");
                break;
            }
        }
    }
}
