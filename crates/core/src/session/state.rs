use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::model::{
    AttemptPayload, ProctoringCounters, ProctoringPolicy, Question, QuestionId, Section,
    SessionToken, StudentId, Submission, SubmissionId, SubmitReason, TestDefinition, TestId,
    ViolationKind,
};
use crate::grading::NOT_ANSWERED;
use crate::risk::{HaltAction, ViolationLedger};
use crate::session::camera::BlockDetector;
use crate::session::order::QuestionOrder;

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Setup,
    InProgress,
    Submitting,
    Complete,
}

impl SessionPhase {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionPhase::Setup => "setup",
            SessionPhase::InProgress => "in_progress",
            SessionPhase::Submitting => "submitting",
            SessionPhase::Complete => "complete",
        }
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── EVENTS & EFFECTS ──────────────────────────────────────────────────────────
//

/// Everything that can happen to a running exam: user input, browser
/// observations, the countdown, and the outcome of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum SessionEvent {
    CameraGranted,
    CameraDenied,
    /// Start without a camera grant; only valid when the policy needs none.
    Begin,
    /// One second of the countdown elapsed.
    Tick,
    Answer {
        question_id: QuestionId,
        answer: String,
    },
    Next,
    Previous,
    Jump {
        section: Section,
        index: usize,
    },
    /// The page became hidden: a tab switch.
    VisibilityHidden,
    FullscreenExited,
    Clipboard {
        paste: bool,
    },
    CameraFrame {
        brightness: f64,
    },
    ObjectScan {
        phones: u32,
        persons: u32,
    },
    SubmitRequested,
    SubmitFailed {
        message: String,
    },
    SubmitAcknowledged {
        submission_id: Option<SubmissionId>,
    },
}

impl SessionEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::CameraGranted => "camera_granted",
            SessionEvent::CameraDenied => "camera_denied",
            SessionEvent::Begin => "begin",
            SessionEvent::Tick => "tick",
            SessionEvent::Answer { .. } => "answer",
            SessionEvent::Next => "next",
            SessionEvent::Previous => "previous",
            SessionEvent::Jump { .. } => "jump",
            SessionEvent::VisibilityHidden => "visibility_hidden",
            SessionEvent::FullscreenExited => "fullscreen_exited",
            SessionEvent::Clipboard { .. } => "clipboard",
            SessionEvent::CameraFrame { .. } => "camera_frame",
            SessionEvent::ObjectScan { .. } => "object_scan",
            SessionEvent::SubmitRequested => "submit_requested",
            SessionEvent::SubmitFailed { .. } => "submit_failed",
            SessionEvent::SubmitAcknowledged { .. } => "submit_acknowledged",
        }
    }

    /// Background signals that may still arrive after the exam closed.
    fn is_observation(&self) -> bool {
        matches!(
            self,
            SessionEvent::Tick
                | SessionEvent::VisibilityHidden
                | SessionEvent::FullscreenExited
                | SessionEvent::Clipboard { .. }
                | SessionEvent::CameraFrame { .. }
                | SessionEvent::ObjectScan { .. }
        )
    }
}

/// Work the owner of the session must carry out after an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Effect {
    /// The exam began; start the countdown.
    Started,
    /// Camera permission was refused; the session stays in setup.
    Blocked,
    /// Persist this violation.
    Violation {
        kind: ViolationKind,
        action: HaltAction,
    },
    TabSwitchWarning {
        count: u32,
        remaining: u32,
    },
    /// Send the attempt payload exactly once.
    Submit { reason: SubmitReason },
    SubmitFailed { message: String },
    /// Stop the countdown and release the session.
    Completed {
        submission_id: Option<SubmissionId>,
    },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionEventError {
    #[error("`{event}` is not allowed while the session is {phase}")]
    WrongPhase {
        event: &'static str,
        phase: SessionPhase,
    },
    #[error("camera access is required before the test can start")]
    CameraRequired,
    #[error("question {0} is not part of this exam")]
    UnknownQuestion(QuestionId),
    #[error("no question {index} in section {section}")]
    NoSuchPosition { section: Section, index: usize },
    #[error("the test has no questions")]
    NoQuestions,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One proctored attempt. All mutation goes through [`ExamSession::apply`].
#[derive(Debug, Clone)]
pub struct ExamSession {
    token: SessionToken,
    test_id: TestId,
    student_id: StudentId,
    policy: ProctoringPolicy,
    max_tab_switches: u32,
    duration_secs: u32,
    phase: SessionPhase,
    order: QuestionOrder,
    answers: BTreeMap<QuestionId, String>,
    remaining_secs: u32,
    counters: ProctoringCounters,
    ledger: ViolationLedger,
    camera: BlockDetector,
    camera_granted: bool,
    camera_denied: bool,
    in_flight: bool,
    reason: Option<SubmitReason>,
    last_error: Option<String>,
    submission_id: Option<SubmissionId>,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
}

impl ExamSession {
    /// Create a session in `setup` for `student` taking `test`.
    ///
    /// # Errors
    ///
    /// Returns `SessionEventError::NoQuestions` when `questions` is empty.
    pub fn new(
        token: SessionToken,
        test: &TestDefinition,
        student_id: StudentId,
        questions: &[Question],
        now: DateTime<Utc>,
    ) -> Result<Self, SessionEventError> {
        let order = QuestionOrder::new(questions, student_id, test.id());
        if order.is_empty() {
            return Err(SessionEventError::NoQuestions);
        }
        Ok(Self {
            token,
            test_id: test.id(),
            student_id,
            policy: test.proctoring(),
            max_tab_switches: test.max_tab_switches(),
            duration_secs: test.duration_secs(),
            phase: SessionPhase::Setup,
            order,
            answers: BTreeMap::new(),
            remaining_secs: test.duration_secs(),
            counters: ProctoringCounters::default(),
            ledger: ViolationLedger::new(),
            camera: BlockDetector::default(),
            camera_granted: false,
            camera_denied: false,
            in_flight: false,
            reason: None,
            last_error: None,
            submission_id: None,
            created_at: now,
            started_at: None,
        })
    }

    /// Feed one event through the state machine.
    ///
    /// Observations and ticks that arrive after submission began are dropped
    /// silently; a second submit request while one is in flight is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `SessionEventError` when the event makes no sense in the current phase
    /// or references a question or position outside this exam.
    pub fn apply(
        &mut self,
        event: SessionEvent,
        now: DateTime<Utc>,
    ) -> Result<Vec<Effect>, SessionEventError> {
        let mut effects = Vec::new();
        match (self.phase, event) {
            // ── setup ──
            (SessionPhase::Setup, SessionEvent::CameraGranted) => {
                self.camera_granted = true;
                self.camera_denied = false;
                self.start(now, &mut effects);
            }
            (SessionPhase::Setup, SessionEvent::CameraDenied) => {
                self.camera_granted = false;
                self.camera_denied = true;
                effects.push(Effect::Blocked);
            }
            (SessionPhase::Setup, SessionEvent::Begin) => {
                if self.policy.needs_camera() && !self.camera_granted {
                    return Err(SessionEventError::CameraRequired);
                }
                self.start(now, &mut effects);
            }

            // ── in progress ──
            (SessionPhase::InProgress, SessionEvent::Tick) => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs == 0 {
                    self.begin_submit(SubmitReason::TimeUp, &mut effects);
                }
            }
            (SessionPhase::InProgress, SessionEvent::Answer { question_id, answer }) => {
                if !self.order.contains(question_id) {
                    return Err(SessionEventError::UnknownQuestion(question_id));
                }
                if answer.trim().is_empty() {
                    self.answers.remove(&question_id);
                } else {
                    self.answers.insert(question_id, answer);
                }
            }
            (SessionPhase::InProgress, SessionEvent::Next) => {
                self.order.next();
            }
            (SessionPhase::InProgress, SessionEvent::Previous) => {
                self.order.previous();
            }
            (SessionPhase::InProgress, SessionEvent::Jump { section, index }) => {
                if !self.order.jump(section, index) {
                    return Err(SessionEventError::NoSuchPosition { section, index });
                }
            }
            (SessionPhase::InProgress, SessionEvent::VisibilityHidden) => {
                self.counters.tab_switches += 1;
                self.violation(ViolationKind::TabSwitch, &mut effects);
                let count = self.counters.tab_switches;
                if self.phase != SessionPhase::InProgress {
                    // The ledger already halted the exam.
                } else if count >= self.max_tab_switches {
                    self.begin_submit(SubmitReason::TabSwitchLimit, &mut effects);
                } else {
                    effects.push(Effect::TabSwitchWarning {
                        count,
                        remaining: self.max_tab_switches - count,
                    });
                }
            }
            (SessionPhase::InProgress, SessionEvent::FullscreenExited) => {
                self.violation(ViolationKind::FullscreenExit, &mut effects);
            }
            (SessionPhase::InProgress, SessionEvent::Clipboard { paste }) => {
                if self.policy.blocks_clipboard() {
                    self.counters.copy_paste_attempts += 1;
                    let kind = if paste {
                        ViolationKind::PasteAttempt
                    } else {
                        ViolationKind::CopyAttempt
                    };
                    self.violation(kind, &mut effects);
                }
            }
            (SessionPhase::InProgress, SessionEvent::CameraFrame { brightness }) => {
                if self.policy.watches_camera() && self.camera.observe(brightness) {
                    self.counters.camera_blocked += 1;
                    self.violation(ViolationKind::CameraBlocked, &mut effects);
                }
            }
            (SessionPhase::InProgress, SessionEvent::ObjectScan { phones, persons }) => {
                if self.policy.watches_objects() {
                    if phones > 0 {
                        self.counters.phone_detections += 1;
                        self.violation(ViolationKind::PhoneDetected, &mut effects);
                    }
                    if persons == 0 {
                        self.counters.face_missing += 1;
                        self.violation(ViolationKind::FaceNotDetected, &mut effects);
                    } else if persons > 1 {
                        self.violation(ViolationKind::MultipleFaces, &mut effects);
                    }
                }
            }
            (SessionPhase::InProgress, SessionEvent::SubmitRequested) => {
                self.begin_submit(SubmitReason::Manual, &mut effects);
            }

            // ── submitting ──
            (SessionPhase::Submitting, SessionEvent::SubmitRequested) => {
                if !self.in_flight {
                    self.in_flight = true;
                    self.last_error = None;
                    effects.push(Effect::Submit {
                        reason: self.reason.unwrap_or(SubmitReason::Manual),
                    });
                }
            }
            (SessionPhase::Submitting, SessionEvent::SubmitFailed { message }) if self.in_flight => {
                self.in_flight = false;
                self.last_error = Some(message.clone());
                effects.push(Effect::SubmitFailed { message });
            }
            (SessionPhase::Submitting, SessionEvent::SubmitAcknowledged { submission_id })
                if self.in_flight =>
            {
                self.in_flight = false;
                self.phase = SessionPhase::Complete;
                self.submission_id = submission_id;
                effects.push(Effect::Completed { submission_id });
            }
            (SessionPhase::Submitting | SessionPhase::Complete, event)
                if event.is_observation() => {}
            (SessionPhase::Complete, SessionEvent::SubmitRequested) => {}

            (phase, event) => {
                return Err(SessionEventError::WrongPhase {
                    event: event.name(),
                    phase,
                });
            }
        }
        Ok(effects)
    }

    fn start(&mut self, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        self.phase = SessionPhase::InProgress;
        self.started_at = Some(now);
        effects.push(Effect::Started);
    }

    fn begin_submit(&mut self, reason: SubmitReason, effects: &mut Vec<Effect>) {
        if self.phase != SessionPhase::InProgress {
            return;
        }
        self.phase = SessionPhase::Submitting;
        self.in_flight = true;
        self.reason = Some(reason);
        effects.push(Effect::Submit { reason });
    }

    fn violation(&mut self, kind: ViolationKind, effects: &mut Vec<Effect>) {
        if !self.policy.enabled {
            return;
        }
        let action = self.ledger.record(kind);
        effects.push(Effect::Violation { kind, action });
        if action.halts() {
            self.begin_submit(SubmitReason::ViolationHalt, effects);
        }
    }

    /// The aggregated payload for grading, once submission has begun.
    #[must_use]
    pub fn payload(&self) -> Option<AttemptPayload> {
        let reason = self.reason?;
        Some(AttemptPayload {
            session: self.token,
            test_id: self.test_id,
            student_id: self.student_id,
            answers: self.answers.clone(),
            time_spent_secs: self.duration_secs - self.remaining_secs,
            counters: self.counters,
            proctoring_enabled: self.policy.enabled,
            violation_score: self.ledger.score(),
            reason,
        })
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            token: self.token,
            test_id: self.test_id,
            student_id: self.student_id,
            phase: self.phase,
            sections: self.order.sections(),
            section: self.order.current_section(),
            section_index: self.order.section_index(),
            question_index: self.order.question_index(),
            current_question: self.order.current(),
            question_order: self.order.flattened(),
            answers: self.answers.clone(),
            answered: self.answers.len(),
            total_questions: self.order.total(),
            remaining_secs: self.remaining_secs,
            counters: self.counters,
            violation_score: self.ledger.score(),
            camera_denied: self.camera_denied,
            submitting: self.in_flight,
            submit_reason: self.reason,
            last_error: self.last_error.clone(),
            submission_id: self.submission_id,
            started_at: self.started_at,
        }
    }

    #[must_use]
    pub fn token(&self) -> SessionToken {
        self.token
    }

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    #[must_use]
    pub fn student_id(&self) -> StudentId {
        self.student_id
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn counters(&self) -> ProctoringCounters {
        self.counters
    }

    #[must_use]
    pub fn ledger(&self) -> &ViolationLedger {
        &self.ledger
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, String> {
        &self.answers
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Read-only view of a session for clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub token: SessionToken,
    pub test_id: TestId,
    pub student_id: StudentId,
    pub phase: SessionPhase,
    pub sections: Vec<Section>,
    pub section: Option<Section>,
    pub section_index: usize,
    pub question_index: usize,
    pub current_question: Option<QuestionId>,
    pub question_order: Vec<QuestionId>,
    pub answers: BTreeMap<QuestionId, String>,
    pub answered: usize,
    pub total_questions: usize,
    pub remaining_secs: u32,
    pub counters: ProctoringCounters,
    pub violation_score: u32,
    pub camera_denied: bool,
    pub submitting: bool,
    pub submit_reason: Option<SubmitReason>,
    pub last_error: Option<String>,
    pub submission_id: Option<SubmissionId>,
    pub started_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    /// Final view of an exam rebuilt from its stored submission, once the
    /// live session is gone. Questions appear in graded order.
    #[must_use]
    pub fn archived(submission: &Submission, duration_secs: u32) -> Self {
        let mut sections: Vec<Section> = Vec::new();
        for result in &submission.questions {
            if !sections.contains(&result.section) {
                sections.push(result.section);
            }
        }
        let answers: BTreeMap<QuestionId, String> = submission
            .questions
            .iter()
            .filter(|q| q.user_answer != NOT_ANSWERED)
            .map(|q| (q.question_id, q.user_answer.clone()))
            .collect();

        Self {
            token: submission.session,
            test_id: submission.test_id,
            student_id: submission.student_id,
            phase: SessionPhase::Complete,
            sections,
            section: None,
            section_index: 0,
            question_index: 0,
            current_question: None,
            question_order: submission.questions.iter().map(|q| q.question_id).collect(),
            answered: answers.len(),
            answers,
            total_questions: submission.questions.len(),
            remaining_secs: duration_secs.saturating_sub(submission.time_spent_secs),
            counters: submission.counters,
            violation_score: submission.violation_score,
            camera_denied: false,
            submitting: false,
            submit_reason: Some(submission.reason),
            last_error: None,
            submission_id: submission.id,
            started_at: Some(
                submission.submitted_at
                    - chrono::Duration::seconds(i64::from(submission.time_spent_secs)),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionDraft, TestDraft, TestStatus};
    use crate::time::fixed_now;

    fn test_with(policy: ProctoringPolicy, minutes: u32) -> TestDefinition {
        TestDraft {
            title: "Placement".into(),
            status: TestStatus::Published,
            duration_minutes: minutes,
            proctoring: policy,
            ..TestDraft::default()
        }
        .validate(TestId::new(7), fixed_now(), 2)
        .unwrap()
    }

    fn questions() -> Vec<Question> {
        (1..=2)
            .map(|id| {
                QuestionDraft {
                    prompt: format!("Q{id}"),
                    options: vec!["yes".into(), "no".into()],
                    correct_answer: "0".into(),
                    ..QuestionDraft::default()
                }
                .validate(QuestionId::new(id), TestId::new(7), Section::Aptitude)
                .unwrap()
            })
            .collect()
    }

    fn session(policy: ProctoringPolicy) -> ExamSession {
        let test = test_with(policy, 1);
        ExamSession::new(
            SessionToken::generate(),
            &test,
            StudentId::new(11),
            &questions(),
            fixed_now(),
        )
        .unwrap()
    }

    fn started(policy: ProctoringPolicy) -> ExamSession {
        let mut s = session(policy);
        s.apply(SessionEvent::CameraGranted, fixed_now()).unwrap();
        s
    }

    fn submits(effects: &[Effect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::Submit { .. }))
            .count()
    }

    #[test]
    fn camera_denial_keeps_the_session_in_setup() {
        let mut s = session(ProctoringPolicy::strict());
        let effects = s.apply(SessionEvent::CameraDenied, fixed_now()).unwrap();
        assert_eq!(effects, vec![Effect::Blocked]);
        assert_eq!(s.phase(), SessionPhase::Setup);
        assert_eq!(
            s.apply(SessionEvent::Begin, fixed_now()),
            Err(SessionEventError::CameraRequired)
        );

        let effects = s.apply(SessionEvent::CameraGranted, fixed_now()).unwrap();
        assert_eq!(effects, vec![Effect::Started]);
        assert_eq!(s.phase(), SessionPhase::InProgress);
    }

    #[test]
    fn begin_without_camera_when_policy_allows() {
        let mut s = session(ProctoringPolicy::default());
        assert_eq!(
            s.apply(SessionEvent::Begin, fixed_now()).unwrap(),
            vec![Effect::Started]
        );
        assert_eq!(
            s.apply(SessionEvent::Begin, fixed_now()),
            Err(SessionEventError::WrongPhase {
                event: "begin",
                phase: SessionPhase::InProgress
            })
        );
    }

    #[test]
    fn third_tab_switch_auto_submits() {
        let mut s = started(ProctoringPolicy::default());
        let first = s.apply(SessionEvent::VisibilityHidden, fixed_now()).unwrap();
        assert_eq!(
            first,
            vec![Effect::TabSwitchWarning {
                count: 1,
                remaining: 2
            }]
        );
        s.apply(SessionEvent::VisibilityHidden, fixed_now()).unwrap();
        assert_eq!(s.phase(), SessionPhase::InProgress);

        let third = s.apply(SessionEvent::VisibilityHidden, fixed_now()).unwrap();
        assert_eq!(
            third,
            vec![Effect::Submit {
                reason: SubmitReason::TabSwitchLimit
            }]
        );
        assert_eq!(s.phase(), SessionPhase::Submitting);

        // Further switches after submission are ignored.
        assert!(s
            .apply(SessionEvent::VisibilityHidden, fixed_now())
            .unwrap()
            .is_empty());
        assert_eq!(s.counters().tab_switches, 3);
    }

    #[test]
    fn halting_tab_switch_skips_the_warning() {
        let mut s = started(ProctoringPolicy::strict());
        for _ in 0..5 {
            s.apply(SessionEvent::FullscreenExited, fixed_now()).unwrap();
        }
        assert_eq!(s.ledger().score(), 75);
        assert_eq!(s.phase(), SessionPhase::InProgress);

        let effects = s.apply(SessionEvent::VisibilityHidden, fixed_now()).unwrap();
        assert_eq!(
            effects,
            vec![
                Effect::Violation {
                    kind: ViolationKind::TabSwitch,
                    action: HaltAction::HaltScore,
                },
                Effect::Submit {
                    reason: SubmitReason::ViolationHalt
                },
            ]
        );
        assert_eq!(s.phase(), SessionPhase::Submitting);
    }

    #[test]
    fn timer_submits_exactly_once_at_zero() {
        let mut s = started(ProctoringPolicy::default());
        let mut total = 0;
        for _ in 0..120 {
            total += submits(&s.apply(SessionEvent::Tick, fixed_now()).unwrap());
        }
        assert_eq!(total, 1);
        assert_eq!(s.remaining_secs(), 0);
        let payload = s.payload().unwrap();
        assert_eq!(payload.reason, SubmitReason::TimeUp);
        assert_eq!(payload.time_spent_secs, 60);
    }

    #[test]
    fn double_submit_is_sent_once() {
        let mut s = started(ProctoringPolicy::default());
        let first = s.apply(SessionEvent::SubmitRequested, fixed_now()).unwrap();
        let second = s.apply(SessionEvent::SubmitRequested, fixed_now()).unwrap();
        assert_eq!(submits(&first), 1);
        assert!(second.is_empty());
        assert!(s.is_in_flight());
    }

    #[test]
    fn failed_submit_stays_submitting_and_can_be_retried() {
        let mut s = started(ProctoringPolicy::default());
        s.apply(SessionEvent::SubmitRequested, fixed_now()).unwrap();
        let failed = s
            .apply(
                SessionEvent::SubmitFailed {
                    message: "db down".into(),
                },
                fixed_now(),
            )
            .unwrap();
        assert_eq!(
            failed,
            vec![Effect::SubmitFailed {
                message: "db down".into()
            }]
        );
        assert_eq!(s.phase(), SessionPhase::Submitting);
        assert_eq!(s.snapshot().last_error.as_deref(), Some("db down"));

        let retry = s.apply(SessionEvent::SubmitRequested, fixed_now()).unwrap();
        assert_eq!(
            retry,
            vec![Effect::Submit {
                reason: SubmitReason::Manual
            }]
        );

        let done = s
            .apply(
                SessionEvent::SubmitAcknowledged {
                    submission_id: Some(SubmissionId::new(4)),
                },
                fixed_now(),
            )
            .unwrap();
        assert_eq!(
            done,
            vec![Effect::Completed {
                submission_id: Some(SubmissionId::new(4))
            }]
        );
        assert_eq!(s.phase(), SessionPhase::Complete);
        assert!(s
            .apply(SessionEvent::SubmitRequested, fixed_now())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn answers_are_scoped_to_the_exam() {
        let mut s = started(ProctoringPolicy::default());
        s.apply(
            SessionEvent::Answer {
                question_id: QuestionId::new(1),
                answer: "yes".into(),
            },
            fixed_now(),
        )
        .unwrap();
        assert_eq!(
            s.apply(
                SessionEvent::Answer {
                    question_id: QuestionId::new(99),
                    answer: "yes".into(),
                },
                fixed_now(),
            ),
            Err(SessionEventError::UnknownQuestion(QuestionId::new(99)))
        );
        s.apply(
            SessionEvent::Answer {
                question_id: QuestionId::new(1),
                answer: "  ".into(),
            },
            fixed_now(),
        )
        .unwrap();
        assert!(s.answers().is_empty());
    }

    #[test]
    fn camera_blocking_counts_edges_only() {
        let mut s = started(ProctoringPolicy::strict());
        for brightness in [90.0, 4.0, 3.0, 2.0, 80.0, 10.0] {
            s.apply(SessionEvent::CameraFrame { brightness }, fixed_now())
                .unwrap();
        }
        assert_eq!(s.counters().camera_blocked, 2);
        assert_eq!(s.ledger().score(), 30);
    }

    #[test]
    fn clipboard_is_ignored_unless_policy_blocks_it() {
        let mut s = started(ProctoringPolicy {
            enabled: true,
            ..ProctoringPolicy::default()
        });
        let effects = s
            .apply(SessionEvent::Clipboard { paste: true }, fixed_now())
            .unwrap();
        assert!(effects.is_empty());
        assert_eq!(s.counters().copy_paste_attempts, 0);
    }

    #[test]
    fn two_phone_detections_halt_the_exam() {
        let mut s = started(ProctoringPolicy::strict());
        let scan = SessionEvent::ObjectScan {
            phones: 1,
            persons: 1,
        };
        s.apply(scan.clone(), fixed_now()).unwrap();
        let effects = s.apply(scan, fixed_now()).unwrap();
        assert_eq!(
            effects,
            vec![
                Effect::Violation {
                    kind: ViolationKind::PhoneDetected,
                    action: HaltAction::HaltAuto
                },
                Effect::Submit {
                    reason: SubmitReason::ViolationHalt
                }
            ]
        );
        assert_eq!(s.counters().phone_detections, 2);
    }

    #[test]
    fn events_deserialize_from_tagged_json() {
        let event: SessionEvent =
            serde_json::from_str(r#"{"type":"answer","questionId":3,"answer":"B"}"#).unwrap();
        assert_eq!(
            event,
            SessionEvent::Answer {
                question_id: QuestionId::new(3),
                answer: "B".into()
            }
        );
        let scan: SessionEvent =
            serde_json::from_str(r#"{"type":"object_scan","phones":0,"persons":2}"#).unwrap();
        assert_eq!(scan.name(), "object_scan");
    }
}
