use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::model::ids::{QuestionId, SessionToken, StudentId, SubmissionId, TestId};
use crate::model::section::{Section, UnknownVariant};

/// Per-attempt tallies of what the proctoring observers reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ProctoringCounters {
    pub tab_switches: u32,
    pub camera_blocked: u32,
    pub phone_detections: u32,
    pub copy_paste_attempts: u32,
    pub face_missing: u32,
}

/// Why a session moved to submitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    /// The student pressed submit.
    Manual,
    /// The countdown reached zero.
    TimeUp,
    /// Tab switches reached the test's limit.
    TabSwitchLimit,
    /// The violation ledger demanded a halt.
    ViolationHalt,
}

impl SubmitReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubmitReason::Manual => "manual",
            SubmitReason::TimeUp => "time_up",
            SubmitReason::TabSwitchLimit => "tab_switch_limit",
            SubmitReason::ViolationHalt => "violation_halt",
        }
    }

    #[must_use]
    pub fn is_automatic(self) -> bool {
        !matches!(self, SubmitReason::Manual)
    }
}

impl FromStr for SubmitReason {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(SubmitReason::Manual),
            "time_up" => Ok(SubmitReason::TimeUp),
            "tab_switch_limit" => Ok(SubmitReason::TabSwitchLimit),
            "violation_halt" => Ok(SubmitReason::ViolationHalt),
            _ => Err(UnknownVariant {
                kind: "submit reason",
                raw: s.to_owned(),
            }),
        }
    }
}

/// The single aggregated payload a finished session hands to grading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptPayload {
    pub session: SessionToken,
    pub test_id: TestId,
    pub student_id: StudentId,
    pub answers: BTreeMap<QuestionId, String>,
    pub time_spent_secs: u32,
    pub counters: ProctoringCounters,
    pub proctoring_enabled: bool,
    pub violation_score: u32,
    pub reason: SubmitReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Passed,
    Failed,
}

impl SubmissionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Passed => "passed",
            SubmissionStatus::Failed => "failed",
        }
    }
}

impl FromStr for SubmissionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "passed" => Ok(SubmissionStatus::Passed),
            "failed" => Ok(SubmissionStatus::Failed),
            _ => Err(UnknownVariant {
                kind: "submission status",
                raw: s.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: QuestionId,
    pub section: Section,
    pub user_answer: String,
    pub correct_answer: String,
    pub is_correct: bool,
    pub points_earned: u32,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResult {
    pub section: Section,
    pub correct_count: u32,
    pub total_questions: u32,
    /// Points-weighted score, 0..=100.
    pub score: u32,
    /// Share of correct answers, 0..=100.
    pub percent: u32,
}

/// A graded attempt. `id` is `None` until storage assigns one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Option<SubmissionId>,
    pub session: SessionToken,
    pub test_id: TestId,
    pub test_title: String,
    pub student_id: StudentId,
    pub sections: Vec<SectionResult>,
    pub total_score: u32,
    pub overall_percent: u32,
    pub status: SubmissionStatus,
    pub time_spent_secs: u32,
    pub counters: ProctoringCounters,
    pub violation_score: u32,
    pub reason: SubmitReason,
    pub submitted_at: DateTime<Utc>,
    pub questions: Vec<QuestionResult>,
}

impl Submission {
    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.sections.iter().map(|s| s.correct_count).sum()
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.sections.iter().map(|s| s.total_questions).sum()
    }

    #[must_use]
    pub fn section_score(&self, section: Section) -> u32 {
        self.sections
            .iter()
            .find(|s| s.section == section)
            .map_or(0, |s| s.score)
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.status == SubmissionStatus::Passed
    }
}
