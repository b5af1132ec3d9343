use chrono::{DateTime, Utc};
use mentor_core::model::{
    CodeSpec, ProctoringCounters, ProctoringPolicy, Question, QuestionDraft, QuestionId,
    QuestionResult, Section, SectionResult, SessionToken, Severity, StudentId, Submission,
    SubmissionId, TestDefinition, TestDraft, TestId, ViolationKind, ViolationRecord,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use std::str::FromStr;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

fn get_u32(row: &SqliteRow, field: &'static str) -> Result<u32, StorageError> {
    u32_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

fn get_bool(row: &SqliteRow, field: &'static str) -> Result<bool, StorageError> {
    Ok(row.try_get::<i64, _>(field).map_err(ser)? != 0)
}

fn get_parsed<T>(row: &SqliteRow, field: &'static str) -> Result<T, StorageError>
where
    T: FromStr,
    T::Err: core::fmt::Display,
{
    row.try_get::<String, _>(field)
        .map_err(ser)?
        .parse::<T>()
        .map_err(ser)
}

pub(crate) fn test_id_from_i64(v: i64) -> Result<TestId, StorageError> {
    Ok(TestId::new(i64_to_u64("test_id", v)?))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn submission_id_from_i64(v: i64) -> Result<SubmissionId, StorageError> {
    Ok(SubmissionId::new(i64_to_u64("submission_id", v)?))
}

pub(crate) fn student_id_from_i64(v: i64) -> Result<StudentId, StorageError> {
    Ok(StudentId::new(i64_to_u64("student_id", v)?))
}

pub(crate) fn bool_i64(v: bool) -> i64 {
    i64::from(v)
}

pub(crate) fn token_from_row(row: &SqliteRow) -> Result<SessionToken, StorageError> {
    get_parsed(row, "session_token")
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

pub(crate) const TEST_COLUMNS: &str = r"
    id, title, kind, difficulty, duration_minutes, passing_score, status, created_by,
    description, start_time, deadline, max_attempts, max_tab_switches,
    proctoring_enabled, require_camera, detect_camera_blocking, detect_phone,
    disable_copy_paste, total_questions, created_at
";

pub(crate) fn map_test_row(row: &SqliteRow) -> Result<TestDefinition, StorageError> {
    let draft = TestDraft {
        title: row.try_get("title").map_err(ser)?,
        kind: get_parsed(row, "kind")?,
        difficulty: row.try_get("difficulty").map_err(ser)?,
        duration_minutes: get_u32(row, "duration_minutes")?,
        passing_score: get_u32(row, "passing_score")?,
        status: get_parsed(row, "status")?,
        created_by: row
            .try_get::<Option<i64>, _>("created_by")
            .map_err(ser)?
            .map(student_id_from_i64)
            .transpose()?,
        description: row.try_get("description").map_err(ser)?,
        start_time: row.try_get("start_time").map_err(ser)?,
        deadline: row.try_get("deadline").map_err(ser)?,
        max_attempts: get_u32(row, "max_attempts")?,
        max_tab_switches: get_u32(row, "max_tab_switches")?,
        proctoring: ProctoringPolicy {
            enabled: get_bool(row, "proctoring_enabled")?,
            require_camera: get_bool(row, "require_camera")?,
            detect_camera_blocking: get_bool(row, "detect_camera_blocking")?,
            detect_phone: get_bool(row, "detect_phone")?,
            disable_copy_paste: get_bool(row, "disable_copy_paste")?,
        },
    };
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;

    draft
        .validate(
            test_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            created_at,
            get_u32(row, "total_questions")?,
        )
        .map_err(ser)
}

//
// ─── QUESTIONS ─────────────────────────────────────────────────────────────────
//

pub(crate) const QUESTION_COLUMNS: &str = r"
    id, test_id, section, kind, prompt, option_1, option_2, option_3, option_4,
    correct_answer, explanation, category, code_spec, points, time_limit_secs
";

/// Options are stored in four nullable columns.
pub(crate) fn option_slots(options: &[String]) -> [Option<String>; 4] {
    let mut slots: [Option<String>; 4] = Default::default();
    for (slot, option) in slots.iter_mut().zip(options) {
        *slot = Some(option.clone());
    }
    slots
}

pub(crate) fn code_spec_to_json(spec: Option<&CodeSpec>) -> Result<Option<String>, StorageError> {
    spec.map(|s| serde_json::to_string(s).map_err(ser))
        .transpose()
}

pub(crate) fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let mut options = Vec::with_capacity(4);
    for column in ["option_1", "option_2", "option_3", "option_4"] {
        if let Some(option) = row.try_get::<Option<String>, _>(column).map_err(ser)? {
            options.push(option);
        }
    }
    let code = row
        .try_get::<Option<String>, _>("code_spec")
        .map_err(ser)?
        .map(|raw| serde_json::from_str::<CodeSpec>(&raw).map_err(ser))
        .transpose()?;
    let time_limit_secs = row
        .try_get::<Option<i64>, _>("time_limit_secs")
        .map_err(ser)?
        .map(|v| u32_from_i64("time_limit_secs", v))
        .transpose()?;

    let draft = QuestionDraft {
        kind: get_parsed(row, "kind")?,
        prompt: row.try_get("prompt").map_err(ser)?,
        options,
        correct_answer: row.try_get("correct_answer").map_err(ser)?,
        explanation: row.try_get("explanation").map_err(ser)?,
        category: Some(row.try_get("category").map_err(ser)?),
        code,
        points: Some(get_u32(row, "points")?),
        time_limit_secs,
    };
    let section: Section = get_parsed(row, "section")?;

    draft
        .validate(
            question_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
            test_id_from_i64(row.try_get::<i64, _>("test_id").map_err(ser)?)?,
            section,
        )
        .map_err(ser)
}

//
// ─── SUBMISSIONS ───────────────────────────────────────────────────────────────
//

pub(crate) const SUBMISSION_COLUMNS: &str = r"
    id, session_token, test_id, test_title, student_id, total_score, overall_percent,
    status, time_spent_secs, tab_switches, camera_blocked, phone_detections,
    copy_paste_attempts, face_missing, violation_score, reason, submitted_at
";

/// Map the submission header; section and question rows are attached by the caller.
pub(crate) fn map_submission_row(row: &SqliteRow) -> Result<Submission, StorageError> {
    Ok(Submission {
        id: Some(submission_id_from_i64(
            row.try_get::<i64, _>("id").map_err(ser)?,
        )?),
        session: token_from_row(row)?,
        test_id: test_id_from_i64(row.try_get::<i64, _>("test_id").map_err(ser)?)?,
        test_title: row.try_get("test_title").map_err(ser)?,
        student_id: student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        sections: Vec::new(),
        total_score: get_u32(row, "total_score")?,
        overall_percent: get_u32(row, "overall_percent")?,
        status: get_parsed(row, "status")?,
        time_spent_secs: get_u32(row, "time_spent_secs")?,
        counters: ProctoringCounters {
            tab_switches: get_u32(row, "tab_switches")?,
            camera_blocked: get_u32(row, "camera_blocked")?,
            phone_detections: get_u32(row, "phone_detections")?,
            copy_paste_attempts: get_u32(row, "copy_paste_attempts")?,
            face_missing: get_u32(row, "face_missing")?,
        },
        violation_score: get_u32(row, "violation_score")?,
        reason: get_parsed(row, "reason")?,
        submitted_at: row.try_get("submitted_at").map_err(ser)?,
        questions: Vec::new(),
    })
}

pub(crate) fn map_section_result_row(row: &SqliteRow) -> Result<SectionResult, StorageError> {
    Ok(SectionResult {
        section: get_parsed(row, "section")?,
        correct_count: get_u32(row, "correct_count")?,
        total_questions: get_u32(row, "total_questions")?,
        score: get_u32(row, "score")?,
        percent: get_u32(row, "percent")?,
    })
}

pub(crate) fn map_question_result_row(row: &SqliteRow) -> Result<QuestionResult, StorageError> {
    Ok(QuestionResult {
        question_id: question_id_from_i64(row.try_get::<i64, _>("question_id").map_err(ser)?)?,
        section: get_parsed(row, "section")?,
        user_answer: row.try_get("user_answer").map_err(ser)?,
        correct_answer: row.try_get("correct_answer").map_err(ser)?,
        is_correct: get_bool(row, "is_correct")?,
        points_earned: get_u32(row, "points_earned")?,
        explanation: row.try_get("explanation").map_err(ser)?,
    })
}

//
// ─── VIOLATIONS ────────────────────────────────────────────────────────────────
//

pub(crate) fn map_violation_row(row: &SqliteRow) -> Result<ViolationRecord, StorageError> {
    let kind_raw: String = row.try_get("kind").map_err(ser)?;
    let kind = ViolationKind::parse(&kind_raw)
        .ok_or_else(|| StorageError::Serialization(format!("invalid violation kind: {kind_raw}")))?;
    let severity_raw: String = row.try_get("severity").map_err(ser)?;
    let severity = Severity::parse(&severity_raw)
        .ok_or_else(|| StorageError::Serialization(format!("invalid severity: {severity_raw}")))?;

    Ok(ViolationRecord {
        session: token_from_row(row)?,
        kind,
        points: get_u32(row, "points")?,
        severity,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
    })
}
