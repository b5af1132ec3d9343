use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};

use super::SqliteInitError;

async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
    let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
        .bind(version)
        .fetch_optional(pool)
        .await?;
    Ok(row.is_some())
}

async fn mark_applied(tx: &mut Transaction<'_, Sqlite>, version: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r"
            INSERT INTO schema_migrations (version, applied_at)
            VALUES (?1, ?2)
            ON CONFLICT(version) DO NOTHING
        ",
    )
    .bind(version)
    .bind(Utc::now())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Applies pending schema versions in order, each inside its own transaction.
///
/// 1. catalog: tests and questions
/// 2. results: submissions with per-section and per-question rows
/// 3. proctoring violation log
#[allow(clippy::too_many_lines)]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS tests (
                    id INTEGER PRIMARY KEY,
                    title TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    difficulty TEXT,
                    duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
                    passing_score INTEGER NOT NULL CHECK (passing_score BETWEEN 0 AND 100),
                    status TEXT NOT NULL,
                    created_by INTEGER,
                    description TEXT NOT NULL DEFAULT '',
                    start_time TEXT,
                    deadline TEXT,
                    max_attempts INTEGER NOT NULL CHECK (max_attempts > 0),
                    max_tab_switches INTEGER NOT NULL CHECK (max_tab_switches > 0),
                    proctoring_enabled INTEGER NOT NULL DEFAULT 0,
                    require_camera INTEGER NOT NULL DEFAULT 0,
                    detect_camera_blocking INTEGER NOT NULL DEFAULT 0,
                    detect_phone INTEGER NOT NULL DEFAULT 0,
                    disable_copy_paste INTEGER NOT NULL DEFAULT 0,
                    total_questions INTEGER NOT NULL DEFAULT 0 CHECK (total_questions >= 0),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS questions (
                    id INTEGER PRIMARY KEY,
                    test_id INTEGER NOT NULL,
                    section TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    prompt TEXT NOT NULL,
                    option_1 TEXT,
                    option_2 TEXT,
                    option_3 TEXT,
                    option_4 TEXT,
                    correct_answer TEXT NOT NULL DEFAULT '',
                    explanation TEXT,
                    category TEXT NOT NULL,
                    code_spec TEXT,
                    points INTEGER NOT NULL CHECK (points > 0),
                    time_limit_secs INTEGER,
                    FOREIGN KEY (test_id) REFERENCES tests(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_questions_test_section
                    ON questions (test_id, section, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_tests_status_created
                    ON tests (status, created_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        mark_applied(&mut tx, 1).await?;
        tx.commit().await?;
    }

    if !is_applied(pool, 2).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS submissions (
                    id INTEGER PRIMARY KEY,
                    session_token TEXT NOT NULL UNIQUE,
                    test_id INTEGER NOT NULL,
                    test_title TEXT NOT NULL,
                    student_id INTEGER NOT NULL,
                    total_score INTEGER NOT NULL CHECK (total_score >= 0),
                    overall_percent INTEGER NOT NULL CHECK (overall_percent BETWEEN 0 AND 100),
                    status TEXT NOT NULL,
                    time_spent_secs INTEGER NOT NULL CHECK (time_spent_secs >= 0),
                    tab_switches INTEGER NOT NULL DEFAULT 0,
                    camera_blocked INTEGER NOT NULL DEFAULT 0,
                    phone_detections INTEGER NOT NULL DEFAULT 0,
                    copy_paste_attempts INTEGER NOT NULL DEFAULT 0,
                    face_missing INTEGER NOT NULL DEFAULT 0,
                    violation_score INTEGER NOT NULL DEFAULT 0,
                    reason TEXT NOT NULL,
                    submitted_at TEXT NOT NULL,
                    FOREIGN KEY (test_id) REFERENCES tests(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS section_results (
                    submission_id INTEGER NOT NULL,
                    section TEXT NOT NULL,
                    correct_count INTEGER NOT NULL CHECK (correct_count >= 0),
                    total_questions INTEGER NOT NULL CHECK (total_questions >= 0),
                    score INTEGER NOT NULL,
                    percent INTEGER NOT NULL,
                    PRIMARY KEY (submission_id, section),
                    FOREIGN KEY (submission_id) REFERENCES submissions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        // No foreign key to questions: results outlive edits to the catalog.
        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS question_results (
                    id INTEGER PRIMARY KEY,
                    submission_id INTEGER NOT NULL,
                    question_id INTEGER NOT NULL,
                    section TEXT NOT NULL,
                    user_answer TEXT NOT NULL,
                    correct_answer TEXT NOT NULL,
                    is_correct INTEGER NOT NULL,
                    points_earned INTEGER NOT NULL CHECK (points_earned >= 0),
                    explanation TEXT,
                    FOREIGN KEY (submission_id) REFERENCES submissions(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_submissions_test_student
                    ON submissions (test_id, student_id, submitted_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_question_results_submission
                    ON question_results (submission_id, id);
            ",
        )
        .execute(&mut *tx)
        .await?;

        mark_applied(&mut tx, 2).await?;
        tx.commit().await?;
    }

    if !is_applied(pool, 3).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS violations (
                    id INTEGER PRIMARY KEY,
                    session_token TEXT NOT NULL,
                    kind TEXT NOT NULL,
                    points INTEGER NOT NULL CHECK (points >= 0),
                    severity TEXT NOT NULL,
                    recorded_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_violations_session_recorded
                    ON violations (session_token, recorded_at);
            ",
        )
        .execute(&mut *tx)
        .await?;

        mark_applied(&mut tx, 3).await?;
        tx.commit().await?;
    }

    Ok(())
}
