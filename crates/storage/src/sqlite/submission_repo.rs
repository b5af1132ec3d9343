use mentor_core::model::{SessionToken, StudentId, Submission, SubmissionId, TestId};
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    SUBMISSION_COLUMNS, bool_i64, id_i64, map_question_result_row, map_section_result_row,
    map_submission_row, submission_id_from_i64, u32_from_i64,
};
use crate::repository::{StorageError, SubmissionFilter, SubmissionRepository};

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

impl SqliteRepository {
    /// Attach section and question rows to a submission header.
    async fn hydrate(&self, row: &SqliteRow) -> Result<Submission, StorageError> {
        let mut submission = map_submission_row(row)?;
        let Some(id) = submission.id else {
            return Ok(submission);
        };
        let id = id_i64("submission_id", id.value())?;

        let sections = sqlx::query(
            r"
            SELECT section, correct_count, total_questions, score, percent
            FROM section_results WHERE submission_id = ?1
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        for row in &sections {
            submission.sections.push(map_section_result_row(row)?);
        }
        submission.sections.sort_by_key(|s| s.section);

        let questions = sqlx::query(
            r"
            SELECT question_id, section, user_answer, correct_answer, is_correct,
                   points_earned, explanation
            FROM question_results WHERE submission_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;
        for row in &questions {
            submission.questions.push(map_question_result_row(row)?);
        }

        Ok(submission)
    }
}

#[async_trait::async_trait]
impl SubmissionRepository for SqliteRepository {
    async fn insert_submission(
        &self,
        submission: &Submission,
    ) -> Result<SubmissionId, StorageError> {
        let c = submission.counters;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let res = sqlx::query(
            r"
            INSERT INTO submissions (
                session_token, test_id, test_title, student_id, total_score, overall_percent,
                status, time_spent_secs, tab_switches, camera_blocked, phone_detections,
                copy_paste_attempts, face_missing, violation_score, reason, submitted_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ",
        )
        .bind(submission.session.to_string())
        .bind(id_i64("test_id", submission.test_id.value())?)
        .bind(submission.test_title.clone())
        .bind(id_i64("student_id", submission.student_id.value())?)
        .bind(i64::from(submission.total_score))
        .bind(i64::from(submission.overall_percent))
        .bind(submission.status.as_str())
        .bind(i64::from(submission.time_spent_secs))
        .bind(i64::from(c.tab_switches))
        .bind(i64::from(c.camera_blocked))
        .bind(i64::from(c.phone_detections))
        .bind(i64::from(c.copy_paste_attempts))
        .bind(i64::from(c.face_missing))
        .bind(i64::from(submission.violation_score))
        .bind(submission.reason.as_str())
        .bind(submission.submitted_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                StorageError::Connection(e.to_string())
            }
        })?;
        let submission_id = res.last_insert_rowid();

        for section in &submission.sections {
            sqlx::query(
                r"
                INSERT INTO section_results (
                    submission_id, section, correct_count, total_questions, score, percent
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(submission_id)
            .bind(section.section.as_str())
            .bind(i64::from(section.correct_count))
            .bind(i64::from(section.total_questions))
            .bind(i64::from(section.score))
            .bind(i64::from(section.percent))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        for result in &submission.questions {
            sqlx::query(
                r"
                INSERT INTO question_results (
                    submission_id, question_id, section, user_answer, correct_answer,
                    is_correct, points_earned, explanation
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                ",
            )
            .bind(submission_id)
            .bind(id_i64("question_id", result.question_id.value())?)
            .bind(result.section.as_str())
            .bind(result.user_answer.clone())
            .bind(result.correct_answer.clone())
            .bind(bool_i64(result.is_correct))
            .bind(i64::from(result.points_earned))
            .bind(result.explanation.clone())
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        submission_id_from_i64(submission_id)
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<Option<Submission>, StorageError> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("submission_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => self.hydrate(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn submission_for_session(
        &self,
        session: SessionToken,
    ) -> Result<Option<Submission>, StorageError> {
        let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions WHERE session_token = ?1");
        let row = sqlx::query(&sql)
            .bind(session.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => self.hydrate(&row).await.map(Some),
            None => Ok(None),
        }
    }

    async fn list_submissions(
        &self,
        filter: SubmissionFilter,
    ) -> Result<Vec<Submission>, StorageError> {
        let sql = format!(
            r"
            SELECT {SUBMISSION_COLUMNS} FROM submissions
            WHERE (?1 IS NULL OR test_id = ?1) AND (?2 IS NULL OR student_id = ?2)
            ORDER BY submitted_at DESC, id DESC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(
                filter
                    .test_id
                    .map(|t| id_i64("test_id", t.value()))
                    .transpose()?,
            )
            .bind(
                filter
                    .student_id
                    .map(|s| id_i64("student_id", s.value()))
                    .transpose()?,
            )
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(self.hydrate(row).await?);
        }
        Ok(out)
    }

    async fn count_attempts(
        &self,
        test_id: TestId,
        student_id: StudentId,
    ) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM submissions WHERE test_id = ?1 AND student_id = ?2",
        )
        .bind(id_i64("test_id", test_id.value())?)
        .bind(id_i64("student_id", student_id.value())?)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        u32_from_i64("attempt count", count)
    }

    async fn delete_submission(&self, id: SubmissionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM submissions WHERE id = ?1")
            .bind(id_i64("submission_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
