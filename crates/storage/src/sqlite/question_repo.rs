use mentor_core::model::{Question, QuestionId, Section, TestId};

use super::SqliteRepository;
use super::mapping::{
    QUESTION_COLUMNS, code_spec_to_json, id_i64, map_question_row, option_slots,
    question_id_from_i64, ser, u32_from_i64,
};
use crate::repository::{NewQuestionRecord, QuestionRepository, StorageError};

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_questions(
        &self,
        test_id: TestId,
        questions: Vec<NewQuestionRecord>,
    ) -> Result<Vec<QuestionId>, StorageError> {
        let test = id_i64("test_id", test_id.value())?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let exists = sqlx::query("SELECT 1 FROM tests WHERE id = ?1")
            .bind(test)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if exists.is_none() {
            return Err(StorageError::NotFound);
        }

        let mut ids = Vec::with_capacity(questions.len());
        for record in questions {
            // Validate before writing so a bad record aborts the whole batch.
            let question = record
                .draft
                .validate(QuestionId::new(1), test_id, record.section)
                .map_err(ser)?;
            let [o1, o2, o3, o4] = option_slots(question.options());

            let res = sqlx::query(
                r"
                INSERT INTO questions (
                    test_id, section, kind, prompt, option_1, option_2, option_3, option_4,
                    correct_answer, explanation, category, code_spec, points, time_limit_secs
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                ",
            )
            .bind(test)
            .bind(question.section().as_str())
            .bind(question.kind().as_str())
            .bind(question.prompt().to_owned())
            .bind(o1)
            .bind(o2)
            .bind(o3)
            .bind(o4)
            .bind(question.correct_answer().to_owned())
            .bind(question.explanation().map(str::to_owned))
            .bind(question.category().to_owned())
            .bind(code_spec_to_json(question.code())?)
            .bind(i64::from(question.points()))
            .bind(question.time_limit_secs().map(i64::from))
            .execute(&mut *tx)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

            ids.push(question_id_from_i64(res.last_insert_rowid())?);
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(ids)
    }

    async fn list_questions(
        &self,
        test_id: TestId,
        section: Option<Section>,
    ) -> Result<Vec<Question>, StorageError> {
        let sql = format!(
            r"
            SELECT {QUESTION_COLUMNS} FROM questions
            WHERE test_id = ?1 AND (?2 IS NULL OR section = ?2)
            ORDER BY id ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(id_i64("test_id", test_id.value())?)
            .bind(section.map(Section::as_str))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut questions = Vec::with_capacity(rows.len());
        for row in rows {
            questions.push(map_question_row(&row)?);
        }
        // Section text does not sort canonically in SQL.
        questions.sort_by_key(|q| (q.section(), q.id()));
        Ok(questions)
    }

    async fn delete_questions(
        &self,
        test_id: TestId,
        section: Option<Section>,
    ) -> Result<u32, StorageError> {
        let res = sqlx::query(
            r"
            DELETE FROM questions
            WHERE test_id = ?1 AND (?2 IS NULL OR section = ?2)
            ",
        )
        .bind(id_i64("test_id", test_id.value())?)
        .bind(section.map(Section::as_str))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        u32::try_from(res.rows_affected())
            .map_err(|_| StorageError::Serialization("deleted count overflow".into()))
    }

    async fn count_questions(&self, test_id: TestId) -> Result<u32, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE test_id = ?1")
            .bind(id_i64("test_id", test_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        u32_from_i64("question count", count)
    }
}
