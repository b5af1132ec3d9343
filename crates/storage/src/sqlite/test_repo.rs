use mentor_core::model::{TestDefinition, TestDraft, TestId};

use super::SqliteRepository;
use super::mapping::{TEST_COLUMNS, bool_i64, id_i64, map_test_row, test_id_from_i64};
use crate::repository::{NewTestRecord, StorageError, TestFilter, TestRepository};

fn created_by_i64(draft: &TestDraft) -> Result<Option<i64>, StorageError> {
    draft
        .created_by
        .map(|s| id_i64("created_by", s.value()))
        .transpose()
}

#[async_trait::async_trait]
impl TestRepository for SqliteRepository {
    async fn insert_new_test(&self, test: NewTestRecord) -> Result<TestId, StorageError> {
        let d = test.draft;
        let created_by = created_by_i64(&d)?;
        let p = d.proctoring;

        let res = sqlx::query(
            r"
            INSERT INTO tests (
                title, kind, difficulty, duration_minutes, passing_score, status, created_by,
                description, start_time, deadline, max_attempts, max_tab_switches,
                proctoring_enabled, require_camera, detect_camera_blocking, detect_phone,
                disable_copy_paste, total_questions, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, 0, ?18)
            ",
        )
        .bind(d.title)
        .bind(d.kind.as_str())
        .bind(d.difficulty)
        .bind(i64::from(d.duration_minutes))
        .bind(i64::from(d.passing_score))
        .bind(d.status.as_str())
        .bind(created_by)
        .bind(d.description)
        .bind(d.start_time)
        .bind(d.deadline)
        .bind(i64::from(d.max_attempts))
        .bind(i64::from(d.max_tab_switches))
        .bind(bool_i64(p.enabled))
        .bind(bool_i64(p.require_camera))
        .bind(bool_i64(p.detect_camera_blocking))
        .bind(bool_i64(p.detect_phone))
        .bind(bool_i64(p.disable_copy_paste))
        .bind(test.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        test_id_from_i64(res.last_insert_rowid())
    }

    async fn update_test(&self, test: &TestDefinition) -> Result<(), StorageError> {
        let d = test.draft();
        let p = d.proctoring;

        let res = sqlx::query(
            r"
            UPDATE tests SET
                title = ?2, kind = ?3, difficulty = ?4, duration_minutes = ?5,
                passing_score = ?6, status = ?7, created_by = ?8, description = ?9,
                start_time = ?10, deadline = ?11, max_attempts = ?12, max_tab_switches = ?13,
                proctoring_enabled = ?14, require_camera = ?15, detect_camera_blocking = ?16,
                detect_phone = ?17, disable_copy_paste = ?18, total_questions = ?19
            WHERE id = ?1
            ",
        )
        .bind(id_i64("test_id", test.id().value())?)
        .bind(d.title.clone())
        .bind(d.kind.as_str())
        .bind(d.difficulty.clone())
        .bind(i64::from(d.duration_minutes))
        .bind(i64::from(d.passing_score))
        .bind(d.status.as_str())
        .bind(created_by_i64(d)?)
        .bind(d.description.clone())
        .bind(d.start_time)
        .bind(d.deadline)
        .bind(i64::from(d.max_attempts))
        .bind(i64::from(d.max_tab_switches))
        .bind(bool_i64(p.enabled))
        .bind(bool_i64(p.require_camera))
        .bind(bool_i64(p.detect_camera_blocking))
        .bind(bool_i64(p.detect_phone))
        .bind(bool_i64(p.disable_copy_paste))
        .bind(i64::from(test.total_questions()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_test(&self, id: TestId) -> Result<Option<TestDefinition>, StorageError> {
        let sql = format!("SELECT {TEST_COLUMNS} FROM tests WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_i64("test_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_test_row).transpose()
    }

    async fn list_tests(&self, filter: TestFilter) -> Result<Vec<TestDefinition>, StorageError> {
        let sql = format!(
            r"
            SELECT {TEST_COLUMNS} FROM tests
            WHERE (?1 IS NULL OR status = ?1) AND (?2 IS NULL OR kind = ?2)
            ORDER BY created_at DESC, id DESC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.kind.map(|k| k.as_str()))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut tests = Vec::with_capacity(rows.len());
        for row in rows {
            tests.push(map_test_row(&row)?);
        }
        Ok(tests)
    }

    async fn delete_test(&self, id: TestId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM tests WHERE id = ?1")
            .bind(id_i64("test_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
