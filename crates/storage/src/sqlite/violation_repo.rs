use mentor_core::model::{SessionToken, ViolationRecord};

use super::SqliteRepository;
use super::mapping::map_violation_row;
use crate::repository::{StorageError, ViolationRepository};

#[async_trait::async_trait]
impl ViolationRepository for SqliteRepository {
    async fn append_violation(&self, record: &ViolationRecord) -> Result<i64, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO violations (session_token, kind, points, severity, recorded_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(record.session.to_string())
        .bind(record.kind.as_str())
        .bind(i64::from(record.points))
        .bind(record.severity.as_str())
        .bind(record.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.last_insert_rowid())
    }

    async fn violations_for_session(
        &self,
        session: SessionToken,
    ) -> Result<Vec<ViolationRecord>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT session_token, kind, points, severity, recorded_at
                FROM violations
                WHERE session_token = ?1
                ORDER BY recorded_at ASC, id ASC
            ",
        )
        .bind(session.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_violation_row(&row)?);
        }
        Ok(out)
    }
}
