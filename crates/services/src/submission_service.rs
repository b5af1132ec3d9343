use std::sync::Arc;

use mentor_core::model::{Submission, SubmissionId};
use storage::repository::{StorageError, SubmissionFilter, SubmissionRepository};
use tracing::info;

/// Read access to graded submissions, plus admin deletion.
#[derive(Clone)]
pub struct SubmissionService {
    submissions: Arc<dyn SubmissionRepository>,
}

impl SubmissionService {
    #[must_use]
    pub fn new(submissions: Arc<dyn SubmissionRepository>) -> Self {
        Self { submissions }
    }

    /// List submissions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    pub async fn list(&self, filter: SubmissionFilter) -> Result<Vec<Submission>, StorageError> {
        self.submissions.list_submissions(filter).await
    }

    /// Fetch a submission by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if repository access fails.
    pub async fn get(&self, id: SubmissionId) -> Result<Option<Submission>, StorageError> {
        self.submissions.get_submission(id).await
    }

    /// Delete a submission, which also frees one attempt for the student.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the submission does not exist.
    pub async fn delete(&self, id: SubmissionId) -> Result<(), StorageError> {
        self.submissions.delete_submission(id).await?;
        info!(submission_id = %id, "submission deleted");
        Ok(())
    }
}
