use std::sync::Arc;

use mentor_core::model::{
    Question, QuestionDraft, QuestionId, Section, TestDefinition, TestDraft, TestId, TestStatus,
};
use storage::repository::{
    NewQuestionRecord, NewTestRecord, QuestionRepository, TestFilter, TestRepository,
};
use tracing::info;

use crate::Clock;
use crate::error::CatalogError;

/// Authoring of tests and their question banks.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    tests: Arc<dyn TestRepository>,
    questions: Arc<dyn QuestionRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(
        clock: Clock,
        tests: Arc<dyn TestRepository>,
        questions: Arc<dyn QuestionRepository>,
    ) -> Self {
        Self {
            clock,
            tests,
            questions,
        }
    }

    /// Validate and persist a new test.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Test` for validation failures.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn create_test(&self, draft: TestDraft) -> Result<TestDefinition, CatalogError> {
        let now = self.clock.now();
        let test = draft.validate(TestId::new(1), now, 0)?;
        let test_id = self
            .tests
            .insert_new_test(NewTestRecord::from_test(&test))
            .await?;
        info!(test_id = %test_id, title = test.title(), "test created");
        self.require(test_id).await
    }

    /// Fetch a test by id. Returns `Ok(None)` when it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn get_test(&self, test_id: TestId) -> Result<Option<TestDefinition>, CatalogError> {
        Ok(self.tests.get_test(test_id).await?)
    }

    /// List tests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_tests(&self, filter: TestFilter) -> Result<Vec<TestDefinition>, CatalogError> {
        Ok(self.tests.list_tests(filter).await?)
    }

    /// Replace the editable fields of a test, keeping its id, creation time and
    /// question count.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::TestNotFound` if the test does not exist.
    /// Returns `CatalogError::Test` for validation failures.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn update_test(
        &self,
        test_id: TestId,
        draft: TestDraft,
    ) -> Result<TestDefinition, CatalogError> {
        let existing = self.require(test_id).await?;
        let updated = draft.validate(
            existing.id(),
            existing.created_at(),
            existing.total_questions(),
        )?;
        self.tests.update_test(&updated).await?;
        Ok(updated)
    }

    /// Mark a test as published so students can start it.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::TestNotFound` if the test does not exist.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn publish_test(&self, test_id: TestId) -> Result<TestDefinition, CatalogError> {
        let published = self
            .require(test_id)
            .await?
            .with_status(TestStatus::Published);
        self.tests.update_test(&published).await?;
        info!(test_id = %test_id, "test published");
        Ok(published)
    }

    /// Delete a test with its questions and submissions.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` (`NotFound` included) if deletion fails.
    pub async fn delete_test(&self, test_id: TestId) -> Result<(), CatalogError> {
        self.tests.delete_test(test_id).await?;
        info!(test_id = %test_id, "test deleted");
        Ok(())
    }

    /// Add a batch of questions to one section of a test.
    ///
    /// Every draft is validated before anything is written, so a bad entry
    /// leaves the bank untouched.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::TestNotFound` if the test does not exist.
    /// Returns `CatalogError::SectionNotAllowed` if a single-section test is
    /// given questions for another section.
    /// Returns `CatalogError::Question` for the first invalid draft.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn add_questions(
        &self,
        test_id: TestId,
        section: Section,
        drafts: Vec<QuestionDraft>,
    ) -> Result<Vec<QuestionId>, CatalogError> {
        let test = self.require(test_id).await?;
        if !test.allows_section(section) {
            return Err(CatalogError::SectionNotAllowed {
                kind: test.kind(),
                section,
            });
        }

        let mut records = Vec::with_capacity(drafts.len());
        for (index, draft) in drafts.into_iter().enumerate() {
            draft
                .clone()
                .validate(QuestionId::new(1), test_id, section)
                .map_err(|source| CatalogError::Question { index, source })?;
            records.push(NewQuestionRecord { section, draft });
        }

        let ids = self.questions.insert_questions(test_id, records).await?;
        self.refresh_total(test).await?;
        info!(test_id = %test_id, section = %section, added = ids.len(), "questions added");
        Ok(ids)
    }

    /// List a test's questions, optionally for a single section.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Storage` if repository access fails.
    pub async fn list_questions(
        &self,
        test_id: TestId,
        section: Option<Section>,
    ) -> Result<Vec<Question>, CatalogError> {
        Ok(self.questions.list_questions(test_id, section).await?)
    }

    /// Remove questions from a test (one section or all) and return how many went.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::TestNotFound` if the test does not exist.
    /// Returns `CatalogError::Storage` if persistence fails.
    pub async fn clear_questions(
        &self,
        test_id: TestId,
        section: Option<Section>,
    ) -> Result<u32, CatalogError> {
        let test = self.require(test_id).await?;
        let removed = self.questions.delete_questions(test_id, section).await?;
        self.refresh_total(test).await?;
        info!(test_id = %test_id, removed, "questions cleared");
        Ok(removed)
    }

    async fn require(&self, test_id: TestId) -> Result<TestDefinition, CatalogError> {
        self.tests
            .get_test(test_id)
            .await?
            .ok_or(CatalogError::TestNotFound(test_id))
    }

    async fn refresh_total(&self, test: TestDefinition) -> Result<(), CatalogError> {
        let total = self.questions.count_questions(test.id()).await?;
        if total != test.total_questions() {
            self.tests.update_test(&test.with_total_questions(total)).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mentor_core::model::{QuestionError, TestError, TestKind};
    use mentor_core::time::fixed_now;
    use storage::repository::Storage;

    fn service() -> CatalogService {
        let storage = Storage::in_memory();
        CatalogService::new(Clock::fixed(fixed_now()), storage.tests, storage.questions)
    }

    fn draft(title: &str, kind: TestKind) -> TestDraft {
        TestDraft {
            title: title.into(),
            kind,
            ..TestDraft::default()
        }
    }

    fn mcq(prompt: &str) -> QuestionDraft {
        QuestionDraft {
            prompt: prompt.into(),
            options: vec!["a".into(), "b".into()],
            correct_answer: "0".into(),
            ..QuestionDraft::default()
        }
    }

    #[tokio::test]
    async fn question_changes_keep_the_total_current() {
        let service = service();
        let test = service
            .create_test(draft("Placement", TestKind::Comprehensive))
            .await
            .unwrap();

        service
            .add_questions(test.id(), Section::Aptitude, vec![mcq("1"), mcq("2")])
            .await
            .unwrap();
        service
            .add_questions(test.id(), Section::Verbal, vec![mcq("3")])
            .await
            .unwrap();
        let fetched = service.get_test(test.id()).await.unwrap().unwrap();
        assert_eq!(fetched.total_questions(), 3);

        let removed = service
            .clear_questions(test.id(), Some(Section::Aptitude))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        let fetched = service.get_test(test.id()).await.unwrap().unwrap();
        assert_eq!(fetched.total_questions(), 1);
    }

    #[tokio::test]
    async fn single_section_tests_reject_other_sections() {
        let service = service();
        let test = service.create_test(draft("SQL", TestKind::Sql)).await.unwrap();

        let err = service
            .add_questions(test.id(), Section::Verbal, vec![mcq("1")])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::SectionNotAllowed { .. }));
    }

    #[tokio::test]
    async fn an_invalid_draft_rejects_the_whole_batch() {
        let service = service();
        let test = service
            .create_test(draft("Placement", TestKind::Comprehensive))
            .await
            .unwrap();

        let err = service
            .add_questions(
                test.id(),
                Section::Logical,
                vec![mcq("ok"), QuestionDraft::default()],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Question {
                index: 1,
                source: QuestionError::EmptyPrompt
            }
        ));
        assert!(service
            .list_questions(test.id(), None)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn update_keeps_identity_and_publish_flips_status() {
        let service = service();
        let test = service
            .create_test(draft("Draft title", TestKind::Comprehensive))
            .await
            .unwrap();
        assert_eq!(test.status(), TestStatus::Draft);

        let updated = service
            .update_test(test.id(), draft("Final title", TestKind::Comprehensive))
            .await
            .unwrap();
        assert_eq!(updated.id(), test.id());
        assert_eq!(updated.title(), "Final title");

        let published = service.publish_test(test.id()).await.unwrap();
        assert_eq!(published.status(), TestStatus::Published);

        let err = service
            .update_test(test.id(), draft("  ", TestKind::Comprehensive))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::Test(TestError::EmptyTitle)));
    }
}
