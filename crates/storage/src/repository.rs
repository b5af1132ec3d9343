use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mentor_core::model::{
    Question, QuestionDraft, QuestionId, Section, SessionToken, StudentId, Submission,
    SubmissionId, TestDefinition, TestDraft, TestId, TestKind, TestStatus, ViolationRecord,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// A validated test that has not been assigned an id yet.
#[derive(Debug, Clone)]
pub struct NewTestRecord {
    pub draft: TestDraft,
    pub created_at: DateTime<Utc>,
}

impl NewTestRecord {
    #[must_use]
    pub fn from_test(test: &TestDefinition) -> Self {
        Self {
            draft: test.draft().clone(),
            created_at: test.created_at(),
        }
    }
}

/// A validated question waiting for an id.
#[derive(Debug, Clone)]
pub struct NewQuestionRecord {
    pub section: Section,
    pub draft: QuestionDraft,
}

impl NewQuestionRecord {
    #[must_use]
    pub fn from_question(question: &Question) -> Self {
        Self {
            section: question.section(),
            draft: QuestionDraft {
                kind: question.kind(),
                prompt: question.prompt().to_owned(),
                options: question.options().to_vec(),
                correct_answer: question.correct_answer().to_owned(),
                explanation: question.explanation().map(str::to_owned),
                category: Some(question.category().to_owned()),
                code: question.code().cloned(),
                points: Some(question.points()),
                time_limit_secs: question.time_limit_secs(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestFilter {
    pub status: Option<TestStatus>,
    pub kind: Option<TestKind>,
}

impl TestFilter {
    #[must_use]
    pub fn matches(&self, test: &TestDefinition) -> bool {
        self.status.is_none_or(|s| s == test.status()) && self.kind.is_none_or(|k| k == test.kind())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubmissionFilter {
    pub test_id: Option<TestId>,
    pub student_id: Option<StudentId>,
}

impl SubmissionFilter {
    #[must_use]
    pub fn matches(&self, submission: &Submission) -> bool {
        self.test_id.is_none_or(|t| t == submission.test_id)
            && self.student_id.is_none_or(|s| s == submission.student_id)
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for test definitions.
#[async_trait]
pub trait TestRepository: Send + Sync {
    /// Insert a new test and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the test cannot be stored.
    async fn insert_new_test(&self, test: NewTestRecord) -> Result<TestId, StorageError>;

    /// Overwrite an existing test.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the test does not exist.
    async fn update_test(&self, test: &TestDefinition) -> Result<(), StorageError>;

    /// Fetch a test by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_test(&self, id: TestId) -> Result<Option<TestDefinition>, StorageError>;

    /// List tests, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_tests(&self, filter: TestFilter) -> Result<Vec<TestDefinition>, StorageError>;

    /// Delete a test together with its questions and submissions.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the test does not exist.
    async fn delete_test(&self, id: TestId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Insert questions for a test in one batch, returning ids in input order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any question cannot be stored; nothing is stored then.
    async fn insert_questions(
        &self,
        test_id: TestId,
        questions: Vec<NewQuestionRecord>,
    ) -> Result<Vec<QuestionId>, StorageError>;

    /// Questions of a test in canonical section order, then by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_questions(
        &self,
        test_id: TestId,
        section: Option<Section>,
    ) -> Result<Vec<Question>, StorageError>;

    /// Remove questions of a test (optionally one section). Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn delete_questions(
        &self,
        test_id: TestId,
        section: Option<Section>,
    ) -> Result<u32, StorageError>;

    /// Number of questions stored for a test.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn count_questions(&self, test_id: TestId) -> Result<u32, StorageError>;
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    /// Persist a graded submission with its section and question results.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the session already has a submission.
    async fn insert_submission(&self, submission: &Submission)
    -> Result<SubmissionId, StorageError>;

    /// Fetch a submission by id. Returns `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn get_submission(&self, id: SubmissionId) -> Result<Option<Submission>, StorageError>;

    /// Fetch the submission recorded for an exam session, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn submission_for_session(
        &self,
        session: SessionToken,
    ) -> Result<Option<Submission>, StorageError>;

    /// List submissions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn list_submissions(
        &self,
        filter: SubmissionFilter,
    ) -> Result<Vec<Submission>, StorageError>;

    /// How many times a student has submitted a test.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn count_attempts(
        &self,
        test_id: TestId,
        student_id: StudentId,
    ) -> Result<u32, StorageError>;

    /// Delete a submission and its results.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the submission does not exist.
    async fn delete_submission(&self, id: SubmissionId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait ViolationRepository: Send + Sync {
    /// Append a violation to the session's log.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn append_violation(&self, record: &ViolationRecord) -> Result<i64, StorageError>;

    /// All violations of a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on repository failures.
    async fn violations_for_session(
        &self,
        session: SessionToken,
    ) -> Result<Vec<ViolationRecord>, StorageError>;
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

fn lock_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn next_id(counter: &AtomicU64) -> u64 {
    counter.fetch_add(1, Ordering::SeqCst) + 1
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    tests: Arc<Mutex<HashMap<TestId, TestDefinition>>>,
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    submissions: Arc<Mutex<HashMap<SubmissionId, Submission>>>,
    violations: Arc<Mutex<Vec<ViolationRecord>>>,
    test_ids: Arc<AtomicU64>,
    question_ids: Arc<AtomicU64>,
    submission_ids: Arc<AtomicU64>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TestRepository for InMemoryRepository {
    async fn insert_new_test(&self, test: NewTestRecord) -> Result<TestId, StorageError> {
        let id = TestId::new(next_id(&self.test_ids));
        let definition = test
            .draft
            .validate(id, test.created_at, 0)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.tests.lock().map_err(lock_err)?.insert(id, definition);
        Ok(id)
    }

    async fn update_test(&self, test: &TestDefinition) -> Result<(), StorageError> {
        let mut guard = self.tests.lock().map_err(lock_err)?;
        let slot = guard.get_mut(&test.id()).ok_or(StorageError::NotFound)?;
        *slot = test.clone();
        Ok(())
    }

    async fn get_test(&self, id: TestId) -> Result<Option<TestDefinition>, StorageError> {
        let guard = self.tests.lock().map_err(lock_err)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_tests(&self, filter: TestFilter) -> Result<Vec<TestDefinition>, StorageError> {
        let guard = self.tests.lock().map_err(lock_err)?;
        let mut tests: Vec<_> = guard.values().filter(|t| filter.matches(t)).cloned().collect();
        tests.sort_by(|a, b| b.created_at().cmp(&a.created_at()).then(b.id().cmp(&a.id())));
        Ok(tests)
    }

    async fn delete_test(&self, id: TestId) -> Result<(), StorageError> {
        self.tests
            .lock()
            .map_err(lock_err)?
            .remove(&id)
            .ok_or(StorageError::NotFound)?;
        self.questions
            .lock()
            .map_err(lock_err)?
            .retain(|_, q| q.test_id() != id);
        self.submissions
            .lock()
            .map_err(lock_err)?
            .retain(|_, s| s.test_id != id);
        Ok(())
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_questions(
        &self,
        test_id: TestId,
        questions: Vec<NewQuestionRecord>,
    ) -> Result<Vec<QuestionId>, StorageError> {
        if !self.tests.lock().map_err(lock_err)?.contains_key(&test_id) {
            return Err(StorageError::NotFound);
        }
        let mut validated = Vec::with_capacity(questions.len());
        for record in questions {
            let id = QuestionId::new(next_id(&self.question_ids));
            let question = record
                .draft
                .validate(id, test_id, record.section)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            validated.push(question);
        }
        let mut guard = self.questions.lock().map_err(lock_err)?;
        let ids = validated.iter().map(Question::id).collect();
        for question in validated {
            guard.insert(question.id(), question);
        }
        Ok(ids)
    }

    async fn list_questions(
        &self,
        test_id: TestId,
        section: Option<Section>,
    ) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        let mut found: Vec<_> = guard
            .values()
            .filter(|q| q.test_id() == test_id && section.is_none_or(|s| s == q.section()))
            .cloned()
            .collect();
        found.sort_by_key(|q| (q.section(), q.id()));
        Ok(found)
    }

    async fn delete_questions(
        &self,
        test_id: TestId,
        section: Option<Section>,
    ) -> Result<u32, StorageError> {
        let mut guard = self.questions.lock().map_err(lock_err)?;
        let before = guard.len();
        guard.retain(|_, q| !(q.test_id() == test_id && section.is_none_or(|s| s == q.section())));
        Ok(u32::try_from(before - guard.len()).unwrap_or(u32::MAX))
    }

    async fn count_questions(&self, test_id: TestId) -> Result<u32, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        let count = guard.values().filter(|q| q.test_id() == test_id).count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

#[async_trait]
impl SubmissionRepository for InMemoryRepository {
    async fn insert_submission(
        &self,
        submission: &Submission,
    ) -> Result<SubmissionId, StorageError> {
        let mut guard = self.submissions.lock().map_err(lock_err)?;
        if guard.values().any(|s| s.session == submission.session) {
            return Err(StorageError::Conflict);
        }
        let id = SubmissionId::new(next_id(&self.submission_ids));
        let mut stored = submission.clone();
        stored.id = Some(id);
        guard.insert(id, stored);
        Ok(id)
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<Option<Submission>, StorageError> {
        let guard = self.submissions.lock().map_err(lock_err)?;
        Ok(guard.get(&id).cloned())
    }

    async fn submission_for_session(
        &self,
        session: SessionToken,
    ) -> Result<Option<Submission>, StorageError> {
        let guard = self.submissions.lock().map_err(lock_err)?;
        Ok(guard.values().find(|s| s.session == session).cloned())
    }

    async fn list_submissions(
        &self,
        filter: SubmissionFilter,
    ) -> Result<Vec<Submission>, StorageError> {
        let guard = self.submissions.lock().map_err(lock_err)?;
        let mut found: Vec<_> = guard.values().filter(|s| filter.matches(s)).cloned().collect();
        found.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn count_attempts(
        &self,
        test_id: TestId,
        student_id: StudentId,
    ) -> Result<u32, StorageError> {
        let guard = self.submissions.lock().map_err(lock_err)?;
        let count = guard
            .values()
            .filter(|s| s.test_id == test_id && s.student_id == student_id)
            .count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    async fn delete_submission(&self, id: SubmissionId) -> Result<(), StorageError> {
        self.submissions
            .lock()
            .map_err(lock_err)?
            .remove(&id)
            .map(|_| ())
            .ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ViolationRepository for InMemoryRepository {
    async fn append_violation(&self, record: &ViolationRecord) -> Result<i64, StorageError> {
        let mut guard = self.violations.lock().map_err(lock_err)?;
        guard.push(record.clone());
        Ok(i64::try_from(guard.len()).unwrap_or(i64::MAX))
    }

    async fn violations_for_session(
        &self,
        session: SessionToken,
    ) -> Result<Vec<ViolationRecord>, StorageError> {
        let guard = self.violations.lock().map_err(lock_err)?;
        Ok(guard.iter().filter(|v| v.session == session).cloned().collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub tests: Arc<dyn TestRepository>,
    pub questions: Arc<dyn QuestionRepository>,
    pub submissions: Arc<dyn SubmissionRepository>,
    pub violations: Arc<dyn ViolationRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            tests: Arc::new(repo.clone()),
            questions: Arc::new(repo.clone()),
            submissions: Arc::new(repo.clone()),
            violations: Arc::new(repo),
        }
    }
}
