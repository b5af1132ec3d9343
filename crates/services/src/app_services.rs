use std::sync::Arc;

use storage::repository::Storage;
use tracing::info;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::error::AppServicesError;
use crate::exam::ExamService;
use crate::grading_service::{DisabledJudge, GradingService, HttpCodeJudge, JudgeConfig};
use crate::submission_service::SubmissionService;

/// Assembles the services the HTTP layer talks to.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogService>,
    exams: Arc<ExamService>,
    submissions: Arc<SubmissionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// Without a judge config, coding and SQL answers are graded as zero.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage or the judge client fails to initialize.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        judge: Option<JudgeConfig>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let grading = match judge {
            Some(config) => {
                info!(
                    judge_url = %config.base_url,
                    timeout_secs = config.timeout.as_secs(),
                    "code judge enabled"
                );
                let timeout = config.timeout;
                GradingService::new(Arc::new(HttpCodeJudge::new(config)?)).with_timeout(timeout)
            }
            None => {
                info!("no code judge configured; code answers score zero");
                GradingService::new(Arc::new(DisabledJudge))
            }
        };
        Ok(Self::from_storage(&storage, clock, grading))
    }

    /// Build services over an already opened storage bundle.
    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, grading: GradingService) -> Self {
        let catalog = Arc::new(CatalogService::new(
            clock,
            Arc::clone(&storage.tests),
            Arc::clone(&storage.questions),
        ));
        let exams = Arc::new(ExamService::new(
            clock,
            Arc::clone(&storage.tests),
            Arc::clone(&storage.questions),
            Arc::clone(&storage.submissions),
            Arc::clone(&storage.violations),
            grading,
        ));
        let submissions = Arc::new(SubmissionService::new(Arc::clone(&storage.submissions)));

        Self {
            catalog,
            exams,
            submissions,
        }
    }

    /// In-memory services for tests and demos.
    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(
            &Storage::in_memory(),
            clock,
            GradingService::new(Arc::new(DisabledJudge)),
        )
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn exams(&self) -> Arc<ExamService> {
        Arc::clone(&self.exams)
    }

    #[must_use]
    pub fn submissions(&self) -> Arc<SubmissionService> {
        Arc::clone(&self.submissions)
    }
}
