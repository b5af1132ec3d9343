#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod exam;
pub mod grading_service;
pub mod submission_service;

pub use mentor_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use error::{AppServicesError, CatalogError, ExamError, GradingError};
pub use exam::{ExamRegistry, ExamRunner, ExamService, SETUP_TIMEOUT_MINUTES};
pub use grading_service::{
    CodeJudge, DEFAULT_JUDGE_TIMEOUT, DisabledJudge, GradingService, HttpCodeJudge, JudgeConfig,
};
pub use submission_service::SubmissionService;
