use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use mentor_core::grading::{self, CodeVerdict};
use mentor_core::model::{AttemptPayload, CodeSpec, Question, QuestionId, Submission, TestDefinition};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GradingError;

//
// ─── JUDGE CONTRACT ────────────────────────────────────────────────────────────
//

/// Runs coding and SQL answers somewhere safe and reports how they did.
#[async_trait::async_trait]
pub trait CodeJudge: Send + Sync {
    /// Judge `source` against `spec`.
    ///
    /// # Errors
    ///
    /// Returns `GradingError` when the judge is unreachable or answers with garbage.
    async fn judge(&self, spec: &CodeSpec, source: &str) -> Result<CodeVerdict, GradingError>;
}

/// Judge used when no runner is configured; every code answer scores zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledJudge;

#[async_trait::async_trait]
impl CodeJudge for DisabledJudge {
    async fn judge(&self, _spec: &CodeSpec, _source: &str) -> Result<CodeVerdict, GradingError> {
        Err(GradingError::Disabled)
    }
}

//
// ─── HTTP JUDGE ────────────────────────────────────────────────────────────────
//

/// Longest a single code answer may wait for its verdict.
pub const DEFAULT_JUDGE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone, Debug)]
pub struct JudgeConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl JudgeConfig {
    /// Returns `None` for a blank URL.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Option<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return None;
        }
        Some(Self {
            base_url,
            timeout: DEFAULT_JUDGE_TIMEOUT,
        })
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Posts answers to an external code runner at `{base_url}/judge`.
#[derive(Clone)]
pub struct HttpCodeJudge {
    client: Client,
    config: JudgeConfig,
}

impl HttpCodeJudge {
    /// Build a client whose requests give up after `config.timeout`.
    ///
    /// # Errors
    ///
    /// Returns `GradingError::Http` if the TLS backend cannot be initialized.
    pub fn new(config: JudgeConfig) -> Result<Self, GradingError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

#[async_trait::async_trait]
impl CodeJudge for HttpCodeJudge {
    async fn judge(&self, spec: &CodeSpec, source: &str) -> Result<CodeVerdict, GradingError> {
        let url = format!("{}/judge", self.config.base_url.trim_end_matches('/'));
        let payload = JudgeRequest { spec, source };

        let response = self.client.post(url).json(&payload).send().await?;
        if !response.status().is_success() {
            return Err(GradingError::HttpStatus(response.status()));
        }

        let body: JudgeResponse = response.json().await?;
        body.into_verdict(spec)
    }
}

#[derive(Debug, Serialize)]
struct JudgeRequest<'a> {
    spec: &'a CodeSpec,
    source: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JudgeResponse {
    passed: Option<u32>,
    total: Option<u32>,
    matches: Option<bool>,
    output: Option<String>,
}

impl JudgeResponse {
    fn into_verdict(self, spec: &CodeSpec) -> Result<CodeVerdict, GradingError> {
        match spec {
            CodeSpec::Program { .. } => match (self.passed, self.total) {
                (Some(passed), Some(total)) => Ok(CodeVerdict::Cases {
                    passed: passed.min(total),
                    total,
                }),
                _ => Err(GradingError::EmptyVerdict),
            },
            CodeSpec::Query { .. } => {
                let matches = self.matches.ok_or(GradingError::EmptyVerdict)?;
                Ok(CodeVerdict::Query {
                    matches,
                    output: self.output,
                })
            }
        }
    }
}

//
// ─── GRADING ───────────────────────────────────────────────────────────────────
//

/// Collects judge verdicts for code answers, then scores the whole attempt.
#[derive(Clone)]
pub struct GradingService {
    judge: Arc<dyn CodeJudge>,
    timeout: Duration,
}

impl GradingService {
    #[must_use]
    pub fn new(judge: Arc<dyn CodeJudge>) -> Self {
        Self {
            judge,
            timeout: DEFAULT_JUDGE_TIMEOUT,
        }
    }

    /// Cap on how long each code answer may wait for the judge.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Judge every answered code question. Judge failures and verdicts slower
    /// than the timeout become [`CodeVerdict::Unavailable`] and never abort
    /// grading.
    pub async fn verdicts(
        &self,
        questions: &[Question],
        payload: &AttemptPayload,
    ) -> BTreeMap<QuestionId, CodeVerdict> {
        let mut verdicts = BTreeMap::new();
        for question in questions {
            let Some(spec) = question.code() else {
                continue;
            };
            let Some(source) = payload
                .answers
                .get(&question.id())
                .filter(|a| !a.trim().is_empty())
            else {
                continue;
            };

            let verdict = match tokio::time::timeout(self.timeout, self.judge.judge(spec, source))
                .await
                .unwrap_or_else(|_| Err(GradingError::TimedOut(self.timeout)))
            {
                Ok(verdict) => verdict,
                Err(err) => {
                    warn!(question_id = %question.id(), error = %err, "code judge failed");
                    CodeVerdict::Unavailable
                }
            };
            verdicts.insert(question.id(), verdict);
        }
        verdicts
    }

    /// Judge code answers and grade the attempt.
    pub async fn grade(
        &self,
        test: &TestDefinition,
        questions: &[Question],
        payload: &AttemptPayload,
        now: DateTime<Utc>,
    ) -> Submission {
        let verdicts = self.verdicts(questions, payload).await;
        grading::grade(test, questions, payload, &verdicts, now)
    }
}
