use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use mentor_core::model::SessionToken;

use super::runner::ExamRunner;

/// Live exams keyed by session token.
///
/// Runners leave the registry once their submission is stored, or when they
/// sit in setup for longer than the setup timeout.
#[derive(Default)]
pub struct ExamRegistry {
    runners: Mutex<HashMap<SessionToken, ExamRunner>>,
}

impl ExamRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `runner` unless its student already holds `allowed` live
    /// exams of the same test. Returns false when the runner was refused.
    pub fn insert_within(&self, runner: ExamRunner, allowed: u32) -> bool {
        let mut runners = self.lock();
        let live = runners
            .values()
            .filter(|r| r.test().id() == runner.test().id() && r.student() == runner.student())
            .count();
        if u32::try_from(live).unwrap_or(u32::MAX) >= allowed {
            return false;
        }
        runners.insert(runner.token(), runner);
        true
    }

    #[must_use]
    pub fn get(&self, token: SessionToken) -> Option<ExamRunner> {
        self.lock().get(&token).cloned()
    }

    /// Forget a session. Dropping the last handle stops its countdown.
    pub fn remove(&self, token: SessionToken) -> Option<ExamRunner> {
        self.lock().remove(&token)
    }

    /// Drop exams that never left setup within `ttl` of being opened.
    /// Returns how many were dropped.
    pub fn expire_setups(&self, now: DateTime<Utc>, ttl: Duration) -> usize {
        if self.is_empty() {
            return 0;
        }
        let runners: Vec<ExamRunner> = self.lock().values().cloned().collect();
        let mut expired = 0;
        for runner in runners {
            if runner.idle_in_setup(now, ttl) && self.remove(runner.token()).is_some() {
                expired += 1;
            }
        }
        expired
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<SessionToken, ExamRunner>> {
        self.runners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
