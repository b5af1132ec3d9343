//! Violation scoring: accumulates risk points for one exam attempt and
//! decides whether the attempt may continue.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{SessionToken, Severity, ViolationKind, ViolationRecord};

pub const WARNING_SCORE: u32 = 30;
pub const PAUSE_SCORE: u32 = 60;
pub const HALT_SCORE: u32 = 80;
pub const CRITICAL_HALT_COUNT: u32 = 2;

/// What the exam should do after the latest violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HaltAction {
    Continue,
    Warning,
    /// Flag for review; the exam goes on.
    Pause,
    /// Cumulative score crossed the halt threshold.
    HaltScore,
    /// Too many critical violations.
    HaltAuto,
}

impl HaltAction {
    #[must_use]
    pub fn halts(self) -> bool {
        matches!(self, HaltAction::HaltScore | HaltAction::HaltAuto)
    }
}

/// Post-exam verdict on the integrity of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    ApprovedWithWarning,
    RequiresReview,
    RejectedFlagged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    MultipleCriticalViolations,
    MultiplePeopleDetected,
    PhoneUsageDetected,
    SuspiciousPastePattern,
    ExcessiveTabSwitching,
}

/// Running tally of violations for one attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViolationLedger {
    score: u32,
    total: u32,
    critical: u32,
    high: u32,
    by_kind: BTreeMap<ViolationKind, u32>,
}

impl ViolationLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_records(records: &[ViolationRecord]) -> Self {
        let mut ledger = Self::new();
        for record in records {
            ledger.record(record.kind);
        }
        ledger
    }

    /// Add one violation and return the resulting action.
    pub fn record(&mut self, kind: ViolationKind) -> HaltAction {
        self.score = self.score.saturating_add(kind.points());
        self.total += 1;
        match kind.severity() {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium | Severity::Low => {}
        }
        *self.by_kind.entry(kind).or_insert(0) += 1;
        self.action()
    }

    #[must_use]
    pub fn action(&self) -> HaltAction {
        if self.critical >= CRITICAL_HALT_COUNT {
            return HaltAction::HaltAuto;
        }
        match self.score {
            s if s >= HALT_SCORE => HaltAction::HaltScore,
            s if s >= PAUSE_SCORE => HaltAction::Pause,
            s if s >= WARNING_SCORE => HaltAction::Warning,
            _ => HaltAction::Continue,
        }
    }

    #[must_use]
    pub fn decision(&self) -> Decision {
        match self.score {
            s if s >= HALT_SCORE => Decision::RejectedFlagged,
            s if s >= PAUSE_SCORE => Decision::RequiresReview,
            s if s >= WARNING_SCORE => Decision::ApprovedWithWarning,
            _ => Decision::Approved,
        }
    }

    /// Overall severity of the attempt, banded on the cumulative score.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self.score {
            s if s >= HALT_SCORE => Severity::Critical,
            s if s >= PAUSE_SCORE => Severity::High,
            s if s >= WARNING_SCORE => Severity::Medium,
            _ => Severity::Low,
        }
    }

    #[must_use]
    pub fn flag_reasons(&self) -> Vec<FlagReason> {
        let seen = |kind| self.by_kind.contains_key(&kind);
        let mut reasons = Vec::new();
        if self.critical >= CRITICAL_HALT_COUNT {
            reasons.push(FlagReason::MultipleCriticalViolations);
        }
        if seen(ViolationKind::MultipleFaces) {
            reasons.push(FlagReason::MultiplePeopleDetected);
        }
        if seen(ViolationKind::PhoneDetected) {
            reasons.push(FlagReason::PhoneUsageDetected);
        }
        if seen(ViolationKind::PasteAttempt) {
            reasons.push(FlagReason::SuspiciousPastePattern);
        }
        if seen(ViolationKind::TabSwitch) {
            reasons.push(FlagReason::ExcessiveTabSwitching);
        }
        reasons
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn count(&self, kind: ViolationKind) -> u32 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn report(&self, session: SessionToken) -> ProctoringReport {
        ProctoringReport {
            session,
            violation_score: self.score,
            score_percent: self.score.min(100),
            severity: self.severity(),
            total_violations: self.total,
            critical_violations: self.critical,
            high_violations: self.high,
            by_kind: self
                .by_kind
                .iter()
                .map(|(kind, count)| KindTally {
                    kind: *kind,
                    count: *count,
                    points: kind.points() * count,
                })
                .collect(),
            decision: self.decision(),
            flagged_for: self.flag_reasons(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KindTally {
    pub kind: ViolationKind,
    pub count: u32,
    pub points: u32,
}

/// Integrity summary for a finished (or running) attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProctoringReport {
    pub session: SessionToken,
    pub violation_score: u32,
    pub score_percent: u32,
    pub severity: Severity,
    pub total_violations: u32,
    pub critical_violations: u32,
    pub high_violations: u32,
    pub by_kind: Vec<KindTally>,
    pub decision: Decision,
    pub flagged_for: Vec<FlagReason>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_bands_drive_action_and_decision() {
        let mut ledger = ViolationLedger::new();
        assert_eq!(ledger.record(ViolationKind::TabSwitch), HaltAction::Continue);
        assert_eq!(ledger.record(ViolationKind::TabSwitch), HaltAction::Continue);
        assert_eq!(ledger.record(ViolationKind::TabSwitch), HaltAction::Warning);
        assert_eq!(ledger.decision(), Decision::ApprovedWithWarning);

        assert_eq!(ledger.record(ViolationKind::PasteAttempt), HaltAction::Warning);
        assert_eq!(ledger.record(ViolationKind::PasteAttempt), HaltAction::Pause);
        assert_eq!(ledger.score(), 60);
        assert_eq!(ledger.decision(), Decision::RequiresReview);

        assert_eq!(ledger.record(ViolationKind::CameraBlocked), HaltAction::Pause);
        assert_eq!(ledger.record(ViolationKind::FaceNotDetected), HaltAction::HaltScore);
        assert_eq!(ledger.decision(), Decision::RejectedFlagged);
        assert_eq!(ledger.severity(), Severity::Critical);
    }

    #[test]
    fn two_critical_violations_halt_regardless_of_score() {
        let mut ledger = ViolationLedger::new();
        assert_eq!(ledger.record(ViolationKind::PhoneDetected), HaltAction::Continue);
        assert_eq!(ledger.record(ViolationKind::PhoneDetected), HaltAction::HaltAuto);
        assert!(ledger.action().halts());
        assert_eq!(
            ledger.flag_reasons(),
            vec![
                FlagReason::MultipleCriticalViolations,
                FlagReason::PhoneUsageDetected
            ]
        );
    }

    #[test]
    fn report_tallies_points_per_kind() {
        let session = SessionToken::generate();
        let records: Vec<_> = [
            ViolationKind::TabSwitch,
            ViolationKind::TabSwitch,
            ViolationKind::MultipleFaces,
        ]
        .into_iter()
        .map(|kind| ViolationRecord::new(session, kind, crate::time::fixed_now()))
        .collect();

        let report = ViolationLedger::from_records(&records).report(session);
        assert_eq!(report.violation_score, 50);
        assert_eq!(report.total_violations, 3);
        assert_eq!(report.critical_violations, 1);
        assert_eq!(report.by_kind[0].kind, ViolationKind::TabSwitch);
        assert_eq!(report.by_kind[0].points, 20);
        assert_eq!(report.decision, Decision::ApprovedWithWarning);
        assert!(report.flagged_for.contains(&FlagReason::MultiplePeopleDetected));
    }
}
