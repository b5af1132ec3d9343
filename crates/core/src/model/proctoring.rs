use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::SessionToken;

/// Which monitoring features a test turns on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProctoringPolicy {
    pub enabled: bool,
    pub require_camera: bool,
    pub detect_camera_blocking: bool,
    pub detect_phone: bool,
    pub disable_copy_paste: bool,
}

impl ProctoringPolicy {
    /// Everything on; what a published comprehensive test usually uses.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            enabled: true,
            require_camera: true,
            detect_camera_blocking: true,
            detect_phone: true,
            disable_copy_paste: true,
        }
    }

    /// The session must wait for camera permission before starting.
    #[must_use]
    pub fn needs_camera(&self) -> bool {
        self.enabled && self.require_camera
    }

    #[must_use]
    pub fn watches_camera(&self) -> bool {
        self.needs_camera() && self.detect_camera_blocking
    }

    #[must_use]
    pub fn watches_objects(&self) -> bool {
        self.needs_camera() && self.detect_phone
    }

    #[must_use]
    pub fn blocks_clipboard(&self) -> bool {
        self.enabled && self.disable_copy_paste
    }
}

/// A rule infraction observed during a timed test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    TabSwitch,
    FullscreenExit,
    CopyAttempt,
    PasteAttempt,
    CameraBlocked,
    FaceNotDetected,
    MultipleFaces,
    PhoneDetected,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 8] = [
        ViolationKind::TabSwitch,
        ViolationKind::FullscreenExit,
        ViolationKind::CopyAttempt,
        ViolationKind::PasteAttempt,
        ViolationKind::CameraBlocked,
        ViolationKind::FaceNotDetected,
        ViolationKind::MultipleFaces,
        ViolationKind::PhoneDetected,
    ];

    /// Risk points contributed by a single occurrence.
    #[must_use]
    pub fn points(self) -> u32 {
        match self {
            ViolationKind::TabSwitch | ViolationKind::FaceNotDetected => 10,
            ViolationKind::FullscreenExit
            | ViolationKind::PasteAttempt
            | ViolationKind::CameraBlocked => 15,
            ViolationKind::CopyAttempt => 8,
            ViolationKind::MultipleFaces => 30,
            ViolationKind::PhoneDetected => 20,
        }
    }

    #[must_use]
    pub fn severity(self) -> Severity {
        Severity::from_points(self.points())
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::TabSwitch => "tab_switch",
            ViolationKind::FullscreenExit => "fullscreen_exit",
            ViolationKind::CopyAttempt => "copy_attempt",
            ViolationKind::PasteAttempt => "paste_attempt",
            ViolationKind::CameraBlocked => "camera_blocked",
            ViolationKind::FaceNotDetected => "face_not_detected",
            ViolationKind::MultipleFaces => "multiple_faces",
            ViolationKind::PhoneDetected => "phone_detected",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == raw)
    }

    #[must_use]
    pub fn from_points(points: u32) -> Self {
        match points {
            20.. => Severity::Critical,
            12..=19 => Severity::High,
            8..=11 => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

/// One persisted violation for an exam attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationRecord {
    pub session: SessionToken,
    pub kind: ViolationKind,
    pub points: u32,
    pub severity: Severity,
    pub recorded_at: DateTime<Utc>,
}

impl ViolationRecord {
    #[must_use]
    pub fn new(session: SessionToken, kind: ViolationKind, recorded_at: DateTime<Utc>) -> Self {
        Self {
            session,
            kind,
            points: kind.points(),
            severity: kind.severity(),
            recorded_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_follows_point_bands() {
        assert_eq!(ViolationKind::PhoneDetected.severity(), Severity::Critical);
        assert_eq!(ViolationKind::MultipleFaces.severity(), Severity::Critical);
        assert_eq!(ViolationKind::CameraBlocked.severity(), Severity::High);
        assert_eq!(ViolationKind::TabSwitch.severity(), Severity::Medium);
        assert_eq!(ViolationKind::CopyAttempt.severity(), Severity::Medium);
        assert_eq!(Severity::from_points(5), Severity::Low);
    }

    #[test]
    fn kinds_round_trip_through_storage_names() {
        for kind in ViolationKind::ALL {
            assert_eq!(ViolationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ViolationKind::parse("sneezing"), None);
    }

    #[test]
    fn disabled_policy_watches_nothing() {
        let policy = ProctoringPolicy {
            enabled: false,
            ..ProctoringPolicy::strict()
        };
        assert!(!policy.needs_camera());
        assert!(!policy.watches_camera());
        assert!(!policy.blocks_clipboard());
        assert!(ProctoringPolicy::strict().watches_objects());
    }
}
