use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<u64>().map($name::new).map_err(|_| ParseIdError {
                    kind: stringify!($name),
                })
            }
        }
    };
}

numeric_id!(
    /// Identifier of a proctored test definition.
    TestId
);
numeric_id!(
    /// Identifier of a question within the catalog.
    QuestionId
);
numeric_id!(
    /// Identifier of the student taking a test.
    StudentId
);
numeric_id!(
    /// Identifier of a persisted, graded submission.
    SubmissionId
);

/// Opaque handle for one in-flight exam attempt.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(Uuid);

impl SessionToken {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionToken({})", self.0)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionToken {
    type Err = ParseIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(SessionToken)
            .map_err(|_| ParseIdError {
                kind: "SessionToken",
            })
    }
}

/// Error type for parsing an identifier from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_ids_display_and_parse() {
        let id: TestId = "42".parse().unwrap();
        assert_eq!(id, TestId::new(42));
        assert_eq!(id.to_string(), "42");
        assert_eq!(format!("{:?}", QuestionId::new(7)), "QuestionId(7)");
    }

    #[test]
    fn invalid_numeric_id_names_the_kind() {
        let err = "abc".parse::<StudentId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse StudentId from string");
    }

    #[test]
    fn session_token_parses_its_own_display() {
        let token = SessionToken::generate();
        let parsed: SessionToken = token.to_string().parse().unwrap();
        assert_eq!(parsed, token);
        assert!("not-a-uuid".parse::<SessionToken>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        assert_eq!(serde_json::to_string(&SubmissionId::new(9)).unwrap(), "9");
        let back: TestId = serde_json::from_str("12").unwrap();
        assert_eq!(back, TestId::new(12));
    }
}
