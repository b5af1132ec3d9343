use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the five fixed parts of a comprehensive test.
///
/// The declaration order is the canonical order in which sections are
/// presented and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Aptitude,
    Verbal,
    Logical,
    Coding,
    Sql,
}

impl Section {
    pub const ALL: [Section; 5] = [
        Section::Aptitude,
        Section::Verbal,
        Section::Logical,
        Section::Coding,
        Section::Sql,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Section::Aptitude => "aptitude",
            Section::Verbal => "verbal",
            Section::Logical => "logical",
            Section::Coding => "coding",
            Section::Sql => "sql",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Section::Aptitude => "Aptitude",
            Section::Verbal => "Verbal",
            Section::Logical => "Logical",
            Section::Coding => "Coding",
            Section::Sql => "SQL",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {raw}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub raw: String,
}

impl FromStr for Section {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Section::ALL
            .into_iter()
            .find(|section| section.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "section",
                raw: s.to_owned(),
            })
    }
}

/// How a question is answered and graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    Mcq,
    TrueFalse,
    Pattern,
    Coding,
    Sql,
}

impl QuestionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            QuestionKind::Mcq => "mcq",
            QuestionKind::TrueFalse => "true_false",
            QuestionKind::Pattern => "pattern",
            QuestionKind::Coding => "coding",
            QuestionKind::Sql => "sql",
        }
    }

    /// Coding and SQL answers are code blobs judged by an external runner.
    #[must_use]
    pub fn is_code(self) -> bool {
        matches!(self, QuestionKind::Coding | QuestionKind::Sql)
    }

    #[must_use]
    pub fn default_points(self) -> u32 {
        if self.is_code() { 10 } else { 1 }
    }
}

impl FromStr for QuestionKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mcq" => Ok(QuestionKind::Mcq),
            "true_false" => Ok(QuestionKind::TrueFalse),
            "pattern" => Ok(QuestionKind::Pattern),
            "coding" => Ok(QuestionKind::Coding),
            "sql" => Ok(QuestionKind::Sql),
            _ => Err(UnknownVariant {
                kind: "question kind",
                raw: s.to_owned(),
            }),
        }
    }
}
