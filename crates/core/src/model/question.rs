use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{QuestionId, TestId};
use crate::model::section::{QuestionKind, Section};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyPrompt,

    #[error("a question has at most {max} options, got {len}")]
    TooManyOptions { len: usize, max: usize },

    #[error("option {index} is empty")]
    EmptyOption { index: usize },

    #[error("choice questions need a correct answer")]
    MissingCorrectAnswer,

    #[error("{kind} questions cannot carry a {spec} specification")]
    MismatchedCodeSpec {
        kind: &'static str,
        spec: &'static str,
    },

    #[error("points must be > 0")]
    ZeroPoints,
}

pub const MAX_OPTIONS: usize = 4;

//
// ─── CODE SPECIFICATIONS ───────────────────────────────────────────────────────
//

/// A single stdin/stdout pair for a coding question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    #[serde(default)]
    pub input: String,
    pub expected_output: String,
}

/// What an external runner needs to judge a code answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum CodeSpec {
    Program {
        language: String,
        #[serde(default)]
        cases: Vec<TestCase>,
    },
    Query {
        #[serde(default)]
        schema: String,
        #[serde(default)]
        expected_output: String,
    },
}

impl CodeSpec {
    fn label(&self) -> &'static str {
        match self {
            CodeSpec::Program { .. } => "program",
            CodeSpec::Query { .. } => "query",
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// Unvalidated question input, as authored by a mentor or read from storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuestionDraft {
    #[serde(default)]
    pub kind: QuestionKind,
    pub prompt: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub code: Option<CodeSpec>,
    #[serde(default)]
    pub points: Option<u32>,
    #[serde(default)]
    pub time_limit_secs: Option<u32>,
}

impl QuestionDraft {
    /// Validate the draft and attach it to a test section.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt is empty, options are malformed,
    /// a choice question lacks a correct answer, or the code spec does not fit the kind.
    pub fn validate(
        self,
        id: QuestionId,
        test_id: TestId,
        section: Section,
    ) -> Result<Question, QuestionError> {
        let prompt = self.prompt.trim().to_owned();
        if prompt.is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }

        // Storage pads missing options with empty strings; drop trailing blanks.
        let mut options = self.options;
        while options.last().is_some_and(|o| o.trim().is_empty()) {
            options.pop();
        }
        if options.len() > MAX_OPTIONS {
            return Err(QuestionError::TooManyOptions {
                len: options.len(),
                max: MAX_OPTIONS,
            });
        }
        if let Some(index) = options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }

        let correct_answer = self.correct_answer.trim().to_owned();
        if !self.kind.is_code() && correct_answer.is_empty() {
            return Err(QuestionError::MissingCorrectAnswer);
        }

        match (&self.code, self.kind) {
            (Some(spec @ CodeSpec::Query { .. }), QuestionKind::Coding)
            | (Some(spec @ CodeSpec::Program { .. }), QuestionKind::Sql) => {
                return Err(QuestionError::MismatchedCodeSpec {
                    kind: self.kind.as_str(),
                    spec: spec.label(),
                });
            }
            (Some(spec), kind) if !kind.is_code() => {
                return Err(QuestionError::MismatchedCodeSpec {
                    kind: kind.as_str(),
                    spec: spec.label(),
                });
            }
            _ => {}
        }

        let points = self.points.unwrap_or_else(|| self.kind.default_points());
        if points == 0 {
            return Err(QuestionError::ZeroPoints);
        }

        Ok(Question {
            id,
            test_id,
            section,
            kind: self.kind,
            prompt,
            options,
            correct_answer,
            explanation: self.explanation.filter(|e| !e.trim().is_empty()),
            category: self
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "general".to_owned()),
            code: self.code,
            points,
            time_limit_secs: self.time_limit_secs,
        })
    }
}

/// A validated question belonging to one section of a test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    test_id: TestId,
    section: Section,
    kind: QuestionKind,
    prompt: String,
    options: Vec<String>,
    correct_answer: String,
    explanation: Option<String>,
    category: String,
    code: Option<CodeSpec>,
    points: u32,
    time_limit_secs: Option<u32>,
}

impl Question {
    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn test_id(&self) -> TestId {
        self.test_id
    }

    #[must_use]
    pub fn section(&self) -> Section {
        self.section
    }

    #[must_use]
    pub fn kind(&self) -> QuestionKind {
        self.kind
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> &str {
        &self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    #[must_use]
    pub fn code(&self) -> Option<&CodeSpec> {
        self.code.as_ref()
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn time_limit_secs(&self) -> Option<u32> {
        self.time_limit_secs
    }

    /// The option the stored correct answer points at, when it is an index.
    fn indexed_option(&self) -> Option<&str> {
        self.correct_answer
            .parse::<usize>()
            .ok()
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }

    /// Human-readable correct answer: the indexed option text when the stored
    /// answer is an index, otherwise the stored text.
    #[must_use]
    pub fn correct_text(&self) -> &str {
        if self.options.is_empty() {
            return &self.correct_answer;
        }
        self.indexed_option().unwrap_or(&self.correct_answer)
    }

    /// Whether a choice answer matches. Code questions always return false here.
    #[must_use]
    pub fn accepts(&self, answer: &str) -> bool {
        if self.kind.is_code() {
            return false;
        }
        let answer = answer.trim();
        if answer.is_empty() {
            return false;
        }
        answer == self.correct_answer || self.indexed_option() == Some(answer)
    }

    /// Drop the fields a student must not see before submitting.
    #[must_use]
    pub fn redacted(&self) -> Self {
        let code = self.code.clone().map(|spec| match spec {
            CodeSpec::Query { schema, .. } => CodeSpec::Query {
                schema,
                expected_output: String::new(),
            },
            program @ CodeSpec::Program { .. } => program,
        });
        Self {
            correct_answer: String::new(),
            explanation: None,
            code,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq(options: &[&str], correct: &str) -> QuestionDraft {
        QuestionDraft {
            prompt: "2 + 2 = ?".into(),
            options: options.iter().map(|s| (*s).to_owned()).collect(),
            correct_answer: correct.into(),
            ..QuestionDraft::default()
        }
    }

    fn validate(draft: QuestionDraft) -> Result<Question, QuestionError> {
        draft.validate(QuestionId::new(1), TestId::new(1), Section::Aptitude)
    }

    #[test]
    fn accepts_option_text_or_index() {
        let q = validate(mcq(&["3", "4", "5"], "1")).unwrap();
        assert!(q.accepts("4"));
        assert!(q.accepts(" 1 "));
        assert!(!q.accepts("3"));
        assert!(!q.accepts(""));
        assert_eq!(q.correct_text(), "4");
    }

    #[test]
    fn accepts_literal_text_answer() {
        let q = validate(mcq(&["3", "4"], "4")).unwrap();
        assert!(q.accepts("4"));
        assert_eq!(q.correct_text(), "4");
    }

    #[test]
    fn trailing_blank_options_are_dropped() {
        let q = validate(mcq(&["a", "b", "", ""], "a")).unwrap();
        assert_eq!(q.options().len(), 2);
    }

    #[test]
    fn rejects_malformed_drafts() {
        assert_eq!(
            validate(QuestionDraft::default()).unwrap_err(),
            QuestionError::EmptyPrompt
        );
        assert_eq!(
            validate(mcq(&["a", "b", "c", "d", "e"], "a")).unwrap_err(),
            QuestionError::TooManyOptions { len: 5, max: 4 }
        );
        assert_eq!(
            validate(mcq(&["a", "", "c"], "a")).unwrap_err(),
            QuestionError::EmptyOption { index: 1 }
        );
        assert_eq!(
            validate(mcq(&["a"], "  ")).unwrap_err(),
            QuestionError::MissingCorrectAnswer
        );
    }

    #[test]
    fn code_spec_must_match_kind() {
        let draft = QuestionDraft {
            kind: QuestionKind::Sql,
            prompt: "select everything".into(),
            code: Some(CodeSpec::Program {
                language: "Python".into(),
                cases: Vec::new(),
            }),
            ..QuestionDraft::default()
        };
        assert!(matches!(
            validate(draft).unwrap_err(),
            QuestionError::MismatchedCodeSpec { kind: "sql", .. }
        ));
    }

    #[test]
    fn code_questions_default_to_ten_points_and_never_match_text() {
        let draft = QuestionDraft {
            kind: QuestionKind::Coding,
            prompt: "reverse a string".into(),
            ..QuestionDraft::default()
        };
        let q = validate(draft).unwrap();
        assert_eq!(q.points(), 10);
        assert!(!q.accepts("anything"));
        assert_eq!(q.category(), "general");
    }

    #[test]
    fn redaction_hides_answer_and_explanation() {
        let mut draft = mcq(&["x", "y"], "0");
        draft.explanation = Some("because".into());
        let q = validate(draft).unwrap().redacted();
        assert_eq!(q.correct_answer(), "");
        assert_eq!(q.explanation(), None);
    }
}
