//! Sample catalog for local development and demos.

use chrono::{DateTime, Utc};
use mentor_core::model::{
    CodeSpec, ProctoringPolicy, QuestionDraft, QuestionKind, Section, TestCase, TestDraft, TestId,
    TestKind, TestStatus,
};

use crate::repository::{NewQuestionRecord, NewTestRecord, Storage, StorageError};

fn choice(
    section: Section,
    prompt: &str,
    options: &[&str],
    correct: &str,
    explanation: &str,
) -> NewQuestionRecord {
    NewQuestionRecord {
        section,
        draft: QuestionDraft {
            kind: if options.len() == 2 {
                QuestionKind::TrueFalse
            } else {
                QuestionKind::Mcq
            },
            prompt: prompt.to_owned(),
            options: options.iter().map(|o| (*o).to_owned()).collect(),
            correct_answer: correct.to_owned(),
            explanation: Some(explanation.to_owned()),
            ..QuestionDraft::default()
        },
    }
}

fn sample_questions() -> Vec<NewQuestionRecord> {
    vec![
        choice(
            Section::Aptitude,
            "A train covers 120 km in 2 hours. What is its speed in km/h?",
            &["40", "60", "80", "120"],
            "1",
            "Speed is distance over time: 120 / 2 = 60.",
        ),
        choice(
            Section::Aptitude,
            "What is 15% of 200?",
            &["15", "20", "30", "45"],
            "2",
            "0.15 * 200 = 30.",
        ),
        choice(
            Section::Verbal,
            "Choose the synonym of 'candid'.",
            &["Frank", "Secretive", "Bitter", "Timid"],
            "0",
            "Candid means open and honest.",
        ),
        choice(
            Section::Verbal,
            "'Their going to the library' is grammatically correct.",
            &["True", "False"],
            "1",
            "It should be 'They're'.",
        ),
        choice(
            Section::Logical,
            "Next in the series: 2, 6, 12, 20, ?",
            &["28", "30", "32", "36"],
            "1",
            "Differences grow by 2: 4, 6, 8, 10.",
        ),
        NewQuestionRecord {
            section: Section::Logical,
            draft: QuestionDraft {
                kind: QuestionKind::Pattern,
                prompt: "Complete the pattern: AB, DE, GH, ?".to_owned(),
                correct_answer: "JK".to_owned(),
                explanation: Some("Each pair skips one letter.".to_owned()),
                ..QuestionDraft::default()
            },
        },
        NewQuestionRecord {
            section: Section::Coding,
            draft: QuestionDraft {
                kind: QuestionKind::Coding,
                prompt: "Read a line from stdin and print it reversed.".to_owned(),
                code: Some(CodeSpec::Program {
                    language: "python".to_owned(),
                    cases: vec![
                        TestCase {
                            input: "hello".to_owned(),
                            expected_output: "olleh".to_owned(),
                        },
                        TestCase {
                            input: "ab".to_owned(),
                            expected_output: "ba".to_owned(),
                        },
                    ],
                }),
                ..QuestionDraft::default()
            },
        },
        NewQuestionRecord {
            section: Section::Sql,
            draft: QuestionDraft {
                kind: QuestionKind::Sql,
                prompt: "Count the employees in the 'eng' department.".to_owned(),
                code: Some(CodeSpec::Query {
                    schema: "CREATE TABLE employees (id INTEGER, dept TEXT);\n\
                             INSERT INTO employees VALUES (1, 'eng'), (2, 'eng'), (3, 'ops');"
                        .to_owned(),
                    expected_output: "2".to_owned(),
                }),
                ..QuestionDraft::default()
            },
        },
    ]
}

/// Insert a published comprehensive test with one or two questions per section.
///
/// # Errors
///
/// Returns `StorageError` if any insert fails.
pub async fn seed_sample_catalog(
    storage: &Storage,
    now: DateTime<Utc>,
) -> Result<TestId, StorageError> {
    let draft = TestDraft {
        title: "Placement Readiness Assessment".to_owned(),
        kind: TestKind::Comprehensive,
        difficulty: Some("medium".to_owned()),
        duration_minutes: 60,
        status: TestStatus::Published,
        description: "Aptitude, verbal, logical, coding and SQL in one sitting.".to_owned(),
        proctoring: ProctoringPolicy::strict(),
        ..TestDraft::default()
    };
    let test = draft
        .validate(TestId::new(1), now, 0)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    let test_id = storage
        .tests
        .insert_new_test(NewTestRecord::from_test(&test))
        .await?;

    storage
        .questions
        .insert_questions(test_id, sample_questions())
        .await?;

    let total = storage.questions.count_questions(test_id).await?;
    let stored = storage
        .tests
        .get_test(test_id)
        .await?
        .ok_or(StorageError::NotFound)?;
    storage
        .tests
        .update_test(&stored.with_total_questions(total))
        .await?;

    Ok(test_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentor_core::time::fixed_now;

    #[tokio::test]
    async fn sample_catalog_covers_every_section() {
        let storage = Storage::in_memory();
        let test_id = seed_sample_catalog(&storage, fixed_now()).await.unwrap();

        let test = storage.tests.get_test(test_id).await.unwrap().unwrap();
        assert_eq!(test.total_questions(), 8);
        assert_eq!(test.status(), TestStatus::Published);

        let questions = storage.questions.list_questions(test_id, None).await.unwrap();
        for section in Section::ALL {
            assert!(questions.iter().any(|q| q.section() == section));
        }
    }
}
