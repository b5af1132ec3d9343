//! Scoring of a submitted attempt.
//!
//! Choice questions are graded here directly; coding and SQL answers arrive
//! already judged as [`CodeVerdict`]s so this module stays free of I/O.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::model::{
    AttemptPayload, Question, QuestionId, QuestionKind, QuestionResult, Section, SectionResult,
    Submission, SubmissionStatus, TestDefinition,
};

/// Longest code answer kept verbatim in a result.
pub const MAX_CODE_ANSWER_CHARS: usize = 500;
pub const NOT_ANSWERED: &str = "Not Answered";

/// Outcome of running a code answer through a judge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeVerdict {
    /// Program answers: how many test cases passed.
    Cases { passed: u32, total: u32 },
    /// Query answers: whether the output matched, plus what the query produced.
    Query {
        matches: bool,
        output: Option<String>,
    },
    /// The judge could not be reached or rejected the request.
    Unavailable,
}

/// `round(num / den * scale)` with half-up rounding, 0 when `den` is 0.
#[must_use]
pub fn round_ratio(num: u32, den: u32, scale: u32) -> u32 {
    if den == 0 {
        return 0;
    }
    let (num, den, scale) = (u64::from(num), u64::from(den), u64::from(scale));
    let value = (2 * num * scale + den) / (2 * den);
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn display_answer(kind: QuestionKind, answer: &str) -> String {
    if answer.is_empty() {
        return NOT_ANSWERED.to_owned();
    }
    if !kind.is_code() {
        return answer.to_owned();
    }
    let mut chars = answer.chars();
    let head: String = chars.by_ref().take(MAX_CODE_ANSWER_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

fn grade_question(question: &Question, answer: &str, verdict: Option<&CodeVerdict>) -> QuestionResult {
    let points = question.points();
    let (is_correct, points_earned, correct_answer) = match question.kind() {
        QuestionKind::Coding => match verdict {
            Some(CodeVerdict::Cases { passed, total }) if *total > 0 => {
                let all = passed >= total;
                let earned = if all {
                    points
                } else {
                    round_ratio(*passed, *total, points)
                };
                (all, earned, format!("{passed}/{total} test cases passed"))
            }
            _ => (false, 0, "N/A".to_owned()),
        },
        QuestionKind::Sql => match verdict {
            Some(CodeVerdict::Query { matches, output }) => (
                *matches,
                if *matches { points } else { 0 },
                output.clone().unwrap_or_else(|| "Expected result".to_owned()),
            ),
            _ => (false, 0, "Expected result".to_owned()),
        },
        QuestionKind::Mcq | QuestionKind::TrueFalse | QuestionKind::Pattern => {
            let ok = question.accepts(answer);
            (ok, if ok { points } else { 0 }, question.correct_text().to_owned())
        }
    };

    QuestionResult {
        question_id: question.id(),
        section: question.section(),
        user_answer: display_answer(question.kind(), answer),
        correct_answer,
        is_correct,
        points_earned,
        explanation: question.explanation().map(str::to_owned),
    }
}

#[derive(Default)]
struct Tally {
    questions: u32,
    correct: u32,
    points: u32,
    earned: u32,
}

/// Grade `payload` against the test's questions.
///
/// Every question of the test is graded, answered or not. Sections without
/// questions are left out of the result.
#[must_use]
pub fn grade(
    test: &TestDefinition,
    questions: &[Question],
    payload: &AttemptPayload,
    verdicts: &BTreeMap<QuestionId, CodeVerdict>,
    now: DateTime<Utc>,
) -> Submission {
    let mut tallies: BTreeMap<Section, Tally> = BTreeMap::new();
    let mut results = Vec::with_capacity(questions.len());

    for question in questions {
        let answer = payload
            .answers
            .get(&question.id())
            .map_or("", |a| a.trim());
        let result = grade_question(question, answer, verdicts.get(&question.id()));

        let tally = tallies.entry(question.section()).or_default();
        tally.questions += 1;
        tally.points += question.points();
        tally.earned += result.points_earned;
        if result.is_correct {
            tally.correct += 1;
        }
        results.push(result);
    }

    let sections: Vec<SectionResult> = Section::ALL
        .into_iter()
        .filter_map(|section| {
            let t = tallies.get(&section)?;
            let score = if t.points > 0 {
                round_ratio(t.earned, t.points, 100)
            } else {
                round_ratio(t.correct, t.questions, 100)
            };
            Some(SectionResult {
                section,
                correct_count: t.correct,
                total_questions: t.questions,
                score,
                percent: round_ratio(t.correct, t.questions, 100),
            })
        })
        .collect();

    let total_score = sections.iter().map(|s| s.score).sum();
    let correct: u32 = sections.iter().map(|s| s.correct_count).sum();
    let total: u32 = sections.iter().map(|s| s.total_questions).sum();
    let overall_percent = round_ratio(correct, total, 100);
    let status = if total > 0 && overall_percent >= test.passing_score() {
        SubmissionStatus::Passed
    } else {
        SubmissionStatus::Failed
    };

    Submission {
        id: None,
        session: payload.session,
        test_id: test.id(),
        test_title: test.title().to_owned(),
        student_id: payload.student_id,
        sections,
        total_score,
        overall_percent,
        status,
        time_spent_secs: payload.time_spent_secs,
        counters: payload.counters,
        violation_score: payload.violation_score,
        reason: payload.reason,
        submitted_at: now,
        questions: results,
    }
}
