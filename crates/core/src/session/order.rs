
use crate::model::{Question, QuestionId, Section, StudentId, TestId};

/// Per-attempt seed: a 31-bit string hash of `"{student}-{test}"`.
///
/// Every student sees a stable but distinct question order for a test.
#[must_use]
pub fn attempt_seed(student: StudentId, test: TestId) -> u64 {
    let key = format!("{student}-{test}");
    let mut h: i32 = 0;
    for unit in key.encode_utf16() {
        h = (h << 5).wrapping_sub(h).wrapping_add(i32::from(unit));
    }
    u64::from(h.unsigned_abs())
}

/// Deterministic Fisher-Yates driven by a small linear congruential generator.
pub fn seeded_shuffle<T>(items: &mut [T], mut seed: u64) {
    let mut next = || {
        seed = (seed * 9301 + 49297) % 233_280;
        #[allow(clippy::cast_precision_loss)]
        let r = seed as f64 / 233_280.0;
        r
    };
    for i in (0..items.len()).rev() {
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let j = (next() * (i + 1) as f64).floor() as usize;
        items.swap(i, j.min(i));
    }
}

/// Sections in canonical order, each with its shuffled questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOrder {
    sections: Vec<(Section, Vec<QuestionId>)>,
    section_index: usize,
    question_index: usize,
}

impl QuestionOrder {
    /// Build the order for one attempt. Sections without questions are skipped.
    #[must_use]
    pub fn new(questions: &[Question], student: StudentId, test: TestId) -> Self {
        let seed = attempt_seed(student, test);
        let sections = Section::ALL
            .into_iter()
            .filter_map(|section| {
                let mut ids: Vec<QuestionId> = questions
                    .iter()
                    .filter(|q| q.section() == section)
                    .map(Question::id)
                    .collect();
                if ids.is_empty() {
                    return None;
                }
                ids.sort();
                seeded_shuffle(&mut ids, seed + section.as_str().len() as u64);
                Some((section, ids))
            })
            .collect();

        Self {
            sections,
            section_index: 0,
            question_index: 0,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.sections.iter().map(|(_, ids)| ids.len()).sum()
    }

    #[must_use]
    pub fn sections(&self) -> Vec<Section> {
        self.sections.iter().map(|(s, _)| *s).collect()
    }

    #[must_use]
    pub fn section_index(&self) -> usize {
        self.section_index
    }

    #[must_use]
    pub fn question_index(&self) -> usize {
        self.question_index
    }

    #[must_use]
    pub fn current_section(&self) -> Option<Section> {
        self.sections.get(self.section_index).map(|(s, _)| *s)
    }

    #[must_use]
    pub fn current(&self) -> Option<QuestionId> {
        self.sections
            .get(self.section_index)
            .and_then(|(_, ids)| ids.get(self.question_index))
            .copied()
    }

    #[must_use]
    pub fn contains(&self, id: QuestionId) -> bool {
        self.sections.iter().any(|(_, ids)| ids.contains(&id))
    }

    /// All question ids in presentation order.
    #[must_use]
    pub fn flattened(&self) -> Vec<QuestionId> {
        self.sections
            .iter()
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect()
    }

    /// Advance within the section, then into the next one. Returns false at the end.
    pub fn next(&mut self) -> bool {
        let Some((_, ids)) = self.sections.get(self.section_index) else {
            return false;
        };
        if self.question_index + 1 < ids.len() {
            self.question_index += 1;
            true
        } else if self.section_index + 1 < self.sections.len() {
            self.section_index += 1;
            self.question_index = 0;
            true
        } else {
            false
        }
    }

    /// Step back, landing on the last question of the previous section when needed.
    pub fn previous(&mut self) -> bool {
        if self.question_index > 0 {
            self.question_index -= 1;
            true
        } else if self.section_index > 0 {
            self.section_index -= 1;
            self.question_index = self.sections[self.section_index].1.len().saturating_sub(1);
            true
        } else {
            false
        }
    }

    /// Move to `index` within `section`. Returns false when the position does not exist.
    pub fn jump(&mut self, section: Section, index: usize) -> bool {
        let Some(pos) = self.sections.iter().position(|(s, _)| *s == section) else {
            return false;
        };
        if index >= self.sections[pos].1.len() {
            return false;
        }
        self.section_index = pos;
        self.question_index = index;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{QuestionDraft, QuestionKind};

    fn question(id: u64, section: Section) -> Question {
        QuestionDraft {
            kind: QuestionKind::Mcq,
            prompt: format!("Q{id}"),
            options: vec!["a".into(), "b".into()],
            correct_answer: "0".into(),
            ..QuestionDraft::default()
        }
        .validate(QuestionId::new(id), TestId::new(1), section)
        .unwrap()
    }

    #[test]
    fn seed_matches_reference_string_hash() {
        // "1-1" => ((('1'*31)+'-')*31)+'1'
        let expected = (49_u64 * 31 + 45) * 31 + 49;
        assert_eq!(attempt_seed(StudentId::new(1), TestId::new(1)), expected);
    }

    #[test]
    fn shuffle_is_a_deterministic_permutation() {
        let mut a: Vec<u32> = (0..10).collect();
        let mut b = a.clone();
        seeded_shuffle(&mut a, 12_345);
        seeded_shuffle(&mut b, 12_345);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn order_skips_empty_sections_and_keeps_canonical_order() {
        let questions = vec![
            question(5, Section::Sql),
            question(1, Section::Aptitude),
            question(2, Section::Aptitude),
        ];
        let order = QuestionOrder::new(&questions, StudentId::new(3), TestId::new(9));
        assert_eq!(order.sections(), vec![Section::Aptitude, Section::Sql]);
        assert_eq!(order.total(), 3);
        assert_eq!(order.current_section(), Some(Section::Aptitude));
    }

    #[test]
    fn navigation_crosses_section_boundaries() {
        let questions = vec![
            question(1, Section::Aptitude),
            question(2, Section::Aptitude),
            question(3, Section::Verbal),
        ];
        let mut order = QuestionOrder::new(&questions, StudentId::new(1), TestId::new(1));

        assert!(!order.previous());
        assert!(order.next());
        assert!(order.next());
        assert_eq!(order.current_section(), Some(Section::Verbal));
        assert_eq!(order.current(), Some(QuestionId::new(3)));
        assert!(!order.next());

        assert!(order.previous());
        assert_eq!(order.current_section(), Some(Section::Aptitude));
        assert_eq!(order.question_index(), 1);

        assert!(order.jump(Section::Verbal, 0));
        assert!(!order.jump(Section::Verbal, 1));
        assert!(!order.jump(Section::Coding, 0));
    }
}
