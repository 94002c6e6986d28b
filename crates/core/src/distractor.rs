//! Multiple-choice options built from common arithmetic mistakes.

use rand::Rng;
use std::collections::BTreeSet;

use crate::model::{Operation, PracticeSettings, Question};
use crate::sampler::RandomSampler;

/// Inclusive bounds a distractor must fall in.
pub const DISTRACTOR_MIN: i64 = 0;
pub const DISTRACTOR_MAX: i64 = 1_000;

/// A plausible wrong path from operands to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mistake {
    Above(i64),
    Below(i64),
    FirstTwice,
    MultipliedInstead,
    SubtractedInstead,
    FirstPlusSmall,
    SecondPlusSmall,
    AddedInstead,
    ReversedOrder,
    SubtractedOther,
    AddedBack,
    ForgotToOperate,
    ExtraGroup,
    MissingGroup,
    FirstOffByOne,
    SecondOffByOne,
    SecondShort,
    RemainderAsWhole,
    ConfusedOperands,
    Doubled,
    Halved,
    PlusTen,
}

const ADDITION: &[Mistake] = &[
    Mistake::Above(5),
    Mistake::Below(5),
    Mistake::FirstTwice,
    Mistake::MultipliedInstead,
    Mistake::SubtractedInstead,
    Mistake::FirstPlusSmall,
    Mistake::SecondPlusSmall,
];

const SUBTRACTION: &[Mistake] = &[
    Mistake::Above(5),
    Mistake::Below(3),
    Mistake::AddedInstead,
    Mistake::ReversedOrder,
    Mistake::SubtractedOther,
    Mistake::AddedBack,
    Mistake::ForgotToOperate,
];

const MULTIPLICATION: &[Mistake] = &[
    Mistake::ExtraGroup,
    Mistake::MissingGroup,
    Mistake::AddedInstead,
    Mistake::FirstOffByOne,
    Mistake::SecondOffByOne,
    Mistake::SecondShort,
    Mistake::Above(10),
];

const DIVISION: &[Mistake] = &[
    Mistake::Above(1),
    Mistake::Below(1),
    Mistake::RemainderAsWhole,
    Mistake::SubtractedInstead,
    Mistake::ConfusedOperands,
    Mistake::ForgotToOperate,
    Mistake::Doubled,
];

const GENERIC: &[Mistake] = &[
    Mistake::Above(5),
    Mistake::Below(5),
    Mistake::Doubled,
    Mistake::Halved,
    Mistake::PlusTen,
];

fn pool(operation: Operation) -> &'static [Mistake] {
    match operation {
        Operation::Addition => ADDITION,
        Operation::Subtraction => SUBTRACTION,
        Operation::Multiplication => MULTIPLICATION,
        Operation::Division => DIVISION,
    }
}

impl Mistake {
    fn apply<R: Rng>(self, sampler: &mut RandomSampler<R>, question: &Question) -> i64 {
        let a = question.operand1();
        let b = question.operand2();
        let c = question.correct_answer();
        match self {
            Mistake::Above(n) => c + sampler.int_between(1, n),
            Mistake::Below(n) => c - sampler.int_between(1, n),
            Mistake::FirstTwice => a + b + a,
            Mistake::MultipliedInstead => a * b,
            Mistake::SubtractedInstead => match question.operation() {
                Operation::Division => a - b,
                _ => (a - b).abs(),
            },
            Mistake::FirstPlusSmall => a + sampler.int_between(1, 10),
            Mistake::SecondPlusSmall => b + sampler.int_between(1, 10),
            Mistake::AddedInstead => a + b,
            Mistake::ReversedOrder => b - a,
            Mistake::SubtractedOther => a - sampler.int_between(1, b.max(1)),
            Mistake::AddedBack => (c + b).abs(),
            Mistake::ForgotToOperate => a,
            Mistake::ExtraGroup => c + a,
            Mistake::MissingGroup => c - a,
            Mistake::FirstOffByOne => (a + 1) * b,
            Mistake::SecondOffByOne => a * (b + 1),
            Mistake::SecondShort => a * (b - 1),
            Mistake::RemainderAsWhole => a.checked_div(b).unwrap_or(c) + 1,
            Mistake::ConfusedOperands => b,
            Mistake::Doubled => c * 2,
            Mistake::Halved => c / 2,
            Mistake::PlusTen => c + 10,
        }
    }
}

//
// ─── GENERATOR ─────────────────────────────────────────────────────────────────
//

/// Produces shuffled option sets that contain the correct answer exactly once.
#[derive(Debug, Clone)]
pub struct DistractorGenerator {
    option_count: usize,
    max_attempts: u32,
}

impl Default for DistractorGenerator {
    fn default() -> Self {
        Self::new(&PracticeSettings::default())
    }
}

impl DistractorGenerator {
    #[must_use]
    pub fn new(settings: &PracticeSettings) -> Self {
        Self {
            option_count: usize::try_from(settings.distractor_count()).unwrap_or(usize::MAX),
            max_attempts: settings.distractor_attempts(),
        }
    }

    #[must_use]
    pub fn option_count(&self) -> usize {
        self.option_count
    }

    /// Options using the configured count.
    pub fn generate_default_options<R: Rng>(
        &self,
        sampler: &mut RandomSampler<R>,
        question: &Question,
    ) -> Vec<i64> {
        self.generate_options(sampler, question, self.option_count)
    }

    /// `count` distinct options including the correct answer, in random order.
    ///
    /// Mistakes are drawn uniformly from the operation's pool. A candidate is
    /// kept only if it differs from the answer and lies in
    /// `[DISTRACTOR_MIN, DISTRACTOR_MAX]`. After `max_attempts` rejected draws
    /// the generic pool takes over, then a deterministic outward scan.
    pub fn generate_options<R: Rng>(
        &self,
        sampler: &mut RandomSampler<R>,
        question: &Question,
        count: usize,
    ) -> Vec<i64> {
        let correct = question.correct_answer();
        let wanted = count.saturating_sub(1);
        let mut distractors = BTreeSet::new();

        for mistakes in [pool(question.operation()), GENERIC] {
            let mut attempts = 0;
            while distractors.len() < wanted && attempts < self.max_attempts {
                attempts += 1;
                let mistake = mistakes[sampler.index(mistakes.len())];
                let candidate = mistake.apply(sampler, question);
                if is_acceptable(candidate, correct) {
                    distractors.insert(candidate);
                }
            }
            if distractors.len() >= wanted {
                break;
            }
            tracing::warn!(
                question = question.display_text(),
                found = distractors.len(),
                wanted,
                "distractor attempts exhausted; falling back"
            );
        }

        let mut offset = 1;
        while distractors.len() < wanted && offset <= DISTRACTOR_MAX - DISTRACTOR_MIN + correct.abs() {
            for candidate in [correct + offset, correct - offset] {
                if distractors.len() < wanted && is_acceptable(candidate, correct) {
                    distractors.insert(candidate);
                }
            }
            offset += 1;
        }

        let mut options = Vec::with_capacity(distractors.len() + 1);
        options.push(correct);
        options.extend(distractors);
        sampler.shuffle(&mut options);
        options
    }
}

fn is_acceptable(candidate: i64, correct: i64) -> bool {
    candidate != correct && (DISTRACTOR_MIN..=DISTRACTOR_MAX).contains(&candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::QuestionGenerator;
    use crate::model::{Difficulty, QuestionId};
    use std::collections::HashSet;

    #[test]
    fn options_contain_answer_once_and_are_distinct() {
        let generator = QuestionGenerator::default();
        let distractors = DistractorGenerator::default();
        let mut sampler = RandomSampler::seeded(17);

        for operation in Operation::ALL {
            for difficulty in Difficulty::ALL {
                let batch = generator
                    .generate_batch(&mut sampler, operation, difficulty, 10)
                    .unwrap();
                for q in &batch {
                    let options = distractors.generate_default_options(&mut sampler, q);
                    assert_eq!(options.len(), 4, "{}", q.display_text());
                    let unique: HashSet<_> = options.iter().collect();
                    assert_eq!(unique.len(), 4);
                    assert_eq!(
                        options.iter().filter(|o| **o == q.correct_answer()).count(),
                        1
                    );
                    for o in options.iter().filter(|o| **o != q.correct_answer()) {
                        assert!((DISTRACTOR_MIN..=DISTRACTOR_MAX).contains(o));
                    }
                }
            }
        }
    }

    #[test]
    fn answer_outside_window_still_gets_options() {
        // 100 × 12 has no in-range mistake above the answer.
        let q = Question::new(QuestionId::new(1), Operation::Multiplication, 100, 12, 1_200);
        let options = DistractorGenerator::default().generate_options(
            &mut RandomSampler::seeded(2),
            &q,
            4,
        );
        assert_eq!(options.len(), 4);
        assert!(options.contains(&1_200));
    }

    #[test]
    fn zero_answer_falls_back_to_positive_offsets() {
        let q = Question::new(QuestionId::new(1), Operation::Subtraction, 1, 1, 0);
        let options =
            DistractorGenerator::default().generate_options(&mut RandomSampler::seeded(8), &q, 6);
        assert_eq!(options.len(), 6);
        assert!(options.iter().all(|o| *o >= 0));
    }

    #[test]
    fn single_option_is_just_the_answer() {
        let q = Question::new(QuestionId::new(1), Operation::Addition, 2, 3, 5);
        let options =
            DistractorGenerator::default().generate_options(&mut RandomSampler::seeded(1), &q, 1);
        assert_eq!(options, vec![5]);
    }
}
