//! Deduplicated, shuffled question batches per (operation, difficulty).

use rand::Rng;
use std::collections::HashSet;
use thiserror::Error;

use crate::model::{
    Difficulty, OperandRange, Operation, PracticeSettings, Question, QuestionId,
};
use crate::sampler::RandomSampler;

/// Upper bound on any generated answer.
pub const MAX_ANSWER: i64 = 10_000;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("no valid {operation} question could be generated at {difficulty} difficulty")]
    NoValidQuestion {
        operation: Operation,
        difficulty: Difficulty,
    },
}

//
// ─── GENERATOR ─────────────────────────────────────────────────────────────────
//

/// Builds practice batches under the configured settings.
///
/// # Examples
///
/// ```
/// # use practice_core::generator::QuestionGenerator;
/// # use practice_core::model::{Difficulty, Operation, PracticeSettings};
/// # use practice_core::sampler::RandomSampler;
/// let generator = QuestionGenerator::new(PracticeSettings::default());
/// let mut sampler = RandomSampler::seeded(1);
/// let batch = generator.generate_batch(&mut sampler, Operation::Division, Difficulty::Easy, 10)?;
/// assert_eq!(batch.len(), 10);
/// assert!(batch.iter().all(|q| q.operand1() % q.operand2() == 0));
/// # Ok::<(), practice_core::generator::GenerationError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct QuestionGenerator {
    settings: PracticeSettings,
}

impl QuestionGenerator {
    #[must_use]
    pub fn new(settings: PracticeSettings) -> Self {
        Self { settings }
    }

    #[must_use]
    pub fn settings(&self) -> &PracticeSettings {
        &self.settings
    }

    /// Batch of `questions_per_game` questions.
    ///
    /// # Errors
    ///
    /// See [`QuestionGenerator::generate_batch`].
    pub fn generate_default_batch<R: Rng>(
        &self,
        sampler: &mut RandomSampler<R>,
        operation: Operation,
        difficulty: Difficulty,
    ) -> Result<Vec<Question>, GenerationError> {
        let count = usize::try_from(self.settings.questions_per_game()).unwrap_or(usize::MAX);
        self.generate_batch(sampler, operation, difficulty, count)
    }

    /// Generate `count` questions in random order.
    ///
    /// Each slot redraws up to `duplicate_budget()` times on a key collision.
    /// When the budget runs out the last valid duplicate is accepted and a
    /// warning is logged, so small operand spaces still yield a full batch.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::NoValidQuestion` if no draw within the budget
    /// passes the validity filter.
    pub fn generate_batch<R: Rng>(
        &self,
        sampler: &mut RandomSampler<R>,
        operation: Operation,
        difficulty: Difficulty,
        count: usize,
    ) -> Result<Vec<Question>, GenerationError> {
        let range = difficulty.range();
        let budget = self.settings.duplicate_budget().max(1);
        let mut seen = HashSet::with_capacity(count);
        let mut questions = Vec::with_capacity(count);

        while questions.len() < count {
            let id = QuestionId::new(questions.len() as u64 + 1);
            let mut accepted = None;
            let mut duplicate = None;

            for _ in 0..budget {
                let candidate = self.generate_single(sampler, operation, range, id);
                if !self.is_valid(&candidate) {
                    continue;
                }
                if seen.contains(&candidate.key()) {
                    duplicate = Some(candidate);
                    continue;
                }
                accepted = Some(candidate);
                break;
            }

            let question = match (accepted, duplicate) {
                (Some(question), _) => question,
                (None, Some(question)) => {
                    tracing::warn!(
                        %operation,
                        %difficulty,
                        question = question.display_text(),
                        budget,
                        "duplicate budget exhausted; accepting repeated question"
                    );
                    question
                }
                (None, None) => {
                    return Err(GenerationError::NoValidQuestion {
                        operation,
                        difficulty,
                    });
                }
            };

            seen.insert(question.key());
            questions.push(question);
        }

        sampler.shuffle(&mut questions);
        tracing::debug!(%operation, %difficulty, count = questions.len(), "generated batch");
        Ok(questions)
    }

    /// Rejects negative answers (unless allowed) and answers above `MAX_ANSWER`.
    #[must_use]
    pub fn is_valid(&self, question: &Question) -> bool {
        let answer = question.correct_answer();
        if answer < 0 && !self.settings.allow_negative_results() {
            return false;
        }
        answer <= MAX_ANSWER
    }

    fn generate_single<R: Rng>(
        &self,
        sampler: &mut RandomSampler<R>,
        operation: Operation,
        range: OperandRange,
        id: QuestionId,
    ) -> Question {
        match operation {
            Operation::Addition => {
                let a = sampler.int_in(range);
                let b = sampler.int_in(range);
                Question::new(id, operation, a, b, a + b)
            }
            Operation::Subtraction => {
                let mut a = sampler.int_in(range);
                let mut b = sampler.int_in(range);
                if !self.settings.allow_negative_results() && a < b {
                    std::mem::swap(&mut a, &mut b);
                }
                Question::new(id, operation, a, b, a - b)
            }
            Operation::Multiplication => {
                let a = sampler.int_in(range);
                let b = sampler.int_in(range.multiplier());
                Question::new(id, operation, a, b, a * b)
            }
            Operation::Division => {
                let quotient = sampler.int_in(range);
                let divisor = sampler.int_in(range.divisor());
                Question::new(id, operation, quotient * divisor, divisor, quotient)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(operation: Operation, difficulty: Difficulty, seed: u64) -> Vec<Question> {
        QuestionGenerator::default()
            .generate_batch(&mut RandomSampler::seeded(seed), operation, difficulty, 10)
            .unwrap()
    }

    #[test]
    fn batches_are_full_distinct_and_bounded() {
        for operation in Operation::ALL {
            for difficulty in Difficulty::ALL {
                for seed in 0..20 {
                    let questions = batch(operation, difficulty, seed);
                    assert_eq!(questions.len(), 10);

                    let keys: HashSet<_> = questions.iter().map(Question::key).collect();
                    assert_eq!(keys.len(), 10, "{operation} {difficulty} seed {seed}");

                    for q in &questions {
                        assert_eq!(q.operation(), operation);
                        assert!((0..=MAX_ANSWER).contains(&q.correct_answer()));
                    }
                }
            }
        }
    }

    #[test]
    fn subtraction_never_goes_negative_by_default() {
        for seed in 0..50 {
            for q in batch(Operation::Subtraction, Difficulty::Advanced, seed) {
                assert!(q.operand1() >= q.operand2());
                assert_eq!(q.correct_answer(), q.operand1() - q.operand2());
            }
        }
    }

    #[test]
    fn subtraction_keeps_order_when_negatives_allowed() {
        let settings = PracticeSettings::new(10, true, 3, 4, 100).unwrap();
        let generator = QuestionGenerator::new(settings);
        let mut sampler = RandomSampler::seeded(11);
        let mut saw_negative = false;
        for _ in 0..20 {
            let questions = generator
                .generate_batch(&mut sampler, Operation::Subtraction, Difficulty::Easy, 10)
                .unwrap();
            saw_negative |= questions.iter().any(|q| q.correct_answer() < 0);
        }
        assert!(saw_negative);
    }

    #[test]
    fn division_is_always_whole() {
        for difficulty in Difficulty::ALL {
            for seed in 0..30 {
                for q in batch(Operation::Division, difficulty, seed) {
                    assert_eq!(q.operand1() % q.operand2(), 0);
                    assert_eq!(q.correct_answer() * q.operand2(), q.operand1());
                    assert!((2..=12).contains(&q.operand2()));
                }
            }
        }
    }

    #[test]
    fn multiplier_is_capped_at_twelve() {
        for seed in 0..30 {
            for q in batch(Operation::Multiplication, Difficulty::Advanced, seed) {
                assert!((1..=12).contains(&q.operand2()));
                assert!((1..=100).contains(&q.operand1()));
            }
        }
    }

    #[test]
    fn same_seed_reproduces_batch() {
        let a = batch(Operation::Addition, Difficulty::Intermediate, 99);
        let b = batch(Operation::Addition, Difficulty::Intermediate, 99);
        assert_eq!(a, b);
    }

    #[test]
    fn exhausted_key_space_accepts_duplicates() {
        // Easy subtraction has 55 distinct keys.
        let questions = QuestionGenerator::default()
            .generate_batch(
                &mut RandomSampler::seeded(5),
                Operation::Subtraction,
                Difficulty::Easy,
                60,
            )
            .unwrap();
        assert_eq!(questions.len(), 60);
        let keys: HashSet<_> = questions.iter().map(Question::key).collect();
        assert!(keys.len() < 60);
    }

    #[test]
    fn ids_are_unique_within_batch() {
        let questions = batch(Operation::Addition, Difficulty::Easy, 1);
        let ids: HashSet<_> = questions.iter().map(Question::id).collect();
        assert_eq!(ids.len(), questions.len());
    }

    #[test]
    fn validity_filter_rejects_out_of_range_answers() {
        let generator = QuestionGenerator::default();
        let huge = Question::new(QuestionId::new(1), Operation::Multiplication, 1_000, 11, 11_000);
        let negative = Question::new(QuestionId::new(2), Operation::Subtraction, 1, 2, -1);
        assert!(!generator.is_valid(&huge));
        assert!(!generator.is_valid(&negative));
    }
}
