use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::QuestionId;
use crate::model::operation::Operation;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Raised when raw answer input cannot be read as a number.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerError {
    #[error("answer is not a number: {raw:?}")]
    InvalidAnswerFormat { raw: String },
}

/// Parse raw UI input into a numeric answer.
///
/// Surrounding whitespace is ignored. Non-finite values are rejected.
///
/// # Errors
///
/// Returns `AnswerError::InvalidAnswerFormat` if the input is not a finite number.
pub fn parse_answer(raw: &str) -> Result<f64, AnswerError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| AnswerError::InvalidAnswerFormat {
            raw: raw.to_owned(),
        })
}

//
// ─── QUESTION KEY ──────────────────────────────────────────────────────────────
//

/// Uniqueness key for deduplicating a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuestionKey {
    pub operation: Operation,
    pub operand1: i64,
    pub operand2: i64,
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A single arithmetic problem.
///
/// The problem itself is fixed at generation time. Only the answer-tracking
/// fields change, and only once: the first scored submission wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    id: QuestionId,
    operation: Operation,
    operand1: i64,
    operand2: i64,
    correct_answer: i64,
    display_text: String,

    attempts: u32,
    time_spent_ms: u64,
    user_answer: Option<f64>,
    is_correct: bool,
    has_been_answered: bool,
    started_at: Option<DateTime<Utc>>,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        operation: Operation,
        operand1: i64,
        operand2: i64,
        correct_answer: i64,
    ) -> Self {
        Self {
            id,
            operation,
            operand1,
            operand2,
            correct_answer,
            display_text: format!("{operand1} {} {operand2}", operation.symbol()),
            attempts: 0,
            time_spent_ms: 0,
            user_answer: None,
            is_correct: false,
            has_been_answered: false,
            started_at: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn operand1(&self) -> i64 {
        self.operand1
    }

    #[must_use]
    pub fn operand2(&self) -> i64 {
        self.operand2
    }

    #[must_use]
    pub fn correct_answer(&self) -> i64 {
        self.correct_answer
    }

    #[must_use]
    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    #[must_use]
    pub fn key(&self) -> QuestionKey {
        QuestionKey {
            operation: self.operation,
            operand1: self.operand1,
            operand2: self.operand2,
        }
    }

    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    #[must_use]
    pub fn time_spent_ms(&self) -> u64 {
        self.time_spent_ms
    }

    #[must_use]
    pub fn user_answer(&self) -> Option<f64> {
        self.user_answer
    }

    #[must_use]
    pub fn is_correct(&self) -> bool {
        self.is_correct
    }

    #[must_use]
    pub fn has_been_answered(&self) -> bool {
        self.has_been_answered
    }

    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Exact numeric comparison against the expected result.
    #[must_use]
    #[allow(clippy::float_cmp, clippy::cast_precision_loss)]
    pub fn matches(&self, answer: f64) -> bool {
        answer == self.correct_answer as f64
    }

    /// Nudge toward the answer, getting more explicit with each attempt.
    #[must_use]
    pub fn hint(&self) -> String {
        let (a, b) = (self.operand1, self.operand2);
        let [first, later] = match self.operation {
            Operation::Addition => [
                format!("Try counting up from {a}"),
                format!("{a} + {b} is {a} and {b} more"),
            ],
            Operation::Subtraction => [
                format!("Try counting down from {a}"),
                format!("Think: what number plus {b} equals {a}?"),
            ],
            Operation::Multiplication => [
                format!("{a} groups of {b}"),
                format!("{a} × {b} = {b} added {a} times"),
            ],
            Operation::Division => [
                format!("How many groups of {b} fit into {a}?"),
                format!("Think: {b} × ? = {a}"),
            ],
        };
        if self.attempts == 0 { first } else { later }
    }

    /// Stamp the moment this question was shown.
    pub fn mark_started(&mut self, at: DateTime<Utc>) {
        self.started_at = Some(at);
    }

    /// Score an answer. Returns whether it was correct.
    ///
    /// Once answered, further calls leave the question untouched and return the
    /// stored verdict.
    pub fn record_answer(&mut self, answer: f64, time_spent_ms: u64) -> bool {
        if self.has_been_answered {
            return self.is_correct;
        }

        self.is_correct = self.matches(answer);
        self.user_answer = Some(answer);
        self.time_spent_ms = time_spent_ms;
        self.attempts = self.attempts.saturating_add(1);
        self.has_been_answered = true;
        self.is_correct
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addition(a: i64, b: i64) -> Question {
        Question::new(QuestionId::new(1), Operation::Addition, a, b, a + b)
    }

    #[test]
    fn display_uses_operation_symbol() {
        assert_eq!(addition(3, 4).display_text(), "3 + 4");
        let q = Question::new(QuestionId::new(2), Operation::Division, 12, 3, 4);
        assert_eq!(q.display_text(), "12 ÷ 3");
    }

    #[test]
    fn parse_answer_accepts_numbers_only() {
        assert_eq!(parse_answer(" 7 ").unwrap(), 7.0);
        assert_eq!(parse_answer("7.5").unwrap(), 7.5);
        assert!(matches!(
            parse_answer("seven"),
            Err(AnswerError::InvalidAnswerFormat { .. })
        ));
        assert!(parse_answer("").is_err());
        assert!(parse_answer("NaN").is_err());
        assert!(parse_answer("inf").is_err());
    }

    #[test]
    fn first_answer_wins() {
        let mut q = addition(3, 4);
        assert!(q.record_answer(7.0, 1200));
        assert!(q.has_been_answered());
        assert_eq!(q.attempts(), 1);

        assert!(q.record_answer(8.0, 5000));
        assert_eq!(q.user_answer(), Some(7.0));
        assert_eq!(q.time_spent_ms(), 1200);
        assert_eq!(q.attempts(), 1);
    }

    #[test]
    fn fractional_answer_never_matches_integer_result() {
        let q = addition(3, 4);
        assert!(!q.matches(7.000_001));
        assert!(q.matches(7.0));
    }

    #[test]
    fn hint_gets_more_explicit_after_an_attempt() {
        let mut q = Question::new(QuestionId::new(1), Operation::Division, 12, 3, 4);
        assert_eq!(q.hint(), "How many groups of 3 fit into 12?");
        q.record_answer(5.0, 1_000);
        assert_eq!(q.hint(), "Think: 3 × ? = 12");
    }
}
