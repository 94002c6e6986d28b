use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Difficulty, Operation, Question};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionResultError {
    #[error("completed_at is before started_at")]
    InvalidTimeRange,

    #[error("too many questions for a single session: {len}")]
    TooManyQuestions { len: usize },
}

/// Round to one decimal place, half away from zero.
#[must_use]
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Percentage of `part` in `whole`, or 0 when `whole` is 0.
#[must_use]
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = part as f64 / whole as f64;
    ratio * 100.0
}

fn ms_to_rounded_secs(ms: u64) -> u64 {
    ms.saturating_add(500) / 1000
}

//
// ─── SESSION RESULT ────────────────────────────────────────────────────────────
//

/// Immutable end-of-session snapshot.
///
/// Totals count answered questions only, so an abandoned session reports what
/// the learner actually did.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    operation: Operation,
    difficulty: Difficulty,
    score: u32,
    total_questions: u32,
    accuracy: f64,
    total_time_spent_secs: u64,
    average_time_per_question_secs: u64,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl SessionResult {
    /// Build a result from the session's questions.
    ///
    /// # Errors
    ///
    /// Returns `SessionResultError::InvalidTimeRange` if `completed_at` is before `started_at`.
    /// Returns `SessionResultError::TooManyQuestions` if the count cannot fit in `u32`.
    pub fn from_questions(
        operation: Operation,
        difficulty: Difficulty,
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        questions: &[Question],
    ) -> Result<Self, SessionResultError> {
        if completed_at < started_at {
            return Err(SessionResultError::InvalidTimeRange);
        }

        let answered: Vec<&Question> = questions.iter().filter(|q| q.has_been_answered()).collect();
        let total_questions = u32::try_from(answered.len())
            .map_err(|_| SessionResultError::TooManyQuestions { len: answered.len() })?;
        let score = u32::try_from(answered.iter().filter(|q| q.is_correct()).count())
            .map_err(|_| SessionResultError::TooManyQuestions { len: answered.len() })?;
        let total_ms: u64 = answered.iter().map(|q| q.time_spent_ms()).sum();
        let average_ms = if total_questions == 0 {
            0
        } else {
            total_ms / u64::from(total_questions)
        };

        Ok(Self {
            operation,
            difficulty,
            score,
            total_questions,
            accuracy: round_to_tenth(percentage(u64::from(score), u64::from(total_questions))),
            total_time_spent_secs: ms_to_rounded_secs(total_ms),
            average_time_per_question_secs: ms_to_rounded_secs(average_ms),
            started_at,
            completed_at,
        })
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    /// Percentage correct, rounded to one decimal.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    #[must_use]
    pub fn total_time_spent_secs(&self) -> u64 {
        self.total_time_spent_secs
    }

    #[must_use]
    pub fn average_time_per_question_secs(&self) -> u64 {
        self.average_time_per_question_secs
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

//
// ─── SESSION RECORD ────────────────────────────────────────────────────────────
//

/// Entry in the per-(operation, difficulty) rolling history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub recorded_at: DateTime<Utc>,
    pub operation: Operation,
    pub difficulty: Difficulty,
    pub score: u32,
    pub total_questions: u32,
    /// Unrounded percentage, used for mastery averages.
    pub accuracy: f64,
    pub time_spent_secs: u64,
}

impl SessionRecord {
    #[must_use]
    pub fn from_result(result: &SessionResult, recorded_at: DateTime<Utc>) -> Self {
        Self {
            recorded_at,
            operation: result.operation(),
            difficulty: result.difficulty(),
            score: result.score(),
            total_questions: result.total_questions(),
            accuracy: percentage(
                u64::from(result.score()),
                u64::from(result.total_questions()),
            ),
            time_spent_secs: result.total_time_spent_secs(),
        }
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.total_questions > 0 && self.score == self.total_questions
    }
}
