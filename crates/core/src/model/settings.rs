use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("questions per game must be between 1 and {}", MAX_QUESTIONS_PER_GAME)]
    InvalidQuestionsPerGame,

    #[error("max retries must be > 0")]
    InvalidMaxRetries,

    #[error("multiple choice needs at least 2 options")]
    InvalidDistractorCount,

    #[error("distractor attempts must be > 0")]
    InvalidDistractorAttempts,
}

/// Upper bound on the batch size.
pub const MAX_QUESTIONS_PER_GAME: u32 = 100;

//
// ─── SETTINGS ──────────────────────────────────────────────────────────────────
//

/// Tunables for batch generation and multiple-choice options.
///
/// - `questions_per_game`: batch size, at most `MAX_QUESTIONS_PER_GAME` (default 10)
/// - `allow_negative_results`: keep subtraction operands as drawn (default off)
/// - `max_retries`: duplicate budget multiplier, the generator redraws up to
///   `max_retries * 10` times on a key collision (default 3)
/// - `distractor_count`: number of options including the correct one (default 4)
/// - `distractor_attempts`: redraw budget before the generic fallback (default 100)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSettings {
    questions_per_game: u32,
    allow_negative_results: bool,
    max_retries: u32,
    distractor_count: u32,
    distractor_attempts: u32,
}

impl Default for PracticeSettings {
    fn default() -> Self {
        Self {
            questions_per_game: 10,
            allow_negative_results: false,
            max_retries: 3,
            distractor_count: 4,
            distractor_attempts: 100,
        }
    }
}

impl PracticeSettings {
    /// Creates custom settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if any bound is out of range.
    pub fn new(
        questions_per_game: u32,
        allow_negative_results: bool,
        max_retries: u32,
        distractor_count: u32,
        distractor_attempts: u32,
    ) -> Result<Self, SettingsError> {
        if questions_per_game == 0 || questions_per_game > MAX_QUESTIONS_PER_GAME {
            return Err(SettingsError::InvalidQuestionsPerGame);
        }
        if max_retries == 0 {
            return Err(SettingsError::InvalidMaxRetries);
        }
        if distractor_count < 2 {
            return Err(SettingsError::InvalidDistractorCount);
        }
        if distractor_attempts == 0 {
            return Err(SettingsError::InvalidDistractorAttempts);
        }

        Ok(Self {
            questions_per_game,
            allow_negative_results,
            max_retries,
            distractor_count,
            distractor_attempts,
        })
    }

    /// Re-run validation, e.g. after deserializing a hand-edited file.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if any bound is out of range.
    pub fn validated(self) -> Result<Self, SettingsError> {
        Self::new(
            self.questions_per_game,
            self.allow_negative_results,
            self.max_retries,
            self.distractor_count,
            self.distractor_attempts,
        )
    }

    #[must_use]
    pub fn questions_per_game(&self) -> u32 {
        self.questions_per_game
    }

    #[must_use]
    pub fn allow_negative_results(&self) -> bool {
        self.allow_negative_results
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Draws allowed per slot before a duplicate is accepted.
    #[must_use]
    pub fn duplicate_budget(&self) -> u32 {
        self.max_retries.saturating_mul(10)
    }

    #[must_use]
    pub fn distractor_count(&self) -> u32 {
        self.distractor_count
    }

    #[must_use]
    pub fn distractor_attempts(&self) -> u32 {
        self.distractor_attempts
    }
}
