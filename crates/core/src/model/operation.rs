use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationError {
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),
}

//
// ─── OPERATION ─────────────────────────────────────────────────────────────────
//

/// The four arithmetic operations a batch can be generated for.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    #[default]
    Addition,
    Subtraction,
    Multiplication,
    Division,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Addition,
        Operation::Subtraction,
        Operation::Multiplication,
        Operation::Division,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Addition => "addition",
            Operation::Subtraction => "subtraction",
            Operation::Multiplication => "multiplication",
            Operation::Division => "division",
        }
    }

    /// Printed operator used in `display_text`.
    #[must_use]
    pub fn symbol(self) -> char {
        match self {
            Operation::Addition => '+',
            Operation::Subtraction => '-',
            Operation::Multiplication => '×',
            Operation::Division => '÷',
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "addition" | "add" | "+" => Ok(Self::Addition),
            "subtraction" | "sub" | "-" => Ok(Self::Subtraction),
            "multiplication" | "mul" | "×" | "*" | "x" => Ok(Self::Multiplication),
            "division" | "div" | "÷" | "/" => Ok(Self::Division),
            _ => Err(OperationError::UnknownOperation(s.to_owned())),
        }
    }
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty tier, mapping to an operand magnitude range.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Easy,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    /// Operand range for this tier.
    #[must_use]
    pub fn range(self) -> OperandRange {
        match self {
            Difficulty::Easy => OperandRange::new(1, 10),
            Difficulty::Intermediate => OperandRange::new(1, 50),
            Difficulty::Advanced => OperandRange::new(1, 100),
        }
    }

    /// Lenient parse used for UI selections: unknown tiers fall back to `Easy`.
    #[must_use]
    pub fn parse_or_default(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|err: OperationError| {
            tracing::warn!(%err, "falling back to easy difficulty");
            Self::default()
        })
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = OperationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "intermediate" | "medium" => Ok(Self::Intermediate),
            "advanced" | "hard" => Ok(Self::Advanced),
            _ => Err(OperationError::UnknownDifficulty(s.to_owned())),
        }
    }
}

//
// ─── OPERAND RANGE ─────────────────────────────────────────────────────────────
//

/// Inclusive operand bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandRange {
    pub min: i64,
    pub max: i64,
}

impl OperandRange {
    #[must_use]
    pub const fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Second-operand bound for multiplication: `[min, min(max, 12)]`.
    #[must_use]
    pub fn multiplier(self) -> Self {
        Self::new(self.min, self.max.min(12))
    }

    /// Divisor bound for division: `[max(2, min), min(max, 12)]`.
    #[must_use]
    pub fn divisor(self) -> Self {
        Self::new(self.min.max(2), self.max.min(12))
    }
}
