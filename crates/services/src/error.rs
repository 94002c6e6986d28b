//! Shared error types for the services crate.

use thiserror::Error;

use practice_core::generator::GenerationError;
use practice_core::model::{AnswerError, OperationError, QuestionId, SessionResultError};
use storage::repository::StorageError;

/// Errors emitted by `SessionService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no active session")]
    NoActiveSession,
    #[error("question {id} is not the current question")]
    QuestionMismatch { id: QuestionId },
    #[error(transparent)]
    InvalidAnswer(#[from] AnswerError),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Result(#[from] SessionResultError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("invalid export document: {0}")]
    Import(String),
}

/// Errors emitted by `PracticeLoopService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Progress(#[from] ProgressServiceError),
}
