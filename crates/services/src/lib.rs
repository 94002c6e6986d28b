#![forbid(unsafe_code)]

pub mod error;
pub mod events;
pub mod progress_service;
pub mod sessions;

pub use practice_core::Clock;

pub use error::{PracticeError, ProgressServiceError, SessionError};
pub use events::PracticeEvent;
pub use progress_service::{ExportDocument, ProgressService};
pub use sessions::{
    AnswerOutcome, AnswerResult, GameOutcome, PracticeLoopService, PresentedQuestion, Session,
    SessionPhase, SessionProgress, SessionService,
};
