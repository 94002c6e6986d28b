mod ids;
mod operation;
mod progress;
mod question;
mod session;
mod settings;

pub use ids::QuestionId;
pub use operation::{Difficulty, OperandRange, Operation, OperationError};
pub use progress::{
    AchievementId, Achievements, Badge, DAILY_RETENTION_DAYS, DailyProgress, HISTORY_LIMIT,
    ProgressState,
};
pub use question::{AnswerError, Question, QuestionKey, parse_answer};
pub use session::{SessionRecord, SessionResult, SessionResultError, percentage, round_to_tenth};
pub use settings::{MAX_QUESTIONS_PER_GAME, PracticeSettings, SettingsError};
