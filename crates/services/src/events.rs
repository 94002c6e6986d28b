use practice_core::model::AchievementId;
use serde::Serialize;

/// Notification produced by the practice loop for presentation collaborators.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
#[non_exhaustive]
pub enum PracticeEvent {
    #[serde(rename_all = "camelCase")]
    QuestionAnswered {
        is_correct: bool,
        correct_answer: i64,
        time_spent_ms: u64,
        questions_remaining: usize,
    },
    #[serde(rename_all = "camelCase")]
    GameComplete {
        score: u32,
        total_questions: u32,
        accuracy: f64,
        time_spent_secs: u64,
    },
    #[serde(rename_all = "camelCase")]
    AchievementUnlocked { achievement: AchievementId },
}
