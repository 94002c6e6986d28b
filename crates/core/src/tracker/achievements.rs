use crate::model::{AchievementId, Difficulty, Operation, ProgressState, SessionRecord};

use super::mastery::{MASTERY_THRESHOLD, MASTERY_WINDOW, recent_average};

/// Sessions needed for `Dedication`.
pub const DEDICATION_SESSIONS: u32 = 10;

/// Minimum session length for the session-based badges.
pub const SESSION_BADGE_MIN_QUESTIONS: u32 = 10;

/// Time limit for `Speedster`, in seconds.
pub const SPEEDSTER_MAX_SECS: u64 = 120;

/// Whether `id` should be unlocked given the current state.
///
/// `latest` is the session just folded in, if any. Session badges only fire
/// on that record.
pub(crate) fn is_earned(
    id: AchievementId,
    state: &ProgressState,
    latest: Option<&SessionRecord>,
) -> bool {
    match id {
        AchievementId::FirstCorrect => state.correct_answers >= 1,
        AchievementId::Streak5 => state.current_streak >= 5,
        AchievementId::Streak10 => state.current_streak >= 10,
        AchievementId::Dedication => state.sessions_completed >= DEDICATION_SESSIONS,
        AchievementId::MathMaster => has_mastered_all(state),
        AchievementId::PerfectGame => latest.is_some_and(|record| {
            record.total_questions >= SESSION_BADGE_MIN_QUESTIONS && record.is_perfect()
        }),
        AchievementId::Speedster => latest.is_some_and(|record| {
            record.total_questions >= SESSION_BADGE_MIN_QUESTIONS
                && record.time_spent_secs <= SPEEDSTER_MAX_SECS
        }),
    }
}

fn has_mastered_all(state: &ProgressState) -> bool {
    Operation::ALL.into_iter().all(|operation| {
        Difficulty::ALL.into_iter().all(|difficulty| {
            let history = state.history(operation, difficulty);
            history.len() >= MASTERY_WINDOW
                && recent_average(history).is_some_and(|avg| avg >= MASTERY_THRESHOLD)
        })
    })
}
