use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::model::{
    Badge, Difficulty, Operation, ProgressState, SessionRecord, percentage, round_to_tenth,
};

use super::mastery::{MASTERY_THRESHOLD, level_for};

/// Days covered by the recent-activity view.
pub const RECENT_DAYS: i64 = 7;

/// Accuracy swing (in points) that counts as a trend.
const TREND_MARGIN: f64 = 5.0;

/// Overall learner statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_questions: u64,
    pub correct_answers: u64,
    pub accuracy: f64,
    pub total_time_spent_secs: u64,
    pub average_time_per_question: f64,
    pub sessions_completed: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub badges_earned: usize,
    pub last_session_at: Option<DateTime<Utc>>,
}

/// Direction of recent accuracy for a set of sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Improving,
    Declining,
    Neutral,
}

/// Aggregate over one operation's history, optionally narrowed to a tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatistics {
    pub total_sessions: usize,
    pub total_questions: u64,
    pub total_correct: u64,
    pub accuracy: f64,
    pub average_time_spent: f64,
    pub best_accuracy: f64,
    pub recent_trend: Trend,
}

/// One zero-filled day in the recent-activity view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayProgress {
    pub date: NaiveDate,
    pub total_questions: u32,
    pub correct_answers: u32,
    pub time_spent_secs: u64,
    pub sessions_completed: u32,
    pub accuracy: f64,
}

/// Mastery reading for one operation/tier pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryProgress {
    pub operation: Operation,
    pub difficulty: Difficulty,
    pub level: u8,
    pub sessions_completed: usize,
    pub is_mastered: bool,
}

/// Dashboard aggregate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub statistics: Statistics,
    pub weekly_questions: u64,
    pub weekly_accuracy: f64,
    pub recent_progress: Vec<DayProgress>,
    pub badges: Vec<Badge>,
    pub mastery: Vec<MasteryProgress>,
}

pub(crate) fn statistics(state: &ProgressState) -> Statistics {
    let average_time = if state.total_questions == 0 {
        0.0
    } else {
        #[allow(clippy::cast_precision_loss)]
        let avg = state.total_time_spent_secs as f64 / state.total_questions as f64;
        round_to_tenth(avg)
    };

    Statistics {
        total_questions: state.total_questions,
        correct_answers: state.correct_answers,
        accuracy: round_to_tenth(percentage(state.correct_answers, state.total_questions)),
        total_time_spent_secs: state.total_time_spent_secs,
        average_time_per_question: average_time,
        sessions_completed: state.sessions_completed,
        current_streak: state.current_streak,
        longest_streak: state.longest_streak,
        badges_earned: state.badges.len(),
        last_session_at: state.last_session_at,
    }
}

pub(crate) fn operation_statistics(
    state: &ProgressState,
    operation: Operation,
    difficulty: Option<Difficulty>,
) -> OperationStatistics {
    let sessions: Vec<&SessionRecord> = match difficulty {
        Some(difficulty) => state.history(operation, difficulty).iter().collect(),
        None => Difficulty::ALL
            .into_iter()
            .flat_map(|d| state.history(operation, d).iter())
            .collect(),
    };
    summarize_sessions(&sessions)
}

fn summarize_sessions(sessions: &[&SessionRecord]) -> OperationStatistics {
    let total_sessions = sessions.len();
    let total_questions: u64 = sessions.iter().map(|s| u64::from(s.total_questions)).sum();
    let total_correct: u64 = sessions.iter().map(|s| u64::from(s.score)).sum();
    let total_time: u64 = sessions.iter().map(|s| s.time_spent_secs).sum();
    let best_accuracy = sessions
        .iter()
        .map(|s| s.accuracy)
        .fold(0.0_f64, f64::max);

    #[allow(clippy::cast_precision_loss)]
    let average_time_spent = if total_sessions == 0 {
        0.0
    } else {
        total_time as f64 / total_sessions as f64
    };

    OperationStatistics {
        total_sessions,
        total_questions,
        total_correct,
        accuracy: round_to_tenth(percentage(total_correct, total_questions)),
        average_time_spent: round_to_tenth(average_time_spent),
        best_accuracy: round_to_tenth(best_accuracy),
        recent_trend: trend(sessions),
    }
}

fn trend(sessions: &[&SessionRecord]) -> Trend {
    if sessions.len() < 6 {
        return Trend::Neutral;
    }
    let mean = |window: &[&SessionRecord]| {
        window.iter().map(|s| s.accuracy).sum::<f64>() / 3.0
    };
    let n = sessions.len();
    let recent = mean(&sessions[n - 3..]);
    let previous = mean(&sessions[n - 6..n - 3]);

    if recent > previous + TREND_MARGIN {
        Trend::Improving
    } else if recent < previous - TREND_MARGIN {
        Trend::Declining
    } else {
        Trend::Neutral
    }
}

pub(crate) fn recent_progress(state: &ProgressState, today: NaiveDate) -> Vec<DayProgress> {
    (0..RECENT_DAYS)
        .rev()
        .map(|back| {
            let date = today - Duration::days(back);
            let day = state.daily_progress.get(&date).copied().unwrap_or_default();
            DayProgress {
                date,
                total_questions: day.total_questions,
                correct_answers: day.correct_answers,
                time_spent_secs: day.time_spent_secs,
                sessions_completed: day.sessions_completed,
                accuracy: percentage(
                    u64::from(day.correct_answers),
                    u64::from(day.total_questions),
                ),
            }
        })
        .collect()
}

pub(crate) fn mastery_grid(state: &ProgressState) -> Vec<MasteryProgress> {
    let mut grid = Vec::with_capacity(Operation::ALL.len() * Difficulty::ALL.len());
    for operation in Operation::ALL {
        for difficulty in Difficulty::ALL {
            let history = state.history(operation, difficulty);
            let level = level_for(history);
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let rounded = level.round().clamp(0.0, 100.0) as u8;
            grid.push(MasteryProgress {
                operation,
                difficulty,
                level: rounded,
                sessions_completed: history.len(),
                is_mastered: level >= MASTERY_THRESHOLD,
            });
        }
    }
    grid
}

pub(crate) fn summary(state: &ProgressState, today: NaiveDate) -> ProgressSummary {
    let recent = recent_progress(state, today);
    let weekly_questions: u64 = recent.iter().map(|d| u64::from(d.total_questions)).sum();
    let weekly_correct: u64 = recent.iter().map(|d| u64::from(d.correct_answers)).sum();

    ProgressSummary {
        statistics: statistics(state),
        weekly_questions,
        weekly_accuracy: round_to_tenth(percentage(weekly_correct, weekly_questions)),
        recent_progress: recent,
        badges: state.badges.clone(),
        mastery: mastery_grid(state),
    }
}
