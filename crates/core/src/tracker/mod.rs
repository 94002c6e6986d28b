//! Mastery and achievement tracking over a single `ProgressState`.

mod achievements;
mod mastery;
mod stats;

use chrono::{DateTime, NaiveDate, Utc};

use crate::model::{
    AchievementId, Badge, Difficulty, Operation, ProgressState, Question, SessionRecord,
    SessionResult,
};

pub use achievements::{DEDICATION_SESSIONS, SESSION_BADGE_MIN_QUESTIONS, SPEEDSTER_MAX_SECS};
pub use mastery::{MASTERY_THRESHOLD, MASTERY_WINDOW, RAMP_CAP};
pub use stats::{
    DayProgress, MasteryProgress, OperationStatistics, ProgressSummary, RECENT_DAYS, Statistics,
    Trend,
};

/// Outcome of folding one answer into the progress state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerUpdate {
    pub is_correct: bool,
    pub current_streak: u32,
    pub longest_streak: u32,
    /// Achievements unlocked by this answer, in declaration order.
    pub unlocked: Vec<AchievementId>,
}

/// Outcome of folding a completed session into the progress state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub record: SessionRecord,
    pub sessions_completed: u32,
    pub mastery_level: f64,
    pub unlocked: Vec<AchievementId>,
}

//
// ─── TRACKER ───────────────────────────────────────────────────────────────────
//

/// Sole writer of a learner's `ProgressState`.
///
/// Every recording call returns the achievements it unlocked; the tracker
/// itself emits nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressTracker {
    state: ProgressState,
}

impl ProgressTracker {
    /// Fresh zero-state tracker.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            state: ProgressState::new(now),
        }
    }

    /// Restore a persisted snapshot, or start fresh when there is none.
    #[must_use]
    pub fn from_snapshot(snapshot: Option<ProgressState>, now: DateTime<Utc>) -> Self {
        match snapshot {
            Some(state) => Self::restore(state, now),
            None => Self::new(now),
        }
    }

    /// Adopt a persisted snapshot, repairing anything that breaks the bounds:
    /// over-long histories are trimmed to the newest entries, stale days are
    /// dropped, `correct_answers` is clamped to `total_questions`, duplicate
    /// badges collapse to the first, and every badge's flag is set.
    #[must_use]
    pub fn restore(mut state: ProgressState, now: DateTime<Utc>) -> Self {
        state.operation_stats.truncate_all();
        state.purge_daily(now.date_naive());
        state.correct_answers = state.correct_answers.min(state.total_questions);

        let mut seen = Vec::with_capacity(state.badges.len());
        state.badges.retain(|badge| {
            if seen.contains(&badge.id) {
                false
            } else {
                seen.push(badge.id);
                true
            }
        });
        for id in seen {
            state.achievements.unlock(id);
        }

        tracing::info!(
            total_questions = state.total_questions,
            sessions = state.sessions_completed,
            "progress restored"
        );
        Self { state }
    }

    #[must_use]
    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    /// Owned copy for persistence.
    #[must_use]
    pub fn snapshot(&self) -> ProgressState {
        self.state.clone()
    }

    #[must_use]
    pub fn into_state(self) -> ProgressState {
        self.state
    }

    /// Fold one scored answer into the totals, streak and today's entry.
    pub fn record_answer(
        &mut self,
        question: &Question,
        user_answer: f64,
        is_correct: bool,
        at: DateTime<Utc>,
    ) -> AnswerUpdate {
        let state = &mut self.state;
        state.total_questions += 1;
        state.updated_at = at;

        if is_correct {
            state.correct_answers += 1;
            state.current_streak += 1;
            if state.current_streak > state.longest_streak {
                state.longest_streak = state.current_streak;
            }
        } else {
            state.current_streak = 0;
        }

        let today = at.date_naive();
        let day = state.today_mut(today);
        day.total_questions += 1;
        if is_correct {
            day.correct_answers += 1;
        }
        state.purge_daily(today);

        tracing::debug!(
            question = question.display_text(),
            user_answer,
            is_correct,
            streak = state.current_streak,
            "answer recorded"
        );

        let unlocked = self.evaluate(None, at);
        AnswerUpdate {
            is_correct,
            current_streak: self.state.current_streak,
            longest_streak: self.state.longest_streak,
            unlocked,
        }
    }

    /// Fold a completed session into the rolling history.
    pub fn record_session(&mut self, result: &SessionResult, at: DateTime<Utc>) -> SessionUpdate {
        let record = SessionRecord::from_result(result, at);
        let state = &mut self.state;

        state.sessions_completed += 1;
        state.total_time_spent_secs += result.total_time_spent_secs();
        state.last_session_at = Some(at);
        state.updated_at = at;
        state.operation_stats.push(record.clone());

        let today = at.date_naive();
        let day = state.today_mut(today);
        day.time_spent_secs += result.total_time_spent_secs();
        day.sessions_completed += 1;
        state.purge_daily(today);

        tracing::info!(
            operation = %record.operation,
            difficulty = %record.difficulty,
            score = record.score,
            total = record.total_questions,
            "session recorded"
        );

        let unlocked = self.evaluate(Some(&record), at);
        SessionUpdate {
            mastery_level: self.mastery_level(record.operation, record.difficulty),
            sessions_completed: self.state.sessions_completed,
            record,
            unlocked,
        }
    }

    /// Remember the learner's last operation/tier choice.
    pub fn select(&mut self, operation: Operation, difficulty: Difficulty, at: DateTime<Utc>) {
        self.state.current_operation = operation;
        self.state.current_difficulty = difficulty;
        self.state.updated_at = at;
    }

    /// Back to the zero-state. External snapshots are not touched.
    pub fn reset(&mut self, at: DateTime<Utc>) {
        self.state = ProgressState::new(at);
        tracing::info!("progress reset");
    }

    /// 0–100 mastery for the pair.
    #[must_use]
    pub fn mastery_level(&self, operation: Operation, difficulty: Difficulty) -> f64 {
        mastery::level_for(self.state.history(operation, difficulty))
    }

    #[must_use]
    pub fn is_mastered(&self, operation: Operation, difficulty: Difficulty) -> bool {
        self.mastery_level(operation, difficulty) >= MASTERY_THRESHOLD
    }

    #[must_use]
    pub fn mastery_grid(&self) -> Vec<MasteryProgress> {
        stats::mastery_grid(&self.state)
    }

    #[must_use]
    pub fn statistics(&self) -> Statistics {
        stats::statistics(&self.state)
    }

    #[must_use]
    pub fn operation_statistics(
        &self,
        operation: Operation,
        difficulty: Option<Difficulty>,
    ) -> OperationStatistics {
        stats::operation_statistics(&self.state, operation, difficulty)
    }

    #[must_use]
    pub fn recent_progress(&self, today: NaiveDate) -> Vec<DayProgress> {
        stats::recent_progress(&self.state, today)
    }

    #[must_use]
    pub fn summary(&self, today: NaiveDate) -> ProgressSummary {
        stats::summary(&self.state, today)
    }

    fn evaluate(&mut self, latest: Option<&SessionRecord>, at: DateTime<Utc>) -> Vec<AchievementId> {
        let mut unlocked = Vec::new();
        for id in AchievementId::ALL {
            if self.state.achievements.is_unlocked(id)
                || !achievements::is_earned(id, &self.state, latest)
            {
                continue;
            }
            self.state.achievements.unlock(id);
            self.state.badges.push(Badge {
                id,
                unlocked_at: at,
            });
            tracing::info!(achievement = %id, "achievement unlocked");
            unlocked.push(id);
        }
        unlocked
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HISTORY_LIMIT, QuestionId};
    use crate::time::fixed_now;
    use chrono::Duration;

    fn question() -> Question {
        Question::new(QuestionId::new(1), Operation::Addition, 3, 4, 7)
    }

    fn answer(tracker: &mut ProgressTracker, correct: bool) -> AnswerUpdate {
        let value = if correct { 7.0 } else { 8.0 };
        tracker.record_answer(&question(), value, correct, fixed_now())
    }

    fn session(
        operation: Operation,
        difficulty: Difficulty,
        correct: usize,
        total: usize,
        ms_each: u64,
    ) -> SessionResult {
        let questions: Vec<Question> = (0..total)
            .map(|i| {
                let mut q = Question::new(QuestionId::new(i as u64 + 1), operation, 2, 2, 4);
                q.record_answer(if i < correct { 4.0 } else { 0.0 }, ms_each);
                q
            })
            .collect();
        let now = fixed_now();
        SessionResult::from_questions(operation, difficulty, now, now, &questions).unwrap()
    }

    #[test]
    fn streak_resets_on_miss_and_keeps_longest() {
        let mut tracker = ProgressTracker::new(fixed_now());
        for _ in 0..3 {
            answer(&mut tracker, true);
        }
        assert_eq!(tracker.state().current_streak(), 3);

        let update = answer(&mut tracker, false);
        assert_eq!(update.current_streak, 0);
        assert_eq!(update.longest_streak, 3);
        assert_eq!(tracker.state().total_questions(), 4);
        assert_eq!(tracker.state().correct_answers(), 3);
    }

    #[test]
    fn longest_streak_never_decreases() {
        let mut tracker = ProgressTracker::new(fixed_now());
        let pattern = [true, true, false, true, true, true, true, false, true, false];
        let mut last = 0;
        for correct in pattern {
            let update = answer(&mut tracker, correct);
            assert!(update.longest_streak >= last);
            last = update.longest_streak;
            assert!(tracker.state().correct_answers() <= tracker.state().total_questions());
        }
        assert_eq!(last, 4);
    }

    #[test]
    fn first_correct_and_streak_badges_unlock_once() {
        let mut tracker = ProgressTracker::new(fixed_now());
        let first = answer(&mut tracker, true);
        assert_eq!(first.unlocked, vec![AchievementId::FirstCorrect]);

        let mut all = Vec::new();
        for _ in 0..12 {
            all.extend(answer(&mut tracker, true).unlocked);
        }
        assert_eq!(all, vec![AchievementId::Streak5, AchievementId::Streak10]);
        assert_eq!(tracker.state().badges().len(), 3);
    }

    #[test]
    fn perfect_game_appends_exactly_one_badge() {
        let mut tracker = ProgressTracker::new(fixed_now());
        let result = session(Operation::Addition, Difficulty::Easy, 10, 10, 30_000);

        let update = tracker.record_session(&result, fixed_now());
        assert!(update.unlocked.contains(&AchievementId::PerfectGame));
        assert!(
            tracker
                .state()
                .achievements()
                .is_unlocked(AchievementId::PerfectGame)
        );

        tracker.record_session(&result, fixed_now());
        let count = tracker
            .state()
            .badges()
            .iter()
            .filter(|b| b.id == AchievementId::PerfectGame)
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn short_sessions_do_not_earn_session_badges() {
        let mut tracker = ProgressTracker::new(fixed_now());
        let result = session(Operation::Addition, Difficulty::Easy, 9, 9, 1_000);
        let update = tracker.record_session(&result, fixed_now());
        assert!(update.unlocked.is_empty());
    }

    #[test]
    fn speedster_needs_two_minutes_or_less() {
        let mut tracker = ProgressTracker::new(fixed_now());
        let slow = session(Operation::Addition, Difficulty::Easy, 5, 10, 12_100);
        assert!(!tracker.record_session(&slow, fixed_now()).unlocked.contains(&AchievementId::Speedster));

        let fast = session(Operation::Addition, Difficulty::Easy, 5, 10, 12_000);
        assert!(tracker.record_session(&fast, fixed_now()).unlocked.contains(&AchievementId::Speedster));
    }

    #[test]
    fn dedication_after_ten_sessions() {
        let mut tracker = ProgressTracker::new(fixed_now());
        let result = session(Operation::Subtraction, Difficulty::Easy, 1, 2, 1_000);
        for n in 1..=10 {
            let update = tracker.record_session(&result, fixed_now());
            assert_eq!(
                update.unlocked.contains(&AchievementId::Dedication),
                n == 10
            );
        }
    }

    #[test]
    fn mastery_ramps_before_window_fills() {
        let mut tracker = ProgressTracker::new(fixed_now());
        assert_eq!(tracker.mastery_level(Operation::Addition, Difficulty::Easy), 0.0);

        let result = session(Operation::Addition, Difficulty::Easy, 10, 10, 1_000);
        for _ in 0..3 {
            tracker.record_session(&result, fixed_now());
        }
        assert_eq!(tracker.mastery_level(Operation::Addition, Difficulty::Easy), 30.0);
        assert_eq!(tracker.mastery_level(Operation::Addition, Difficulty::Advanced), 0.0);
    }

    #[test]
    fn mastery_averages_last_five_sessions() {
        let mut tracker = ProgressTracker::new(fixed_now());
        // Two poor sessions, then five at 90% and 70% alternating.
        for (correct, total) in [(0, 10), (0, 10), (9, 10), (7, 10), (9, 10), (7, 10), (9, 10)] {
            let result = session(Operation::Division, Difficulty::Intermediate, correct, total, 1_000);
            tracker.record_session(&result, fixed_now());
        }
        let level = tracker.mastery_level(Operation::Division, Difficulty::Intermediate);
        assert!((level - 82.0).abs() < 1e-9);
        assert!(tracker.is_mastered(Operation::Division, Difficulty::Intermediate));
    }

    #[test]
    fn history_keeps_newest_twenty_in_order() {
        let mut tracker = ProgressTracker::new(fixed_now());
        for n in 0..25_i64 {
            let result = session(Operation::Multiplication, Difficulty::Easy, 1, 2, 1_000);
            tracker.record_session(&result, fixed_now() + Duration::minutes(n));
        }
        let history = tracker
            .state()
            .history(Operation::Multiplication, Difficulty::Easy);
        assert_eq!(history.len(), HISTORY_LIMIT);
        assert_eq!(history.front().unwrap().recorded_at, fixed_now() + Duration::minutes(5));
        assert_eq!(history.back().unwrap().recorded_at, fixed_now() + Duration::minutes(24));
        assert!(
            history
                .iter()
                .zip(history.iter().skip(1))
                .all(|(a, b)| a.recorded_at < b.recorded_at)
        );
    }

    #[test]
    fn math_master_requires_every_pair() {
        let mut tracker = ProgressTracker::new(fixed_now());
        let mut unlocked = Vec::new();
        for operation in Operation::ALL {
            for difficulty in Difficulty::ALL {
                for _ in 0..MASTERY_WINDOW {
                    let result = session(operation, difficulty, 8, 10, 1_000);
                    unlocked.extend(tracker.record_session(&result, fixed_now()).unlocked);
                }
            }
        }
        assert_eq!(
            unlocked.iter().filter(|id| **id == AchievementId::MathMaster).count(),
            1
        );
        assert_eq!(unlocked.last(), Some(&AchievementId::MathMaster));
    }

    #[test]
    fn daily_entries_older_than_thirty_days_are_purged() {
        let mut tracker = ProgressTracker::new(fixed_now());
        let long_ago = fixed_now() - Duration::days(40);
        tracker.record_answer(&question(), 7.0, true, long_ago);
        assert_eq!(tracker.state().daily_progress().len(), 1);

        tracker.record_answer(&question(), 7.0, true, fixed_now());
        let days: Vec<_> = tracker.state().daily_progress().keys().copied().collect();
        assert_eq!(days, vec![fixed_now().date_naive()]);
    }

    #[test]
    fn reset_returns_to_zero_state() {
        let mut tracker = ProgressTracker::new(fixed_now());
        answer(&mut tracker, true);
        tracker.record_session(
            &session(Operation::Addition, Difficulty::Easy, 10, 10, 1_000),
            fixed_now(),
        );

        tracker.reset(fixed_now());
        assert_eq!(tracker.state(), &ProgressState::new(fixed_now()));
    }

    #[test]
    fn restore_repairs_broken_snapshot() {
        let mut tracker = ProgressTracker::new(fixed_now());
        answer(&mut tracker, true);
        let mut json = serde_json::to_value(tracker.snapshot()).unwrap();
        json["correct_answers"] = serde_json::json!(50);
        let badge = json["badges"][0].clone();
        json["badges"].as_array_mut().unwrap().push(badge);
        json["achievements"]["firstCorrect"] = serde_json::json!(false);

        let state: ProgressState = serde_json::from_value(json).unwrap();
        let restored = ProgressTracker::restore(state, fixed_now());

        assert_eq!(restored.state().correct_answers(), 1);
        assert_eq!(restored.state().badges().len(), 1);
        assert!(
            restored
                .state()
                .achievements()
                .is_unlocked(AchievementId::FirstCorrect)
        );
    }

    #[test]
    fn summary_covers_week_and_grid() {
        let mut tracker = ProgressTracker::new(fixed_now());
        answer(&mut tracker, true);
        answer(&mut tracker, false);
        tracker.record_session(
            &session(Operation::Addition, Difficulty::Easy, 1, 2, 3_000),
            fixed_now(),
        );

        let summary = tracker.summary(fixed_now().date_naive());
        assert_eq!(summary.recent_progress.len(), 7);
        assert_eq!(summary.recent_progress[6].date, fixed_now().date_naive());
        assert_eq!(summary.weekly_questions, 2);
        assert_eq!(summary.weekly_accuracy, 50.0);
        assert_eq!(summary.mastery.len(), 12);
        assert_eq!(summary.statistics.accuracy, 50.0);
        assert_eq!(summary.statistics.total_time_spent_secs, 6);
        assert_eq!(summary.statistics.average_time_per_question, 3.0);
    }

    #[test]
    fn operation_statistics_detect_trend() {
        let mut tracker = ProgressTracker::new(fixed_now());
        for correct in [5, 5, 5, 9, 9, 9] {
            let result = session(Operation::Addition, Difficulty::Easy, correct, 10, 1_000);
            tracker.record_session(&result, fixed_now());
        }
        let stats = tracker.operation_statistics(Operation::Addition, Some(Difficulty::Easy));
        assert_eq!(stats.total_sessions, 6);
        assert_eq!(stats.total_correct, 42);
        assert_eq!(stats.best_accuracy, 90.0);
        assert_eq!(stats.recent_trend, Trend::Improving);

        let all = tracker.operation_statistics(Operation::Addition, None);
        assert_eq!(all.total_sessions, 6);
        let none = tracker.operation_statistics(Operation::Division, None);
        assert_eq!(none.recent_trend, Trend::Neutral);
        assert_eq!(none.accuracy, 0.0);
    }
}
