use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::model::{Difficulty, Operation, SessionRecord};

/// Sessions kept per (operation, difficulty) pair.
pub const HISTORY_LIMIT: usize = 20;

/// Days of daily activity kept, counted back from today.
pub const DAILY_RETENTION_DAYS: i64 = 30;

//
// ─── ACHIEVEMENTS ──────────────────────────────────────────────────────────────
//

/// One-shot milestones a learner can unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AchievementId {
    /// At least one correct answer ever.
    FirstCorrect,
    /// Current streak reached 5.
    Streak5,
    /// Current streak reached 10.
    Streak10,
    /// A session of 10+ questions finished within 120 seconds.
    Speedster,
    /// A session of 10+ questions with every answer correct.
    PerfectGame,
    /// 10 completed sessions.
    Dedication,
    /// Every operation and tier mastered.
    MathMaster,
}

impl AchievementId {
    pub const ALL: [AchievementId; 7] = [
        AchievementId::FirstCorrect,
        AchievementId::Streak5,
        AchievementId::Streak10,
        AchievementId::Speedster,
        AchievementId::PerfectGame,
        AchievementId::Dedication,
        AchievementId::MathMaster,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AchievementId::FirstCorrect => "firstCorrect",
            AchievementId::Streak5 => "streak5",
            AchievementId::Streak10 => "streak10",
            AchievementId::Speedster => "speedster",
            AchievementId::PerfectGame => "perfectGame",
            AchievementId::Dedication => "dedication",
            AchievementId::MathMaster => "mathMaster",
        }
    }
}

impl std::fmt::Display for AchievementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unlock flags, serialized as an id → bool map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Achievements {
    first_correct: bool,
    streak5: bool,
    streak10: bool,
    speedster: bool,
    perfect_game: bool,
    dedication: bool,
    math_master: bool,
}

impl Achievements {
    #[must_use]
    pub fn is_unlocked(&self, id: AchievementId) -> bool {
        match id {
            AchievementId::FirstCorrect => self.first_correct,
            AchievementId::Streak5 => self.streak5,
            AchievementId::Streak10 => self.streak10,
            AchievementId::Speedster => self.speedster,
            AchievementId::PerfectGame => self.perfect_game,
            AchievementId::Dedication => self.dedication,
            AchievementId::MathMaster => self.math_master,
        }
    }

    /// Unlocked ids in declaration order.
    pub fn unlocked(&self) -> impl Iterator<Item = AchievementId> + '_ {
        AchievementId::ALL
            .into_iter()
            .filter(|id| self.is_unlocked(*id))
    }

    /// Sets the flag. There is no way to clear it again.
    pub(crate) fn unlock(&mut self, id: AchievementId) {
        let flag = match id {
            AchievementId::FirstCorrect => &mut self.first_correct,
            AchievementId::Streak5 => &mut self.streak5,
            AchievementId::Streak10 => &mut self.streak10,
            AchievementId::Speedster => &mut self.speedster,
            AchievementId::PerfectGame => &mut self.perfect_game,
            AchievementId::Dedication => &mut self.dedication,
            AchievementId::MathMaster => &mut self.math_master,
        };
        *flag = true;
    }
}

/// Unlock record, appended once per achievement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: AchievementId,
    pub unlocked_at: DateTime<Utc>,
}

//
// ─── DAILY PROGRESS ────────────────────────────────────────────────────────────
//

/// Counters for one calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyProgress {
    pub total_questions: u32,
    pub correct_answers: u32,
    pub time_spent_secs: u64,
    pub sessions_completed: u32,
}

//
// ─── SESSION HISTORY ───────────────────────────────────────────────────────────
//

/// Rolling history for one operation, one queue per tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DifficultyHistory {
    easy: VecDeque<SessionRecord>,
    intermediate: VecDeque<SessionRecord>,
    advanced: VecDeque<SessionRecord>,
}

impl DifficultyHistory {
    fn get(&self, difficulty: Difficulty) -> &VecDeque<SessionRecord> {
        match difficulty {
            Difficulty::Easy => &self.easy,
            Difficulty::Intermediate => &self.intermediate,
            Difficulty::Advanced => &self.advanced,
        }
    }

    fn get_mut(&mut self, difficulty: Difficulty) -> &mut VecDeque<SessionRecord> {
        match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Intermediate => &mut self.intermediate,
            Difficulty::Advanced => &mut self.advanced,
        }
    }
}

/// Per-operation, per-tier session history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationStats {
    addition: DifficultyHistory,
    subtraction: DifficultyHistory,
    multiplication: DifficultyHistory,
    division: DifficultyHistory,
}

impl OperationStats {
    fn for_operation(&self, operation: Operation) -> &DifficultyHistory {
        match operation {
            Operation::Addition => &self.addition,
            Operation::Subtraction => &self.subtraction,
            Operation::Multiplication => &self.multiplication,
            Operation::Division => &self.division,
        }
    }

    fn for_operation_mut(&mut self, operation: Operation) -> &mut DifficultyHistory {
        match operation {
            Operation::Addition => &mut self.addition,
            Operation::Subtraction => &mut self.subtraction,
            Operation::Multiplication => &mut self.multiplication,
            Operation::Division => &mut self.division,
        }
    }

    /// Sessions for the pair, oldest first.
    #[must_use]
    pub fn history(&self, operation: Operation, difficulty: Difficulty) -> &VecDeque<SessionRecord> {
        self.for_operation(operation).get(difficulty)
    }

    /// Append a record, evicting the oldest entries past `HISTORY_LIMIT`.
    pub(crate) fn push(&mut self, record: SessionRecord) {
        let queue = self
            .for_operation_mut(record.operation)
            .get_mut(record.difficulty);
        queue.push_back(record);
        while queue.len() > HISTORY_LIMIT {
            queue.pop_front();
        }
    }

    pub(crate) fn truncate_all(&mut self) {
        for operation in Operation::ALL {
            for difficulty in Difficulty::ALL {
                let queue = self.for_operation_mut(operation).get_mut(difficulty);
                while queue.len() > HISTORY_LIMIT {
                    queue.pop_front();
                }
            }
        }
    }
}

//
// ─── PROGRESS STATE ────────────────────────────────────────────────────────────
//

/// Long-lived learner aggregate.
///
/// Serializes to a plain tree of maps, sequences and primitives. All mutation
/// goes through `ProgressTracker`, which keeps the history and retention bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressState {
    #[serde(default)]
    pub(crate) current_operation: Operation,
    #[serde(default)]
    pub(crate) current_difficulty: Difficulty,
    pub(crate) total_questions: u64,
    pub(crate) correct_answers: u64,
    #[serde(default)]
    pub(crate) total_time_spent_secs: u64,
    pub(crate) sessions_completed: u32,
    pub(crate) current_streak: u32,
    pub(crate) longest_streak: u32,
    #[serde(default)]
    pub(crate) badges: Vec<Badge>,
    #[serde(default)]
    pub(crate) operation_stats: OperationStats,
    #[serde(default)]
    pub(crate) achievements: Achievements,
    #[serde(default)]
    pub(crate) daily_progress: BTreeMap<NaiveDate, DailyProgress>,
    #[serde(default)]
    pub(crate) last_session_at: Option<DateTime<Utc>>,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

impl ProgressState {
    /// Zero-state created at first use.
    #[must_use]
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_operation: Operation::default(),
            current_difficulty: Difficulty::default(),
            total_questions: 0,
            correct_answers: 0,
            total_time_spent_secs: 0,
            sessions_completed: 0,
            current_streak: 0,
            longest_streak: 0,
            badges: Vec::new(),
            operation_stats: OperationStats::default(),
            achievements: Achievements::default(),
            daily_progress: BTreeMap::new(),
            last_session_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[must_use]
    pub fn current_operation(&self) -> Operation {
        self.current_operation
    }

    #[must_use]
    pub fn current_difficulty(&self) -> Difficulty {
        self.current_difficulty
    }

    #[must_use]
    pub fn total_questions(&self) -> u64 {
        self.total_questions
    }

    #[must_use]
    pub fn correct_answers(&self) -> u64 {
        self.correct_answers
    }

    #[must_use]
    pub fn total_time_spent_secs(&self) -> u64 {
        self.total_time_spent_secs
    }

    #[must_use]
    pub fn sessions_completed(&self) -> u32 {
        self.sessions_completed
    }

    #[must_use]
    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    #[must_use]
    pub fn longest_streak(&self) -> u32 {
        self.longest_streak
    }

    #[must_use]
    pub fn badges(&self) -> &[Badge] {
        &self.badges
    }

    #[must_use]
    pub fn achievements(&self) -> &Achievements {
        &self.achievements
    }

    #[must_use]
    pub fn history(&self, operation: Operation, difficulty: Difficulty) -> &VecDeque<SessionRecord> {
        self.operation_stats.history(operation, difficulty)
    }

    #[must_use]
    pub fn daily_progress(&self) -> &BTreeMap<NaiveDate, DailyProgress> {
        &self.daily_progress
    }

    #[must_use]
    pub fn last_session_at(&self) -> Option<DateTime<Utc>> {
        self.last_session_at
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn today_mut(&mut self, today: NaiveDate) -> &mut DailyProgress {
        self.daily_progress.entry(today).or_default()
    }

    /// Drop daily entries older than the retention window.
    pub(crate) fn purge_daily(&mut self, today: NaiveDate) {
        let cutoff = today - Duration::days(DAILY_RETENTION_DAYS);
        self.daily_progress.retain(|day, _| *day >= cutoff);
    }
}
