use practice_core::distractor::DistractorGenerator;
use practice_core::model::{
    Difficulty, Operation, PracticeSettings, Question, QuestionId, SessionResult,
};
use practice_core::sampler::RandomSampler;
use practice_core::tracker::SessionUpdate;

use super::progress::SessionProgress;
use super::service::{AnswerResult, SessionService};
use crate::error::{PracticeError, SessionError};
use crate::events::PracticeEvent;
use crate::progress_service::ProgressService;

/// A question ready for presentation.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentedQuestion {
    pub question: Question,
    /// Multiple-choice options, when enabled.
    pub options: Option<Vec<i64>>,
}

/// Result of answering a single question in the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerOutcome {
    pub result: AnswerResult,
    /// Empty for a duplicate submission.
    pub events: Vec<PracticeEvent>,
}

/// Result of closing a session in the loop.
#[derive(Debug, Clone, PartialEq)]
pub struct GameOutcome {
    pub result: SessionResult,
    /// `None` when nothing was answered and the session was not recorded.
    pub update: Option<SessionUpdate>,
    pub events: Vec<PracticeEvent>,
    /// Whether the snapshot and the session log entry reached storage.
    /// Retry the snapshot with `save`.
    pub persisted: bool,
}

/// Orchestrates a drill: session control, progress recording, options and
/// notification events.
pub struct PracticeLoopService {
    session: SessionService,
    progress: ProgressService,
    distractors: DistractorGenerator,
    option_sampler: RandomSampler,
    multiple_choice: bool,
}

impl PracticeLoopService {
    #[must_use]
    pub fn new(settings: PracticeSettings, progress: ProgressService) -> Self {
        Self::with_samplers(
            settings,
            progress,
            RandomSampler::from_entropy(),
            RandomSampler::from_entropy(),
        )
    }

    /// Loop with injected samplers for questions and options.
    #[must_use]
    pub fn with_samplers(
        settings: PracticeSettings,
        progress: ProgressService,
        question_sampler: RandomSampler,
        option_sampler: RandomSampler,
    ) -> Self {
        Self {
            distractors: DistractorGenerator::new(&settings),
            session: SessionService::with_sampler(settings, question_sampler),
            progress,
            option_sampler,
            multiple_choice: false,
        }
    }

    #[must_use]
    pub fn with_multiple_choice(mut self, multiple_choice: bool) -> Self {
        self.multiple_choice = multiple_choice;
        self
    }

    #[must_use]
    pub fn session(&self) -> &SessionService {
        &self.session
    }

    #[must_use]
    pub fn progress(&self) -> &ProgressService {
        &self.progress
    }

    pub fn progress_mut(&mut self) -> &mut ProgressService {
        &mut self.progress
    }

    /// Start a session and remember the selection.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Session` if the batch cannot be generated.
    pub fn start(
        &mut self,
        operation: Operation,
        difficulty: Difficulty,
    ) -> Result<SessionProgress, PracticeError> {
        let now = self.progress.clock().now();
        self.session.start(operation, difficulty, now)?;
        self.progress.select(operation, difficulty);
        self.session
            .progress()
            .ok_or_else(|| SessionError::NoActiveSession.into())
    }

    /// Start from raw selection strings.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Session` for an unknown operation or a
    /// generation failure.
    pub fn start_from_selection(
        &mut self,
        operation: &str,
        difficulty: &str,
    ) -> Result<SessionProgress, PracticeError> {
        let operation: Operation = operation.parse().map_err(SessionError::from)?;
        self.start(operation, Difficulty::parse_or_default(difficulty))
    }

    /// Present the next question, with options when multiple choice is on.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Session` unless a session is active.
    pub fn next_question(&mut self) -> Result<Option<PresentedQuestion>, PracticeError> {
        let now = self.progress.clock().now();
        let Some(question) = self.session.next_question(now)?.cloned() else {
            return Ok(None);
        };
        let options = self.multiple_choice.then(|| {
            self.distractors
                .generate_default_options(&mut self.option_sampler, &question)
        });
        Ok(Some(PresentedQuestion { question, options }))
    }

    /// Score an answer and fold it into progress.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Session` for misuse or unparseable input; the
    /// tracker is not touched in that case.
    pub fn submit(&mut self, id: QuestionId, raw: &str) -> Result<AnswerOutcome, PracticeError> {
        let now = self.progress.clock().now();
        let duplicate = self.session.is_answered(id);
        let result = self.session.submit(id, raw, now)?;
        if duplicate {
            return Ok(AnswerOutcome {
                result,
                events: Vec::new(),
            });
        }

        let answered = self
            .session
            .session()
            .and_then(|s| s.questions().iter().find(|q| q.id() == id))
            .cloned();
        let mut events = vec![PracticeEvent::QuestionAnswered {
            is_correct: result.is_correct,
            correct_answer: result.correct_answer,
            time_spent_ms: result.time_spent_ms,
            questions_remaining: result.questions_remaining,
        }];

        if let Some(question) = answered {
            let user_answer = question.user_answer().unwrap_or_default();
            let update = self
                .progress
                .record_answer(&question, user_answer, result.is_correct);
            events.extend(
                update
                    .unlocked
                    .into_iter()
                    .map(|achievement| PracticeEvent::AchievementUnlocked { achievement }),
            );
        }

        Ok(AnswerOutcome { result, events })
    }

    /// Finish the session, record it and persist the snapshot.
    ///
    /// A session with no answers is closed but not recorded. A failed save is
    /// logged and reported through `GameOutcome::persisted`.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Session` unless a session is active.
    pub async fn finish(&mut self) -> Result<GameOutcome, PracticeError> {
        let now = self.progress.clock().now();
        let result = self.session.finish(now)?;

        let mut events = vec![PracticeEvent::GameComplete {
            score: result.score(),
            total_questions: result.total_questions(),
            accuracy: result.accuracy(),
            time_spent_secs: result.total_time_spent_secs(),
        }];

        let update = if result.total_questions() == 0 {
            tracing::info!("no answers given, session not recorded");
            None
        } else {
            let update = self.progress.record_session(&result);
            events.extend(
                update
                    .unlocked
                    .iter()
                    .map(|&achievement| PracticeEvent::AchievementUnlocked { achievement }),
            );
            Some(update)
        };

        let mut persisted = match self.progress.save().await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(error = %err, "progress not saved");
                false
            }
        };
        let logged = match &update {
            Some(update) => self.progress.log_session(&update.record).await,
            None => Ok(()),
        };
        if let Err(err) = logged {
            tracing::warn!(error = %err, "session not logged");
            persisted = false;
        }

        Ok(GameOutcome {
            result,
            update,
            events,
            persisted,
        })
    }

    /// Retry persisting the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns `PracticeError::Progress` if the write fails.
    pub async fn save(&self) -> Result<(), PracticeError> {
        Ok(self.progress.save().await?)
    }
}
