use chrono::{DateTime, Utc};
use std::fmt;

use practice_core::generator::QuestionGenerator;
use practice_core::model::{
    Difficulty, Operation, PracticeSettings, Question, QuestionId, SessionResult, parse_answer,
};
use practice_core::sampler::RandomSampler;
use practice_core::time::elapsed_ms;

use super::progress::SessionProgress;
use crate::error::SessionError;

//
// ─── ANSWER RESULT ─────────────────────────────────────────────────────────────
//

/// Outcome of scoring one submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerResult {
    pub question_id: QuestionId,
    pub is_correct: bool,
    pub correct_answer: i64,
    pub time_spent_ms: u64,
    pub questions_remaining: usize,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Lifecycle phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Active,
    Completed,
}

/// One practice session's batch and cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    operation: Operation,
    difficulty: Difficulty,
    questions: Vec<Question>,
    results: Vec<Option<AnswerResult>>,
    current: usize,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl Session {
    fn new(
        operation: Operation,
        difficulty: Difficulty,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let results = vec![None; questions.len()];
        Self {
            operation,
            difficulty,
            questions,
            results,
            current: 0,
            started_at,
            ended_at: None,
        }
    }

    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    fn remaining(&self) -> usize {
        self.questions.len().saturating_sub(self.current)
    }

    fn progress(&self, is_complete: bool) -> SessionProgress {
        SessionProgress {
            total: self.questions.len(),
            answered: self.results.iter().filter(|r| r.is_some()).count(),
            remaining: self.remaining(),
            is_complete,
        }
    }
}

enum SessionState {
    Idle,
    Active(Session),
    Completed(Session),
}

//
// ─── CONTROLLER ────────────────────────────────────────────────────────────────
//

/// Session controller: `Idle → Active → Completed`.
///
/// Holds at most one session. Starting a new one discards whatever was there.
/// Every timestamp comes from the caller so the services layer clock stays in
/// charge.
pub struct SessionService {
    generator: QuestionGenerator,
    sampler: RandomSampler,
    state: SessionState,
}

impl SessionService {
    /// Controller seeded from OS entropy.
    #[must_use]
    pub fn new(settings: PracticeSettings) -> Self {
        Self::with_sampler(settings, RandomSampler::from_entropy())
    }

    /// Controller with an injected sampler, usually seeded for tests.
    #[must_use]
    pub fn with_sampler(settings: PracticeSettings, sampler: RandomSampler) -> Self {
        Self {
            generator: QuestionGenerator::new(settings),
            sampler,
            state: SessionState::Idle,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &PracticeSettings {
        self.generator.settings()
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        match self.state {
            SessionState::Idle => SessionPhase::Idle,
            SessionState::Active(_) => SessionPhase::Active,
            SessionState::Completed(_) => SessionPhase::Completed,
        }
    }

    /// The active or most recently completed session.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Active(session) | SessionState::Completed(session) => Some(session),
        }
    }

    #[must_use]
    pub fn progress(&self) -> Option<SessionProgress> {
        match &self.state {
            SessionState::Idle => None,
            SessionState::Active(session) => Some(session.progress(false)),
            SessionState::Completed(session) => Some(session.progress(true)),
        }
    }

    /// Generate a fresh batch and make it the active session.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Generation` if no valid question can be drawn.
    pub fn start(
        &mut self,
        operation: Operation,
        difficulty: Difficulty,
        now: DateTime<Utc>,
    ) -> Result<&Session, SessionError> {
        let questions = self
            .generator
            .generate_default_batch(&mut self.sampler, operation, difficulty)?;

        if let SessionState::Active(previous) = &self.state {
            tracing::info!(
                answered = previous.progress(false).answered,
                "abandoning active session"
            );
        }

        tracing::info!(
            %operation,
            %difficulty,
            questions = questions.len(),
            "session started"
        );
        self.state =
            SessionState::Active(Session::new(operation, difficulty, questions, now));
        self.session().ok_or(SessionError::NoActiveSession)
    }

    /// Start from raw selection strings.
    ///
    /// An unknown difficulty falls back to easy; an unknown operation fails.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Operation` for an unrecognized operation, or
    /// `SessionError::Generation` if no valid question can be drawn.
    pub fn start_from_selection(
        &mut self,
        operation: &str,
        difficulty: &str,
        now: DateTime<Utc>,
    ) -> Result<&Session, SessionError> {
        let operation: Operation = operation.parse()?;
        let difficulty = Difficulty::parse_or_default(difficulty);
        self.start(operation, difficulty, now)
    }

    /// Whether question `id` in the active session has been answered.
    #[must_use]
    pub fn is_answered(&self, id: QuestionId) -> bool {
        match &self.state {
            SessionState::Active(session) => session
                .questions
                .iter()
                .any(|q| q.id() == id && q.has_been_answered()),
            _ => false,
        }
    }

    /// Current question without stamping it.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match &self.state {
            SessionState::Active(session) => session.questions.get(session.current),
            _ => None,
        }
    }

    /// Present the current question, stamping its start time.
    ///
    /// Returns `Ok(None)` once every question has been answered.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` unless a session is active.
    pub fn next_question(&mut self, now: DateTime<Utc>) -> Result<Option<&Question>, SessionError> {
        let SessionState::Active(session) = &mut self.state else {
            return Err(SessionError::NoActiveSession);
        };
        let Some(question) = session.questions.get_mut(session.current) else {
            return Ok(None);
        };
        question.mark_started(now);
        Ok(Some(&*question))
    }

    /// Score `raw` against question `id` and advance.
    ///
    /// Submitting for a question that was already answered returns the stored
    /// result and changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` unless a session is active,
    /// `SessionError::QuestionMismatch` if `id` is neither answered nor current,
    /// and `SessionError::InvalidAnswer` if `raw` is not a number. None of these
    /// mutate the session.
    pub fn submit(
        &mut self,
        id: QuestionId,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<AnswerResult, SessionError> {
        let SessionState::Active(session) = &mut self.state else {
            return Err(SessionError::NoActiveSession);
        };

        let idx = session
            .questions
            .iter()
            .position(|q| q.id() == id)
            .ok_or(SessionError::QuestionMismatch { id })?;

        if let Some(stored) = session.results[idx] {
            tracing::debug!(%id, "duplicate submission ignored");
            return Ok(stored);
        }
        if idx != session.current {
            return Err(SessionError::QuestionMismatch { id });
        }

        let answer = parse_answer(raw)?;
        let question = &mut session.questions[idx];
        let time_spent_ms = question
            .started_at()
            .map_or(0, |started| elapsed_ms(started, now));
        let is_correct = question.record_answer(answer, time_spent_ms);
        let correct_answer = question.correct_answer();

        session.current += 1;
        let result = AnswerResult {
            question_id: id,
            is_correct,
            correct_answer,
            time_spent_ms,
            questions_remaining: session.remaining(),
        };
        session.results[idx] = Some(result);

        tracing::debug!(
            %id,
            answer,
            is_correct,
            time_spent_ms,
            remaining = result.questions_remaining,
            "answer submitted"
        );
        Ok(result)
    }

    /// Close the session and compute its result.
    ///
    /// May be called before every question is answered; the result then
    /// covers the answered questions only.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NoActiveSession` unless a session is active, or
    /// `SessionError::Result` if `now` precedes the session start.
    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<SessionResult, SessionError> {
        let SessionState::Active(session) = &self.state else {
            return Err(SessionError::NoActiveSession);
        };

        let result = SessionResult::from_questions(
            session.operation,
            session.difficulty,
            session.started_at,
            now,
            &session.questions,
        )?;

        if let SessionState::Active(mut session) =
            std::mem::replace(&mut self.state, SessionState::Idle)
        {
            session.ended_at = Some(now);
            self.state = SessionState::Completed(session);
        }

        tracing::info!(
            score = result.score(),
            total = result.total_questions(),
            accuracy = result.accuracy(),
            "session finished"
        );
        Ok(result)
    }
}

impl fmt::Debug for SessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let session = self.session();
        f.debug_struct("SessionService")
            .field("phase", &self.phase())
            .field("questions_len", &session.map(|s| s.questions.len()))
            .field("current", &session.map(|s| s.current))
            .field("settings", self.settings())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use practice_core::time::fixed_now;

    fn service() -> SessionService {
        SessionService::with_sampler(PracticeSettings::default(), RandomSampler::seeded(7))
    }

    fn answer_for(question: &Question) -> String {
        question.correct_answer().to_string()
    }

    #[test]
    fn starts_idle_and_rejects_submissions() {
        let mut svc = service();
        assert_eq!(svc.phase(), SessionPhase::Idle);
        assert!(svc.progress().is_none());

        let err = svc.submit(QuestionId::new(1), "7", fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::NoActiveSession));
        let err = svc.finish(fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::NoActiveSession));
        assert!(matches!(
            svc.next_question(fixed_now()),
            Err(SessionError::NoActiveSession)
        ));
    }

    #[test]
    fn easy_addition_scores_exactly() {
        let mut svc = service();
        let session = svc
            .start(Operation::Addition, Difficulty::Easy, fixed_now())
            .unwrap();
        assert_eq!(session.questions().len(), 10);

        let question = svc.next_question(fixed_now()).unwrap().unwrap().clone();
        let wrong = (question.correct_answer() + 1).to_string();
        let result = svc
            .submit(question.id(), &wrong, fixed_now() + Duration::milliseconds(1_500))
            .unwrap();
        assert!(!result.is_correct);
        assert_eq!(result.correct_answer, question.correct_answer());
        assert_eq!(result.time_spent_ms, 1_500);
        assert_eq!(result.questions_remaining, 9);

        let next = svc.next_question(fixed_now()).unwrap().unwrap().clone();
        let result = svc.submit(next.id(), &answer_for(&next), fixed_now()).unwrap();
        assert!(result.is_correct);
        assert_eq!(result.questions_remaining, 8);
    }

    #[test]
    fn invalid_answer_does_not_advance() {
        let mut svc = service();
        svc.start(Operation::Subtraction, Difficulty::Easy, fixed_now())
            .unwrap();
        let question = svc.next_question(fixed_now()).unwrap().unwrap().clone();

        let err = svc.submit(question.id(), "seven", fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidAnswer(_)));
        assert_eq!(svc.session().unwrap().current_index(), 0);
        assert!(!svc.current_question().unwrap().has_been_answered());
    }

    #[test]
    fn duplicate_submission_returns_stored_result() {
        let mut svc = service();
        svc.start(Operation::Multiplication, Difficulty::Intermediate, fixed_now())
            .unwrap();
        let question = svc.next_question(fixed_now()).unwrap().unwrap().clone();
        let raw = answer_for(&question);

        let first = svc
            .submit(question.id(), &raw, fixed_now() + Duration::seconds(2))
            .unwrap();
        let index_after_first = svc.session().unwrap().current_index();

        let second = svc
            .submit(question.id(), "not even a number", fixed_now() + Duration::seconds(9))
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(svc.session().unwrap().current_index(), index_after_first);
    }

    #[test]
    fn skipping_ahead_is_a_mismatch() {
        let mut svc = service();
        let session = svc
            .start(Operation::Division, Difficulty::Easy, fixed_now())
            .unwrap();
        let later = session.questions()[3].id();

        let err = svc.submit(later, "1", fixed_now()).unwrap_err();
        assert!(matches!(err, SessionError::QuestionMismatch { id } if id == later));
        let err = svc
            .submit(QuestionId::new(999), "1", fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::QuestionMismatch { .. }));
    }

    #[test]
    fn full_session_completes_with_result() {
        let mut svc = service();
        svc.start(Operation::Addition, Difficulty::Advanced, fixed_now())
            .unwrap();

        let mut at = fixed_now();
        while let Some(question) = svc.next_question(at).unwrap() {
            let question = question.clone();
            at += Duration::seconds(3);
            svc.submit(question.id(), &answer_for(&question), at).unwrap();
        }
        assert_eq!(svc.progress().unwrap().remaining, 0);
        assert!(!svc.progress().unwrap().is_complete);

        let result = svc.finish(at).unwrap();
        assert_eq!(result.score(), 10);
        assert_eq!(result.total_questions(), 10);
        assert_eq!(result.accuracy(), 100.0);
        assert_eq!(result.total_time_spent_secs(), 30);
        assert_eq!(result.average_time_per_question_secs(), 3);

        assert_eq!(svc.phase(), SessionPhase::Completed);
        assert_eq!(svc.session().unwrap().ended_at(), Some(at));
        assert!(svc.progress().unwrap().is_complete);
        assert!(matches!(
            svc.finish(at),
            Err(SessionError::NoActiveSession)
        ));
    }

    #[test]
    fn early_finish_counts_answered_only() {
        let mut svc = service();
        svc.start(Operation::Addition, Difficulty::Easy, fixed_now())
            .unwrap();
        for _ in 0..3 {
            let q = svc.next_question(fixed_now()).unwrap().unwrap().clone();
            svc.submit(q.id(), &answer_for(&q), fixed_now()).unwrap();
        }

        let result = svc.finish(fixed_now()).unwrap();
        assert_eq!(result.total_questions(), 3);
        assert_eq!(result.score(), 3);
    }

    #[test]
    fn selection_strings_resolve_or_fail() {
        let mut svc = service();
        let session = svc
            .start_from_selection("division", "impossible", fixed_now())
            .unwrap();
        assert_eq!(session.operation(), Operation::Division);
        assert_eq!(session.difficulty(), Difficulty::Easy);

        let err = svc
            .start_from_selection("exponent", "easy", fixed_now())
            .unwrap_err();
        assert!(matches!(err, SessionError::Operation(_)));
        // the failed start leaves the previous session in place
        assert_eq!(svc.phase(), SessionPhase::Active);
    }

    #[test]
    fn restart_discards_previous_session() {
        let mut svc = service();
        svc.start(Operation::Addition, Difficulty::Easy, fixed_now())
            .unwrap();
        let q = svc.next_question(fixed_now()).unwrap().unwrap().clone();
        svc.submit(q.id(), &answer_for(&q), fixed_now()).unwrap();

        svc.start(Operation::Subtraction, Difficulty::Easy, fixed_now())
            .unwrap();
        let progress = svc.progress().unwrap();
        assert_eq!(progress.answered, 0);
        assert_eq!(progress.remaining, 10);
        assert_eq!(svc.session().unwrap().operation(), Operation::Subtraction);
    }

    #[test]
    fn unstamped_question_records_zero_time() {
        let mut svc = service();
        svc.start(Operation::Addition, Difficulty::Easy, fixed_now())
            .unwrap();
        let q = svc.current_question().unwrap().clone();
        let result = svc
            .submit(q.id(), &answer_for(&q), fixed_now() + Duration::seconds(5))
            .unwrap();
        assert_eq!(result.time_spent_ms, 0);
    }
}
