use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use practice_core::Clock;
use practice_core::model::{
    Difficulty, Operation, PracticeSettings, ProgressState, Question, SessionRecord,
    SessionResult,
};
use practice_core::tracker::{AnswerUpdate, ProgressSummary, ProgressTracker, SessionUpdate};
use storage::repository::{
    ENVELOPE_VERSION, ProgressRepository, SessionLogRepository, SettingsRepository, Storage,
    StorageError,
};

use crate::error::ProgressServiceError;

//
// ─── EXPORT DOCUMENT ───────────────────────────────────────────────────────────
//

/// Portable backup of a learner's data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: String,
    pub export_date: DateTime<Utc>,
    #[serde(default)]
    pub progress: Option<ProgressState>,
    #[serde(default)]
    pub settings: Option<PracticeSettings>,
    /// Session log, oldest first.
    #[serde(default)]
    pub sessions: Option<Vec<SessionRecord>>,
}

/// What storage held before an import started.
struct StoredData {
    progress: Option<ProgressState>,
    settings: Option<PracticeSettings>,
    sessions: Vec<SessionRecord>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Owns the learner's tracker and keeps its snapshot in step with storage.
///
/// Recording is synchronous and in-memory; persistence happens only on
/// `save`, `log_session`, `reset` and `import_json`. A failed write never
/// corrupts the in-memory state.
pub struct ProgressService {
    clock: Clock,
    tracker: ProgressTracker,
    progress: Arc<dyn ProgressRepository>,
    settings: Arc<dyn SettingsRepository>,
    sessions: Arc<dyn SessionLogRepository>,
}

impl ProgressService {
    /// Restore the stored snapshot, or start from the zero-state.
    ///
    /// A snapshot that cannot be decoded is logged and discarded.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the backend cannot be read.
    pub async fn load(clock: Clock, storage: &Storage) -> Result<Self, ProgressServiceError> {
        let now = clock.now();
        let snapshot = match storage.progress.load_progress().await {
            Ok(snapshot) => snapshot,
            Err(StorageError::Serialization(reason)) => {
                tracing::warn!(%reason, "stored progress is unreadable, starting fresh");
                None
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            clock,
            tracker: ProgressTracker::from_snapshot(snapshot, now),
            progress: Arc::clone(&storage.progress),
            settings: Arc::clone(&storage.settings),
            sessions: Arc::clone(&storage.sessions),
        })
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    /// Mutable clock, for advancing a fixed clock in tests.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }

    #[must_use]
    pub fn tracker(&self) -> &ProgressTracker {
        &self.tracker
    }

    #[must_use]
    pub fn state(&self) -> &ProgressState {
        self.tracker.state()
    }

    pub fn record_answer(
        &mut self,
        question: &Question,
        user_answer: f64,
        is_correct: bool,
    ) -> AnswerUpdate {
        let now = self.clock.now();
        self.tracker
            .record_answer(question, user_answer, is_correct, now)
    }

    pub fn record_session(&mut self, result: &SessionResult) -> SessionUpdate {
        let now = self.clock.now();
        self.tracker.record_session(result, now)
    }

    pub fn select(&mut self, operation: Operation, difficulty: Difficulty) {
        let now = self.clock.now();
        self.tracker.select(operation, difficulty, now);
    }

    #[must_use]
    pub fn summary(&self) -> ProgressSummary {
        self.tracker.summary(self.clock.today())
    }

    /// Persist the current snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the write fails.
    pub async fn save(&self) -> Result<(), ProgressServiceError> {
        self.progress
            .save_progress(self.tracker.state(), self.clock.now())
            .await?;
        tracing::info!(
            total_questions = self.tracker.state().total_questions(),
            "progress saved"
        );
        Ok(())
    }

    /// Append a finished session to the cross-operation log.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the write fails.
    pub async fn log_session(&self, record: &SessionRecord) -> Result<(), ProgressServiceError> {
        self.sessions.append_session(record).await?;
        Ok(())
    }

    /// Up to `limit` logged sessions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if the log cannot be read.
    pub async fn recent_sessions(
        &self,
        limit: usize,
    ) -> Result<Vec<SessionRecord>, ProgressServiceError> {
        let mut sessions = self.sessions.list_sessions().await?;
        sessions.reverse();
        sessions.truncate(limit);
        Ok(sessions)
    }

    /// Return to the zero-state, then clear the stored snapshot.
    ///
    /// The session log is kept.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if clearing fails; the
    /// in-memory state is already reset by then.
    pub async fn reset(&mut self) -> Result<(), ProgressServiceError> {
        self.tracker.reset(self.clock.now());
        self.progress.clear_progress().await?;
        Ok(())
    }

    /// Pretty JSON backup of progress, persisted settings and the session log.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if settings cannot be read or
    /// the document cannot be encoded.
    pub async fn export_json(&self) -> Result<String, ProgressServiceError> {
        let document = ExportDocument {
            version: ENVELOPE_VERSION.to_owned(),
            export_date: self.clock.now(),
            progress: Some(self.tracker.snapshot()),
            settings: self.settings.get_settings().await?,
            sessions: Some(self.sessions.list_sessions().await?),
        };
        serde_json::to_string_pretty(&document).map_err(|err| {
            ProgressServiceError::from(StorageError::Serialization(err.to_string()))
        })
    }

    /// Replace progress, settings and the session log from an export
    /// document. Sections missing from the document are left alone.
    ///
    /// Returns the imported settings, if any.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Import` for a malformed document or
    /// invalid settings, and `ProgressServiceError::Storage` if persisting
    /// fails. A failed write puts the previously stored data back, and in
    /// every error case the in-memory progress is unchanged.
    pub async fn import_json(
        &mut self,
        raw: &str,
    ) -> Result<Option<PracticeSettings>, ProgressServiceError> {
        let document: ExportDocument = serde_json::from_str(raw)
            .map_err(|err| ProgressServiceError::Import(err.to_string()))?;
        let settings = document
            .settings
            .map(PracticeSettings::validated)
            .transpose()
            .map_err(|err| ProgressServiceError::Import(err.to_string()))?;

        let now = self.clock.now();
        let restored = document
            .progress
            .map(|progress| ProgressTracker::restore(progress, now));

        let backup = self.stored_data().await?;
        let written = self
            .write_imported(
                restored.as_ref().map(ProgressTracker::state),
                settings.as_ref(),
                document.sessions.as_deref(),
                now,
            )
            .await;
        if let Err(err) = written {
            tracing::warn!(error = %err, "import failed, restoring previous data");
            self.write_back(backup, now).await;
            return Err(err);
        }

        if let Some(restored) = restored {
            self.tracker = restored;
        }
        tracing::info!(
            version = %document.version,
            exported = %document.export_date,
            "data imported"
        );
        Ok(settings)
    }

    async fn stored_data(&self) -> Result<StoredData, ProgressServiceError> {
        let progress = match self.progress.load_progress().await {
            Ok(progress) => progress,
            Err(StorageError::Serialization(reason)) => {
                tracing::warn!(%reason, "stored progress is unreadable, not backed up");
                None
            }
            Err(err) => return Err(err.into()),
        };
        Ok(StoredData {
            progress,
            settings: self.settings.get_settings().await?,
            sessions: self.sessions.list_sessions().await?,
        })
    }

    async fn write_imported(
        &self,
        progress: Option<&ProgressState>,
        settings: Option<&PracticeSettings>,
        sessions: Option<&[SessionRecord]>,
        now: DateTime<Utc>,
    ) -> Result<(), ProgressServiceError> {
        if let Some(progress) = progress {
            self.progress.save_progress(progress, now).await?;
        }
        if let Some(settings) = settings {
            self.settings.save_settings(settings).await?;
        }
        if let Some(sessions) = sessions {
            self.sessions.replace_sessions(sessions).await?;
        }
        Ok(())
    }

    /// Best effort: each failed step is logged and the rest still run.
    async fn write_back(&self, backup: StoredData, now: DateTime<Utc>) {
        let progress = match &backup.progress {
            Some(progress) => self.progress.save_progress(progress, now).await,
            None => self.progress.clear_progress().await,
        };
        let settings = match &backup.settings {
            Some(settings) => self.settings.save_settings(settings).await,
            None => self.settings.clear_settings().await,
        };
        let sessions = self.sessions.replace_sessions(&backup.sessions).await;

        for (part, outcome) in [
            ("progress", progress),
            ("settings", settings),
            ("sessions", sessions),
        ] {
            if let Err(err) = outcome {
                tracing::warn!(part, error = %err, "could not restore previous data");
            }
        }
    }
}
