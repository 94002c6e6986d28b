use async_trait::async_trait;
use chrono::{DateTime, Utc};
use practice_core::model::{PracticeSettings, ProgressState, SessionRecord};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── SNAPSHOT ENVELOPE ─────────────────────────────────────────────────────────
//

/// Format version written into every progress envelope.
pub const ENVELOPE_VERSION: &str = "1.0";

/// Entries kept in the cross-operation session log.
pub const SESSION_LOG_LIMIT: usize = 20;

/// Persisted wrapper around a progress snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEnvelope {
    pub version: String,
    pub data: ProgressState,
    pub updated: DateTime<Utc>,
}

impl ProgressEnvelope {
    #[must_use]
    pub fn new(data: ProgressState, updated: DateTime<Utc>) -> Self {
        Self {
            version: ENVELOPE_VERSION.to_owned(),
            data,
            updated,
        }
    }

    /// Encode as JSON text.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the snapshot cannot be encoded.
    pub fn encode(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|err| StorageError::Serialization(err.to_string()))
    }

    /// Decode JSON text, accepting both the envelope and a bare legacy snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if the text is neither.
    pub fn decode(raw: &str) -> Result<ProgressState, StorageError> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|err| StorageError::Serialization(err.to_string()))?;

        let is_envelope = value.get("version").is_some() && value.get("data").is_some();
        if !is_envelope {
            tracing::info!("migrating legacy progress snapshot");
            return serde_json::from_value(value)
                .map_err(|err| StorageError::Serialization(err.to_string()));
        }

        let envelope: Self = serde_json::from_value(value)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        if envelope.version != ENVELOPE_VERSION {
            tracing::warn!(version = %envelope.version, "unexpected progress envelope version");
        }
        Ok(envelope.data)
    }
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for the learner's progress snapshot.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the stored snapshot, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be read or decoded.
    async fn load_progress(&self) -> Result<Option<ProgressState>, StorageError>;

    /// Replace the stored snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_progress(
        &self,
        state: &ProgressState,
        updated: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Remove the stored snapshot. Clearing an empty store is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn clear_progress(&self) -> Result<(), StorageError>;
}

#[async_trait]
pub trait SettingsRepository: Send + Sync {
    /// Fetch persisted settings, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be read or fail validation.
    async fn get_settings(&self) -> Result<Option<PracticeSettings>, StorageError>;

    /// Persist settings (single row).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the settings cannot be stored.
    async fn save_settings(&self, settings: &PracticeSettings) -> Result<(), StorageError>;

    /// Remove persisted settings, falling back to defaults on next load.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn clear_settings(&self) -> Result<(), StorageError>;
}

/// Recent completed sessions across every operation and tier.
///
/// Adapters keep only the newest `SESSION_LOG_LIMIT` entries.
#[async_trait]
pub trait SessionLogRepository: Send + Sync {
    /// Append one finished session.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the entry cannot be stored.
    async fn append_session(&self, record: &SessionRecord) -> Result<(), StorageError>;

    /// Logged sessions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be read or decoded.
    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StorageError>;

    /// Replace the whole log, e.g. from a backup.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be stored.
    async fn replace_sessions(&self, records: &[SessionRecord]) -> Result<(), StorageError>;
}

/// Newest `SESSION_LOG_LIMIT` entries of `records`, oldest first.
#[must_use]
pub fn newest_sessions(records: &[SessionRecord]) -> &[SessionRecord] {
    &records[records.len().saturating_sub(SESSION_LOG_LIMIT)..]
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Progress is held as encoded envelope text so loads go through the same
/// decoding path as the `SQLite` adapter.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<Option<String>>>,
    settings: Arc<Mutex<Option<PracticeSettings>>>,
    sessions: Arc<Mutex<Vec<SessionRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store raw snapshot text as-is, e.g. a legacy blob.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn put_raw_progress(&self, raw: impl Into<String>) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(raw.into());
        Ok(())
    }

    /// Raw stored snapshot text.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn raw_progress(&self) -> Result<Option<String>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self) -> Result<Option<ProgressState>, StorageError> {
        self.raw_progress()?
            .map(|raw| ProgressEnvelope::decode(&raw))
            .transpose()
    }

    async fn save_progress(
        &self,
        state: &ProgressState,
        updated: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let raw = ProgressEnvelope::new(state.clone(), updated).encode()?;
        self.put_raw_progress(raw)
    }

    async fn clear_progress(&self) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

#[async_trait]
impl SettingsRepository for InMemoryRepository {
    async fn get_settings(&self) -> Result<Option<PracticeSettings>, StorageError> {
        let guard = self
            .settings
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn save_settings(&self, settings: &PracticeSettings) -> Result<(), StorageError> {
        let mut guard = self
            .settings
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(settings.clone());
        Ok(())
    }

    async fn clear_settings(&self) -> Result<(), StorageError> {
        let mut guard = self
            .settings
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = None;
        Ok(())
    }
}

#[async_trait]
impl SessionLogRepository for InMemoryRepository {
    async fn append_session(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.push(record.clone());
        let excess = guard.len().saturating_sub(SESSION_LOG_LIMIT);
        guard.drain(..excess);
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.clone())
    }

    async fn replace_sessions(&self, records: &[SessionRecord]) -> Result<(), StorageError> {
        let mut guard = self
            .sessions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = newest_sessions(records).to_vec();
        Ok(())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub settings: Arc<dyn SettingsRepository>,
    pub sessions: Arc<dyn SessionLogRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let settings: Arc<dyn SettingsRepository> = Arc::new(repo.clone());
        let sessions: Arc<dyn SessionLogRepository> = Arc::new(repo);
        Self {
            progress,
            settings,
            sessions,
        }
    }
}
