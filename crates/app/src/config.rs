//! Configuration for the drill binary.
//!
//! Database URL priority: `--db` flag > `practice.toml` > `PRACTICE_DB_URL`
//! (also read from `.env`) > built-in default. The `[practice]` table
//! overrides individual settings on top of whatever storage holds.

use practice_core::model::{PracticeSettings, SettingsError};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = "practice.toml";
pub const DB_URL_ENV: &str = "PRACTICE_DB_URL";
pub const DEFAULT_DB_URL: &str = "sqlite://practice.sqlite3";

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    storage: Option<StorageSection>,
    #[serde(default)]
    practice: PracticeOverrides,
}

#[derive(Debug, Default, Deserialize)]
struct StorageSection {
    database_url: Option<String>,
}

/// Optional per-field settings overrides.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct PracticeOverrides {
    pub questions_per_game: Option<u32>,
    pub allow_negative_results: Option<bool>,
    pub max_retries: Option<u32>,
    pub distractor_count: Option<u32>,
    pub distractor_attempts: Option<u32>,
}

impl PracticeOverrides {
    /// Layer the overrides on `base`.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the combined values are out of range.
    pub fn apply(&self, base: &PracticeSettings) -> Result<PracticeSettings, SettingsError> {
        PracticeSettings::new(
            self.questions_per_game.unwrap_or(base.questions_per_game()),
            self.allow_negative_results
                .unwrap_or(base.allow_negative_results()),
            self.max_retries.unwrap_or(base.max_retries()),
            self.distractor_count.unwrap_or(base.distractor_count()),
            self.distractor_attempts
                .unwrap_or(base.distractor_attempts()),
        )
    }
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub practice: PracticeOverrides,
}

/// Load `.env`, then `practice.toml` from the working directory.
pub fn load() -> AppConfig {
    let _ = dotenvy::dotenv();
    let file = read_file(Path::new(CONFIG_FILE));
    resolve(file, std::env::var(DB_URL_ENV).ok())
}

fn read_file(path: &Path) -> Option<FileConfig> {
    let contents = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<FileConfig>(&contents) {
        Ok(config) => Some(config),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable config file");
            None
        }
    }
}

fn resolve(file: Option<FileConfig>, env_url: Option<String>) -> AppConfig {
    let file = file.unwrap_or_default();

    let database_url = if let Some(url) = file.storage.and_then(|s| s.database_url) {
        tracing::info!(%url, "using database from {CONFIG_FILE}");
        url
    } else if let Some(url) = env_url {
        tracing::info!(%url, "using database from {DB_URL_ENV}");
        url
    } else {
        tracing::info!(url = DEFAULT_DB_URL, "using default database");
        DEFAULT_DB_URL.to_owned()
    };

    AppConfig {
        database_url,
        practice: file.practice,
    }
}
