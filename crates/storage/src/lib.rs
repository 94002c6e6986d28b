#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;

pub use repository::{
    InMemoryRepository, ProgressRepository, SESSION_LOG_LIMIT, SessionLogRepository,
    SettingsRepository, Storage, StorageError,
};
