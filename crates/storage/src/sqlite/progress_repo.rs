use async_trait::async_trait;
use chrono::{DateTime, Utc};
use practice_core::model::ProgressState;
use sqlx::Row;

use crate::repository::{ENVELOPE_VERSION, ProgressEnvelope, ProgressRepository, StorageError};

use super::SqliteRepository;
use super::mapping::{conn, ser};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self) -> Result<Option<ProgressState>, StorageError> {
        let row = sqlx::query("SELECT payload FROM progress_snapshots WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String = row.try_get("payload").map_err(ser)?;
        ProgressEnvelope::decode(&payload).map(Some)
    }

    async fn save_progress(
        &self,
        state: &ProgressState,
        updated: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let payload = ProgressEnvelope::new(state.clone(), updated).encode()?;

        sqlx::query(
            r"
            INSERT INTO progress_snapshots (id, version, payload, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                version = excluded.version,
                payload = excluded.payload,
                updated_at = excluded.updated_at
            ",
        )
        .bind(1_i64)
        .bind(ENVELOPE_VERSION)
        .bind(payload)
        .bind(updated)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn clear_progress(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM progress_snapshots WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
