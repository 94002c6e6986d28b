use async_trait::async_trait;
use sqlx::Row;

use crate::repository::{SettingsRepository, StorageError};
use practice_core::model::PracticeSettings;

use super::SqliteRepository;
use super::mapping::{conn, i64_to_u32, ser};

#[async_trait]
impl SettingsRepository for SqliteRepository {
    async fn get_settings(&self) -> Result<Option<PracticeSettings>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT
                questions_per_game,
                allow_negative_results,
                max_retries,
                distractor_count,
                distractor_attempts
            FROM practice_settings
            WHERE id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let questions_per_game: i64 = row.try_get("questions_per_game").map_err(ser)?;
        let allow_negative_results: bool = row.try_get("allow_negative_results").map_err(ser)?;
        let max_retries: i64 = row.try_get("max_retries").map_err(ser)?;
        let distractor_count: i64 = row.try_get("distractor_count").map_err(ser)?;
        let distractor_attempts: i64 = row.try_get("distractor_attempts").map_err(ser)?;

        PracticeSettings::new(
            i64_to_u32("questions_per_game", questions_per_game)?,
            allow_negative_results,
            i64_to_u32("max_retries", max_retries)?,
            i64_to_u32("distractor_count", distractor_count)?,
            i64_to_u32("distractor_attempts", distractor_attempts)?,
        )
        .map(Some)
        .map_err(ser)
    }

    async fn save_settings(&self, settings: &PracticeSettings) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO practice_settings (
                id,
                questions_per_game,
                allow_negative_results,
                max_retries,
                distractor_count,
                distractor_attempts
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                questions_per_game = excluded.questions_per_game,
                allow_negative_results = excluded.allow_negative_results,
                max_retries = excluded.max_retries,
                distractor_count = excluded.distractor_count,
                distractor_attempts = excluded.distractor_attempts
            ",
        )
        .bind(1_i64)
        .bind(i64::from(settings.questions_per_game()))
        .bind(settings.allow_negative_results())
        .bind(i64::from(settings.max_retries()))
        .bind(i64::from(settings.distractor_count()))
        .bind(i64::from(settings.distractor_attempts()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn clear_settings(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM practice_settings WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
