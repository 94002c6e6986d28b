use async_trait::async_trait;
use practice_core::model::SessionRecord;
use sqlx::Row;

use crate::repository::{SESSION_LOG_LIMIT, SessionLogRepository, StorageError, newest_sessions};

use super::SqliteRepository;
use super::mapping::{conn, ser};

fn limit_i64() -> Result<i64, StorageError> {
    i64::try_from(SESSION_LOG_LIMIT).map_err(ser)
}

#[async_trait]
impl SessionLogRepository for SqliteRepository {
    async fn append_session(&self, record: &SessionRecord) -> Result<(), StorageError> {
        let payload = serde_json::to_string(record).map_err(ser)?;
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("INSERT INTO session_log (recorded_at, payload) VALUES (?1, ?2)")
            .bind(record.recorded_at)
            .bind(payload)
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        sqlx::query(
            r"
            DELETE FROM session_log
            WHERE id NOT IN (
                SELECT id FROM session_log ORDER BY id DESC LIMIT ?1
            )
            ",
        )
        .bind(limit_i64()?)
        .execute(&mut *tx)
        .await
        .map_err(conn)?;

        tx.commit().await.map_err(conn)
    }

    async fn list_sessions(&self) -> Result<Vec<SessionRecord>, StorageError> {
        let rows = sqlx::query("SELECT payload FROM session_log ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter()
            .map(|row| {
                let payload: String = row.try_get("payload").map_err(ser)?;
                serde_json::from_str(&payload).map_err(ser)
            })
            .collect()
    }

    async fn replace_sessions(&self, records: &[SessionRecord]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        sqlx::query("DELETE FROM session_log")
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        for record in newest_sessions(records) {
            let payload = serde_json::to_string(record).map_err(ser)?;
            sqlx::query("INSERT INTO session_log (recorded_at, payload) VALUES (?1, ?2)")
                .bind(record.recorded_at)
                .bind(payload)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }

        tx.commit().await.map_err(conn)
    }
}
