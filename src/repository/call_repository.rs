use crate::domain::live_call::{CallKind, CallStatus, LiveCallRecord};
use crate::repository::slot_repository::parse_timestamp;
use anyhow::{anyhow, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct CallRepository {
    pool: Arc<SqlitePool>,
}

impl CallRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, call: &LiveCallRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO live_calls (
                id, slot_id, kind, status, channel, started_at, ended_at,
                attended_minutes, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(call.id.to_string())
        .bind(call.slot_id.to_string())
        .bind(call.kind.as_str())
        .bind(call.status.as_str())
        .bind(&call.channel)
        .bind(call.started_at.map(|t| t.to_rfc3339()))
        .bind(call.ended_at.map(|t| t.to_rfc3339()))
        .bind(call.attended_minutes)
        .bind(call.created_at.to_rfc3339())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    pub async fn update(&self, call: &LiveCallRecord) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE live_calls SET
                status = ?, started_at = ?, ended_at = ?, attended_minutes = ?
            WHERE id = ?
            "#,
        )
        .bind(call.status.as_str())
        .bind(call.started_at.map(|t| t.to_rfc3339()))
        .bind(call.ended_at.map(|t| t.to_rfc3339()))
        .bind(call.attended_minutes)
        .bind(call.id.to_string())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<LiveCallRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, slot_id, kind, status, channel, started_at, ended_at,
                   attended_minutes, created_at
            FROM live_calls
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|r| row_to_call(&r)).transpose()
    }

    /// The one meaningful record for a slot: most recently created wins,
    /// id as the tiebreak.
    pub async fn latest_for_slot(&self, slot_id: Uuid) -> Result<Option<LiveCallRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, slot_id, kind, status, channel, started_at, ended_at,
                   attended_minutes, created_at
            FROM live_calls
            WHERE slot_id = ?
            ORDER BY created_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(slot_id.to_string())
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|r| row_to_call(&r)).transpose()
    }
}

fn row_to_call(row: &SqliteRow) -> Result<LiveCallRecord> {
    let id: String = row.get("id");
    let kind_str: String = row.get("kind");
    let status_str: String = row.get("status");

    Ok(LiveCallRecord {
        id: Uuid::parse_str(&id)?,
        slot_id: Uuid::parse_str(row.get("slot_id"))?,
        kind: CallKind::parse(&kind_str)
            .ok_or_else(|| anyhow!("unknown call kind '{}' for call {}", kind_str, id))?,
        status: CallStatus::parse(&status_str)
            .ok_or_else(|| anyhow!("unknown call status '{}' for call {}", status_str, id))?,
        channel: row.get("channel"),
        started_at: row
            .get::<Option<String>, _>("started_at")
            .map(|s| parse_timestamp(&s))
            .transpose()?,
        ended_at: row
            .get::<Option<String>, _>("ended_at")
            .map(|s| parse_timestamp(&s))
            .transpose()?,
        attended_minutes: row.get("attended_minutes"),
        created_at: parse_timestamp(row.get("created_at"))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::database::init_test_database;
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_create_and_get_round_trip() {
        let pool = init_test_database().await.unwrap();
        let repo = CallRepository::new(Arc::new(pool));

        let call = LiveCallRecord::new(Uuid::new_v4(), CallKind::Video, "session-a".into());
        repo.create(&call).await.unwrap();

        let loaded = repo.get(call.id).await.unwrap().unwrap();
        assert_eq!(loaded.slot_id, call.slot_id);
        assert_eq!(loaded.kind, CallKind::Video);
        assert_eq!(loaded.status, CallStatus::Pending);
        assert_eq!(loaded.channel, "session-a");
        assert!(loaded.started_at.is_none());
    }

    #[tokio::test]
    async fn test_update_persists_transitions() {
        let pool = init_test_database().await.unwrap();
        let repo = CallRepository::new(Arc::new(pool));

        let mut call = LiveCallRecord::new(Uuid::new_v4(), CallKind::Audio, "session-b".into());
        repo.create(&call).await.unwrap();

        let joined = Utc::now();
        call.mark_joined(joined);
        repo.update(&call).await.unwrap();
        call.finish(joined + Duration::minutes(25));
        repo.update(&call).await.unwrap();

        let loaded = repo.get(call.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, CallStatus::Completed);
        assert!(loaded.started_at.is_some());
        assert!(loaded.ended_at.is_some());
        assert_eq!(loaded.attended_minutes, Some(25));
    }

    #[tokio::test]
    async fn test_latest_for_slot_prefers_most_recent() {
        let pool = init_test_database().await.unwrap();
        let repo = CallRepository::new(Arc::new(pool));

        let slot_id = Uuid::new_v4();
        let mut first = LiveCallRecord::new(slot_id, CallKind::Video, "session-c".into());
        first.created_at = Utc::now() - Duration::minutes(10);
        let second = LiveCallRecord::new(slot_id, CallKind::Video, "session-c".into());
        repo.create(&first).await.unwrap();
        repo.create(&second).await.unwrap();

        let latest = repo.latest_for_slot(slot_id).await.unwrap().unwrap();
        assert_eq!(latest.id, second.id);
    }

    #[tokio::test]
    async fn test_latest_for_slot_none_when_no_calls() {
        let pool = init_test_database().await.unwrap();
        let repo = CallRepository::new(Arc::new(pool));
        assert!(repo.latest_for_slot(Uuid::new_v4()).await.unwrap().is_none());
    }
}
