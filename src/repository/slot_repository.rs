use crate::domain::schedule::ScheduleTab;
use crate::domain::slot::{BookingSlot, SlotStatus};
use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct SlotRepository {
    pool: Arc<SqlitePool>,
}

impl SlotRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, slot: &BookingSlot) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_slots (
                id, expert_id, client_id, expert_date, start_time, end_time,
                duration_minutes, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(slot.id.to_string())
        .bind(slot.expert_id.to_string())
        .bind(slot.client_id.to_string())
        .bind(slot.expert_date.to_string())
        .bind(slot.start_time.to_rfc3339())
        .bind(slot.end_time.to_rfc3339())
        .bind(slot.duration_minutes)
        .bind(slot.status.as_str())
        .bind(slot.created_at.to_rfc3339())
        .bind(slot.updated_at.to_rfc3339())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<BookingSlot>> {
        let row = sqlx::query(
            r#"
            SELECT id, expert_id, client_id, expert_date, start_time, end_time,
                   duration_minutes, status, created_at, updated_at
            FROM booking_slots
            WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(|r| row_to_slot(&r)).transpose()
    }

    pub async fn update_status(&self, id: Uuid, status: SlotStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE booking_slots SET status = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All of an expert's slots on the tab's side of `today`, sorted by
    /// start time.
    pub async fn list_for_expert(
        &self,
        expert_id: Uuid,
        tab: ScheduleTab,
        today: NaiveDate,
    ) -> Result<Vec<BookingSlot>> {
        let date_filter = match tab {
            ScheduleTab::Today => "expert_date = ?",
            ScheduleTab::Upcoming => "expert_date > ?",
            ScheduleTab::History => "expert_date < ?",
        };
        let query = format!(
            r#"
            SELECT id, expert_id, client_id, expert_date, start_time, end_time,
                   duration_minutes, status, created_at, updated_at
            FROM booking_slots
            WHERE expert_id = ? AND {}
            ORDER BY start_time ASC
            "#,
            date_filter
        );

        let rows = sqlx::query(&query)
            .bind(expert_id.to_string())
            .bind(today.to_string())
            .fetch_all(self.pool.as_ref())
            .await?;

        rows.iter().map(row_to_slot).collect()
    }
}

fn row_to_slot(row: &SqliteRow) -> Result<BookingSlot> {
    let id: String = row.get("id");
    let status_str: String = row.get("status");
    let status = SlotStatus::parse(&status_str)
        .ok_or_else(|| anyhow!("unknown slot status '{}' for slot {}", status_str, id))?;
    let expert_date: String = row.get("expert_date");

    Ok(BookingSlot {
        id: Uuid::parse_str(&id)?,
        expert_id: Uuid::parse_str(row.get("expert_id"))?,
        client_id: Uuid::parse_str(row.get("client_id"))?,
        expert_date: expert_date.parse::<NaiveDate>()?,
        start_time: parse_timestamp(row.get("start_time"))?,
        end_time: parse_timestamp(row.get("end_time"))?,
        duration_minutes: row.get("duration_minutes"),
        status,
        created_at: parse_timestamp(row.get("created_at"))?,
        updated_at: parse_timestamp(row.get("updated_at"))?,
    })
}

pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
