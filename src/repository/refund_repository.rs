use crate::domain::refund::{LedgerDirection, RefundReason, RefundRecord, ReferenceKind};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Clone)]
pub struct RefundRepository {
    pool: Arc<SqlitePool>,
}

impl RefundRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }

    pub async fn create(&self, refund: &RefundRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO refunds (
                id, reference_id, reference_kind, reason, direction, created_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(refund.id.to_string())
        .bind(refund.reference_id.to_string())
        .bind(refund.reference_kind.as_str())
        .bind(refund.reason.as_str())
        .bind(refund.direction.as_str())
        .bind(refund.created_at.to_rfc3339())
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    /// Whether any credit row references the slot or, if given, its call.
    pub async fn has_credit_for(&self, slot_id: Uuid, call_id: Option<Uuid>) -> Result<bool> {
        let count: (i64,) = match call_id {
            Some(call_id) => {
                sqlx::query_as(
                    "SELECT COUNT(*) FROM refunds WHERE direction = 'credit' AND reference_id IN (?, ?)",
                )
                .bind(slot_id.to_string())
                .bind(call_id.to_string())
                .fetch_one(self.pool.as_ref())
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT COUNT(*) FROM refunds WHERE direction = 'credit' AND reference_id = ?",
                )
                .bind(slot_id.to_string())
                .fetch_one(self.pool.as_ref())
                .await?
            }
        };

        Ok(count.0 > 0)
    }

    pub async fn list_for_reference(&self, reference_id: Uuid) -> Result<Vec<RefundRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT id, reference_id, reference_kind, reason, direction, created_at
            FROM refunds
            WHERE reference_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(reference_id.to_string())
        .fetch_all(self.pool.as_ref())
        .await?;

        let mut refunds = Vec::with_capacity(rows.len());
        for row in rows {
            let kind_str: String = row.get("reference_kind");
            let direction_str: String = row.get("direction");
            refunds.push(RefundRecord {
                id: Uuid::parse_str(row.get("id"))?,
                reference_id: Uuid::parse_str(row.get("reference_id"))?,
                reference_kind: ReferenceKind::parse(&kind_str)
                    .ok_or_else(|| anyhow!("unknown reference kind '{}'", kind_str))?,
                reason: RefundReason::parse(row.get("reason")),
                direction: LedgerDirection::parse(&direction_str)
                    .ok_or_else(|| anyhow!("unknown ledger direction '{}'", direction_str))?,
                created_at: DateTime::parse_from_rfc3339(row.get("created_at"))?
                    .with_timezone(&Utc),
            });
        }

        Ok(refunds)
    }
}
