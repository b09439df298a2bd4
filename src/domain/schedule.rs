use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::live_call::LiveCallRecord;
use crate::domain::session::CombinedSession;
use crate::domain::slot::BookingSlot;
use crate::domain::status::{reconcile, DisplayStatus, ReconcileError};

/// The dashboard's three list views, by calendar date relative to "today"
/// in the expert's timezone.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ScheduleTab {
    Today,
    Upcoming,
    History,
}

impl ScheduleTab {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleTab::Today => "today",
            ScheduleTab::Upcoming => "upcoming",
            ScheduleTab::History => "history",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "today" => Some(ScheduleTab::Today),
            "upcoming" => Some(ScheduleTab::Upcoming),
            "history" => Some(ScheduleTab::History),
            _ => None,
        }
    }

    pub fn contains(&self, date: NaiveDate, today: NaiveDate) -> bool {
        match self {
            ScheduleTab::Today => date == today,
            ScheduleTab::Upcoming => date > today,
            ScheduleTab::History => date < today,
        }
    }
}

/// One row of the dashboard: a combined session plus its reconciled status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionView {
    pub session: CombinedSession,
    pub status: DisplayStatus,
    pub can_start: bool,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// A session's primary slot is missing from the snapshot. The caller
    /// assembled a torn snapshot; re-fetch and try again.
    #[error("primary slot {id} missing from snapshot")]
    MissingSlot { id: Uuid },
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Assembles the dashboard view models from an already-fetched snapshot.
///
/// Status is reconciled over the primary slot's records only; member
/// statuses are not separately surfaced. Pure and idempotent, so UI
/// re-renders may call it repeatedly over the same snapshot.
pub fn build_views(
    sessions: &[CombinedSession],
    slots_by_id: &HashMap<Uuid, BookingSlot>,
    calls_by_primary: &HashMap<Uuid, LiveCallRecord>,
    refunded_primaries: &HashSet<Uuid>,
    now: DateTime<Utc>,
) -> Result<Vec<SessionView>, ScheduleError> {
    let mut views = Vec::with_capacity(sessions.len());
    for session in sessions {
        let primary = slots_by_id
            .get(&session.primary_slot_id)
            .ok_or(ScheduleError::MissingSlot {
                id: session.primary_slot_id,
            })?;
        let call = calls_by_primary.get(&session.primary_slot_id);
        let has_refund = refunded_primaries.contains(&session.primary_slot_id);
        let resolution = reconcile(primary, call, has_refund, now)?;
        views.push(SessionView {
            session: session.clone(),
            status: resolution.status,
            can_start: resolution.can_start,
        });
    }
    Ok(views)
}
