use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::live_call::{CallKind, CallStatus, LiveCallRecord};
use crate::domain::schedule::{build_views, ScheduleError, ScheduleTab, SessionView};
use crate::domain::session::{group_slots, RejectedSlot};
use crate::domain::slot::{BookingSlot, SlotStatus};
use crate::domain::status::{reconcile, DisplayStatus, ReconcileError};
use crate::repository::Repository;
use crate::services::call_gateway::{CallGateway, CallTicket};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("slot {0} not found")]
    SlotNotFound(Uuid),
    #[error("call {0} not found")]
    CallNotFound(Uuid),
    #[error("a start for slot {0} is already in flight")]
    AlreadyStarting(Uuid),
    #[error("slot cannot be started while {status:?}")]
    StartNotPermitted { status: DisplayStatus },
    #[error("no joined call to complete for slot {0}")]
    NotJoined(Uuid),
    #[error("call {0} was already joined")]
    AlreadyJoined(Uuid),
    #[error("call gateway failure: {0}")]
    Gateway(String),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// A freshly assembled dashboard state. Always rebuilt from a new fetch;
/// never patched in place after a write.
#[derive(Debug, Clone)]
pub struct ScheduleSnapshot {
    pub views: Vec<SessionView>,
    pub rejected: Vec<RejectedSlot>,
}

#[derive(Debug, Clone)]
pub struct StartedSession {
    pub call: LiveCallRecord,
    pub ticket: CallTicket,
}

/// Orchestrates the expert dashboard: schedule assembly, the session
/// start/join/complete/cancel actions, and the no-show sweep. All writes
/// target a combined session's primary slot.
pub struct SessionManager {
    repository: Arc<Repository>,
    gateway: Arc<dyn CallGateway>,
    /// Primary slot ids with a start currently in flight, so a double
    /// click cannot mint two call records.
    starting: Mutex<HashSet<Uuid>>,
}

impl SessionManager {
    pub fn new(repository: Arc<Repository>, gateway: Arc<dyn CallGateway>) -> Self {
        Self {
            repository,
            gateway,
            starting: Mutex::new(HashSet::new()),
        }
    }

    /// Fetches an expert's slots for one tab, groups them into combined
    /// sessions, and reconciles each against its call and refund side-data.
    pub async fn schedule(
        &self,
        expert_id: Uuid,
        tab: ScheduleTab,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ScheduleSnapshot, SessionError> {
        let slots = self
            .repository
            .slots
            .list_for_expert(expert_id, tab, today)
            .await?;
        debug!("Fetched {} slots for expert {} ({})", slots.len(), expert_id, tab.as_str());

        let slots_by_id: HashMap<Uuid, BookingSlot> =
            slots.iter().map(|s| (s.id, s.clone())).collect();
        let outcome = group_slots(slots);
        for rejected in &outcome.rejected {
            warn!(
                "Excluding malformed slot {} from schedule: {}",
                rejected.slot.id, rejected.reason
            );
        }

        let mut calls_by_primary = HashMap::new();
        let mut refunded_primaries = HashSet::new();
        for session in &outcome.sessions {
            let primary = session.primary_slot_id;
            let call = self.repository.calls.latest_for_slot(primary).await?;
            let has_refund = self
                .repository
                .refunds
                .has_credit_for(primary, call.as_ref().map(|c| c.id))
                .await?;
            if let Some(call) = call {
                calls_by_primary.insert(primary, call);
            }
            if has_refund {
                refunded_primaries.insert(primary);
            }
        }

        let views = build_views(
            &outcome.sessions,
            &slots_by_id,
            &calls_by_primary,
            &refunded_primaries,
            now,
        )?;

        Ok(ScheduleSnapshot {
            views,
            rejected: outcome.rejected,
        })
    }

    /// Persists a new scheduled slot. The booking wizard and payment flow
    /// live with the hosted backend; this is the resulting row.
    pub async fn book(
        &self,
        expert_id: Uuid,
        client_id: Uuid,
        expert_date: NaiveDate,
        start_time: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Result<BookingSlot, SessionError> {
        let slot = BookingSlot::new(expert_id, client_id, expert_date, start_time, duration_minutes);
        self.repository.slots.create(&slot).await?;
        info!("Booked slot {} for client {}", slot.id, client_id);
        Ok(slot)
    }

    /// Starts a session on its primary slot: re-reconciles against a fresh
    /// snapshot, mints a channel token, and records the pending call.
    pub async fn start_session(
        &self,
        primary_slot_id: Uuid,
        kind: CallKind,
    ) -> Result<StartedSession, SessionError> {
        {
            let mut starting = self.starting.lock().await;
            if !starting.insert(primary_slot_id) {
                return Err(SessionError::AlreadyStarting(primary_slot_id));
            }
        }

        let result = self.start_session_inner(primary_slot_id, kind).await;

        self.starting.lock().await.remove(&primary_slot_id);
        result
    }

    async fn start_session_inner(
        &self,
        primary_slot_id: Uuid,
        kind: CallKind,
    ) -> Result<StartedSession, SessionError> {
        let slot = self
            .repository
            .slots
            .get(primary_slot_id)
            .await?
            .ok_or(SessionError::SlotNotFound(primary_slot_id))?;
        let latest_call = self.repository.calls.latest_for_slot(slot.id).await?;
        let has_refund = self
            .repository
            .refunds
            .has_credit_for(slot.id, latest_call.as_ref().map(|c| c.id))
            .await?;

        let resolution = reconcile(&slot, latest_call.as_ref(), has_refund, Utc::now())?;
        if !resolution.can_start {
            return Err(SessionError::StartNotPermitted {
                status: resolution.status,
            });
        }

        let channel = format!("session-{}", primary_slot_id);
        let ticket = self
            .gateway
            .issue_token(&channel, slot.expert_id, kind)
            .await
            .map_err(|e| SessionError::Gateway(e.to_string()))?;

        let call = LiveCallRecord::new(slot.id, kind, channel);
        self.repository.calls.create(&call).await?;
        info!("Started session for slot {} on channel {}", slot.id, call.channel);

        Ok(StartedSession { call, ticket })
    }

    /// The call SDK reported the expert connected: the call goes active and
    /// the slot goes in-progress. Only a pending call can be joined; a
    /// repeated callback must not reset `started_at`.
    pub async fn confirm_join(
        &self,
        call_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<LiveCallRecord, SessionError> {
        let mut call = self
            .repository
            .calls
            .get(call_id)
            .await?
            .ok_or(SessionError::CallNotFound(call_id))?;
        if call.status != CallStatus::Pending {
            return Err(SessionError::AlreadyJoined(call_id));
        }
        call.mark_joined(now);
        self.repository.calls.update(&call).await?;
        let updated = self
            .repository
            .slots
            .update_status(call.slot_id, SlotStatus::InProgress)
            .await?;
        if !updated {
            return Err(SessionError::SlotNotFound(call.slot_id));
        }
        Ok(call)
    }

    /// Closes out a session whose call actually happened.
    pub async fn complete_session(
        &self,
        primary_slot_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<LiveCallRecord, SessionError> {
        let mut call = self
            .repository
            .calls
            .latest_for_slot(primary_slot_id)
            .await?
            .ok_or(SessionError::NotJoined(primary_slot_id))?;
        if call.started_at.is_none() {
            return Err(SessionError::NotJoined(primary_slot_id));
        }
        call.finish(now);
        self.repository.calls.update(&call).await?;
        let updated = self
            .repository
            .slots
            .update_status(primary_slot_id, SlotStatus::Completed)
            .await?;
        if !updated {
            return Err(SessionError::SlotNotFound(primary_slot_id));
        }
        info!(
            "Completed session for slot {} ({} minutes attended)",
            primary_slot_id,
            call.attended_minutes.unwrap_or(0)
        );
        Ok(call)
    }

    /// Frees a slot. It will display as available until a refund lands,
    /// at which point the ledger makes the cancellation terminal.
    pub async fn cancel_session(&self, primary_slot_id: Uuid) -> Result<(), SessionError> {
        let updated = self
            .repository
            .slots
            .update_status(primary_slot_id, SlotStatus::Cancelled)
            .await?;
        if !updated {
            return Err(SessionError::SlotNotFound(primary_slot_id));
        }
        info!("Cancelled session for slot {}", primary_slot_id);
        Ok(())
    }

    /// Persists the no-show outcome for every elapsed slot the reconciler
    /// derives it for. Refund issuance stays with the payment provider.
    pub async fn sweep_no_shows(
        &self,
        expert_id: Uuid,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<usize, SessionError> {
        let mut slots = self
            .repository
            .slots
            .list_for_expert(expert_id, ScheduleTab::Today, today)
            .await?;
        slots.extend(
            self.repository
                .slots
                .list_for_expert(expert_id, ScheduleTab::History, today)
                .await?,
        );

        let mut swept = 0;
        for slot in slots {
            if slot.status.is_terminal() {
                continue;
            }
            let call = self.repository.calls.latest_for_slot(slot.id).await?;
            let has_refund = self
                .repository
                .refunds
                .has_credit_for(slot.id, call.as_ref().map(|c| c.id))
                .await?;
            let resolution = reconcile(&slot, call.as_ref(), has_refund, now)?;
            if resolution.status == DisplayStatus::NoShow {
                self.repository
                    .slots
                    .update_status(slot.id, SlotStatus::NoShow)
                    .await?;
                swept += 1;
            }
        }

        if swept > 0 {
            info!("Marked {} slots as no-show for expert {}", swept, expert_id);
        }
        Ok(swept)
    }
}
