use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::live_call::{CallStatus, LiveCallRecord};
use crate::domain::slot::{BookingSlot, SlotStatus};

/// An `active` call record older than this is treated as stale: the
/// expert's browser probably died without anyone closing the record.
pub const STALE_CALL_WINDOW_MINUTES: i64 = 30;

/// The single status shown to users, reconciled from the slot's lifecycle
/// status, its latest call record, and refund evidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DisplayStatus {
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    /// A cancelled-but-not-refunded slot whose time has not passed: the
    /// interval was freed by a disconnect and can be started again.
    Available,
}

impl DisplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStatus::Scheduled => "scheduled",
            DisplayStatus::InProgress => "in-progress",
            DisplayStatus::Completed => "completed",
            DisplayStatus::Cancelled => "cancelled",
            DisplayStatus::NoShow => "no-show",
            DisplayStatus::Available => "available",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusResolution {
    pub status: DisplayStatus,
    pub can_start: bool,
}

impl StatusResolution {
    fn terminal(status: DisplayStatus) -> Self {
        Self {
            status,
            can_start: false,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("call record for slot {call_slot_id} passed while reconciling slot {slot_id}")]
    CallSlotMismatch { slot_id: Uuid, call_slot_id: Uuid },
}

/// Derives the display status and start permission for one slot from three
/// independent, possibly stale signals.
///
/// The decision procedure is priority ordered; the first matching rule
/// wins. Elapsed wall-clock time never promotes a session to completed on
/// its own: a stale call record falls back to scheduled, because only an
/// explicit terminal call status or a refund may close a session.
///
/// `live_call` must be the most recently created record for this slot, and
/// `has_refund` the precomputed ledger membership test for the slot id and
/// its call id. Pure function; no I/O, never panics on well-formed input.
pub fn reconcile(
    slot: &BookingSlot,
    live_call: Option<&LiveCallRecord>,
    has_refund: bool,
    now: DateTime<Utc>,
) -> Result<StatusResolution, ReconcileError> {
    if let Some(call) = live_call {
        if call.slot_id != slot.id {
            return Err(ReconcileError::CallSlotMismatch {
                slot_id: slot.id,
                call_slot_id: call.slot_id,
            });
        }
    }

    // Lifecycle terminals first; these are never overridden.
    match slot.status {
        SlotStatus::Completed => {
            return Ok(StatusResolution::terminal(DisplayStatus::Completed));
        }
        SlotStatus::NoShow => {
            return Ok(StatusResolution::terminal(DisplayStatus::NoShow));
        }
        SlotStatus::Cancelled => {
            // Freed by a disconnect but not yet refunded: the interval is
            // still bookable until money goes back.
            if !has_refund && now < slot.end_time {
                return Ok(StatusResolution {
                    status: DisplayStatus::Available,
                    can_start: true,
                });
            }
            return Ok(StatusResolution::terminal(DisplayStatus::Cancelled));
        }
        _ => {}
    }

    let resolution = resolve_from_call(slot, live_call, now);

    // Money back wins over an active-looking call record.
    if has_refund {
        let call_active = live_call.is_some_and(|c| c.status == CallStatus::Active);
        if resolution.status == DisplayStatus::InProgress || call_active {
            return Ok(StatusResolution::terminal(DisplayStatus::Cancelled));
        }
    }

    Ok(resolution)
}

fn resolve_from_call(
    slot: &BookingSlot,
    live_call: Option<&LiveCallRecord>,
    now: DateTime<Utc>,
) -> StatusResolution {
    // A call record only counts once the expert actually joined.
    if let Some(call) = live_call.filter(|c| c.started_at.is_some()) {
        let fresh = now - call.created_at <= Duration::minutes(STALE_CALL_WINDOW_MINUTES);
        match call.status {
            CallStatus::Active if fresh => {
                return StatusResolution::terminal(DisplayStatus::InProgress);
            }
            CallStatus::Completed | CallStatus::Ended => {
                return StatusResolution::terminal(DisplayStatus::Completed);
            }
            // Stale active record: treat as if nothing happened rather
            // than fabricating a completed outcome from elapsed time.
            _ => {
                return StatusResolution {
                    status: DisplayStatus::Scheduled,
                    can_start: now >= slot.start_time,
                };
            }
        }
    }

    let startable = matches!(
        slot.status,
        SlotStatus::Scheduled | SlotStatus::Pending | SlotStatus::Confirmed
    );
    if now >= slot.end_time && startable {
        return StatusResolution::terminal(DisplayStatus::NoShow);
    }

    StatusResolution {
        status: DisplayStatus::Scheduled,
        can_start: now >= slot.start_time,
    }
}
