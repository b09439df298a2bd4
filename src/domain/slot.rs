use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// One bookable, fixed-length calendar interval for a client/expert pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingSlot {
    pub id: Uuid,
    pub expert_id: Uuid,
    pub client_id: Uuid,
    /// Calendar date in the expert's local timezone, as supplied by the
    /// booking backend.
    pub expert_date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i64,
    pub status: SlotStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SlotStatus {
    Pending,
    Confirmed,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Pending => "pending",
            SlotStatus::Confirmed => "confirmed",
            SlotStatus::Scheduled => "scheduled",
            SlotStatus::InProgress => "in-progress",
            SlotStatus::Completed => "completed",
            SlotStatus::Cancelled => "cancelled",
            SlotStatus::NoShow => "no-show",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SlotStatus::Pending),
            "confirmed" => Some(SlotStatus::Confirmed),
            "scheduled" => Some(SlotStatus::Scheduled),
            "in-progress" => Some(SlotStatus::InProgress),
            "completed" => Some(SlotStatus::Completed),
            "cancelled" => Some(SlotStatus::Cancelled),
            "no-show" => Some(SlotStatus::NoShow),
            _ => None,
        }
    }

    /// Statuses a slot can never leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SlotStatus::Completed | SlotStatus::Cancelled | SlotStatus::NoShow
        )
    }
}

/// Per-item validation failure for a slot entering the grouper.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot {id} has end_time <= start_time")]
    EmptyInterval { id: Uuid },
    #[error("slot {id} declares {declared} minutes but spans {actual}")]
    DurationMismatch { id: Uuid, declared: i64, actual: i64 },
    #[error("slot id {id} appears more than once in the batch")]
    DuplicateId { id: Uuid },
}

impl BookingSlot {
    pub fn new(
        expert_id: Uuid,
        client_id: Uuid,
        expert_date: NaiveDate,
        start_time: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            expert_id,
            client_id,
            expert_date,
            start_time,
            end_time: start_time + Duration::minutes(duration_minutes),
            duration_minutes,
            status: SlotStatus::Scheduled,
            created_at: now,
            updated_at: now,
        }
    }

    /// Checks the interval invariants: `start_time < end_time` and the
    /// declared duration matching the actual span.
    pub fn validate(&self) -> Result<(), SlotError> {
        if self.end_time <= self.start_time {
            return Err(SlotError::EmptyInterval { id: self.id });
        }
        let actual = (self.end_time - self.start_time).num_minutes();
        if actual != self.duration_minutes {
            return Err(SlotError::DurationMismatch {
                id: self.id,
                declared: self.duration_minutes,
                actual,
            });
        }
        Ok(())
    }

    pub fn update_status(&mut self, status: SlotStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn slot(duration: i64) -> BookingSlot {
        BookingSlot::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
            Utc.with_ymd_and_hms(2024, 3, 14, 10, 0, 0).unwrap(),
            duration,
        )
    }

    #[test]
    fn test_new_slot_satisfies_invariants() {
        let s = slot(30);
        assert_eq!(s.status, SlotStatus::Scheduled);
        assert_eq!(s.end_time - s.start_time, Duration::minutes(30));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_empty_interval_rejected() {
        let mut s = slot(30);
        s.end_time = s.start_time;
        assert_eq!(s.validate(), Err(SlotError::EmptyInterval { id: s.id }));

        s.end_time = s.start_time - Duration::minutes(5);
        assert!(matches!(s.validate(), Err(SlotError::EmptyInterval { .. })));
    }

    #[test]
    fn test_duration_mismatch_rejected() {
        let mut s = slot(30);
        s.duration_minutes = 45;
        assert_eq!(
            s.validate(),
            Err(SlotError::DurationMismatch {
                id: s.id,
                declared: 45,
                actual: 30,
            })
        );
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            SlotStatus::Pending,
            SlotStatus::Confirmed,
            SlotStatus::Scheduled,
            SlotStatus::InProgress,
            SlotStatus::Completed,
            SlotStatus::Cancelled,
            SlotStatus::NoShow,
        ] {
            assert_eq!(SlotStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(SlotStatus::parse("unknown"), None);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(SlotStatus::Completed.is_terminal());
        assert!(SlotStatus::Cancelled.is_terminal());
        assert!(SlotStatus::NoShow.is_terminal());
        assert!(!SlotStatus::Scheduled.is_terminal());
        assert!(!SlotStatus::InProgress.is_terminal());
    }
}
