use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One attempt to actually connect a booked slot. A slot can accumulate
/// several of these (retries after a crashed browser); the most recently
/// created one is the meaningful record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LiveCallRecord {
    pub id: Uuid,
    pub slot_id: Uuid,
    pub kind: CallKind,
    pub status: CallStatus,
    pub channel: String,
    /// Set when the expert actually joined the channel.
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub attended_minutes: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CallKind {
    Audio,
    Video,
}

impl CallKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallKind::Audio => "audio",
            CallKind::Video => "video",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "audio" => Some(CallKind::Audio),
            "video" => Some(CallKind::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CallStatus {
    Pending,
    Active,
    Ended,
    Completed,
}

impl CallStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallStatus::Pending => "pending",
            CallStatus::Active => "active",
            CallStatus::Ended => "ended",
            CallStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(CallStatus::Pending),
            "active" => Some(CallStatus::Active),
            "ended" => Some(CallStatus::Ended),
            "completed" => Some(CallStatus::Completed),
            _ => None,
        }
    }
}

impl LiveCallRecord {
    pub fn new(slot_id: Uuid, kind: CallKind, channel: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            slot_id,
            kind,
            status: CallStatus::Pending,
            channel,
            started_at: None,
            ended_at: None,
            attended_minutes: None,
            created_at: Utc::now(),
        }
    }

    /// The expert connected to the channel.
    pub fn mark_joined(&mut self, now: DateTime<Utc>) {
        self.status = CallStatus::Active;
        self.started_at = Some(now);
    }

    /// The call wrapped up normally.
    pub fn finish(&mut self, now: DateTime<Utc>) {
        self.status = CallStatus::Completed;
        self.ended_at = Some(now);
        if let Some(started) = self.started_at {
            self.attended_minutes = Some((now - started).num_minutes());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_new_call_is_pending() {
        let call = LiveCallRecord::new(Uuid::new_v4(), CallKind::Video, "session-x".into());
        assert_eq!(call.status, CallStatus::Pending);
        assert!(call.started_at.is_none());
        assert!(call.ended_at.is_none());
        assert!(call.attended_minutes.is_none());
    }

    #[test]
    fn test_join_then_finish_records_attendance() {
        let mut call = LiveCallRecord::new(Uuid::new_v4(), CallKind::Audio, "session-x".into());
        let joined = Utc::now();
        call.mark_joined(joined);
        assert_eq!(call.status, CallStatus::Active);
        assert_eq!(call.started_at, Some(joined));

        let ended = joined + Duration::minutes(42);
        call.finish(ended);
        assert_eq!(call.status, CallStatus::Completed);
        assert_eq!(call.ended_at, Some(ended));
        assert_eq!(call.attended_minutes, Some(42));
    }

    #[test]
    fn test_finish_without_join_leaves_attendance_empty() {
        let mut call = LiveCallRecord::new(Uuid::new_v4(), CallKind::Audio, "session-x".into());
        call.finish(Utc::now());
        assert_eq!(call.status, CallStatus::Completed);
        assert!(call.attended_minutes.is_none());
    }
}
