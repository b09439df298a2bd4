use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::slot::{BookingSlot, SlotError};

/// Clock/storage jitter tolerated between one slot's end and the next
/// slot's start when deciding continuity.
pub const CONTINUITY_TOLERANCE_SECS: i64 = 5;

/// A maximal chain of back-to-back slots for one client on one date,
/// operated on as a single unit. Size 1 is the ordinary single-slot case.
///
/// Member ids are carried as a real list; structure is never encoded into
/// a delimited identifier string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CombinedSession {
    /// Member slot ids, ascending by start time.
    pub member_ids: Vec<Uuid>,
    /// First member's id; all writes target this slot.
    pub primary_slot_id: Uuid,
    pub client_id: Uuid,
    pub expert_date: NaiveDate,
    pub combined_start: DateTime<Utc>,
    /// The last member's end time.
    pub combined_end: DateTime<Utc>,
    /// Sum of member durations.
    pub combined_duration_minutes: i64,
}

impl CombinedSession {
    fn from_chain(members: &[&BookingSlot]) -> Self {
        let first = members[0];
        let last = members[members.len() - 1];
        Self {
            member_ids: members.iter().map(|s| s.id).collect(),
            primary_slot_id: first.id,
            client_id: first.client_id,
            expert_date: first.expert_date,
            combined_start: first.start_time,
            combined_end: last.end_time,
            combined_duration_minutes: members.iter().map(|s| s.duration_minutes).sum(),
        }
    }

    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }

    pub fn is_combined(&self) -> bool {
        self.member_ids.len() > 1
    }
}

/// A slot that failed per-item validation and was excluded from grouping.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedSlot {
    pub slot: BookingSlot,
    pub reason: SlotError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupingOutcome {
    pub sessions: Vec<CombinedSession>,
    pub rejected: Vec<RejectedSlot>,
}

/// Merges adjacent same-client, same-date slots into combined sessions.
///
/// Deterministic over any input order: valid slots are sorted by
/// `(start_time, id)` before chains are built. Malformed slots (empty
/// interval, duration mismatch, duplicate id) are rejected per item and
/// never abort the batch. Lifecycle status is deliberately ignored when
/// deciding continuity; it is only consulted later, on the primary slot.
pub fn group_slots(slots: Vec<BookingSlot>) -> GroupingOutcome {
    let mut rejected = Vec::new();
    let mut seen = HashSet::new();
    let mut valid: Vec<BookingSlot> = Vec::with_capacity(slots.len());

    for slot in slots {
        if !seen.insert(slot.id) {
            let reason = SlotError::DuplicateId { id: slot.id };
            rejected.push(RejectedSlot { slot, reason });
            continue;
        }
        match slot.validate() {
            Ok(()) => valid.push(slot),
            Err(reason) => rejected.push(RejectedSlot { slot, reason }),
        }
    }

    valid.sort_by_key(|s| (s.start_time, s.id));

    let tolerance = Duration::seconds(CONTINUITY_TOLERANCE_SECS);
    let mut processed = vec![false; valid.len()];
    let mut sessions = Vec::new();

    for i in 0..valid.len() {
        if processed[i] {
            continue;
        }
        processed[i] = true;
        let head = &valid[i];
        let mut members: Vec<&BookingSlot> = vec![head];
        let mut chain_end = head.end_time;

        loop {
            let mut next_link = None;
            for (j, candidate) in valid.iter().enumerate().skip(i + 1) {
                if processed[j] {
                    continue;
                }
                // Sorted by start time, so once a slot starts past the
                // tolerance window nothing later can link either.
                if candidate.start_time - chain_end > tolerance {
                    break;
                }
                if candidate.client_id == head.client_id
                    && candidate.expert_date == head.expert_date
                    && candidate.start_time >= chain_end - tolerance
                {
                    next_link = Some(j);
                    break;
                }
            }
            match next_link {
                Some(j) => {
                    processed[j] = true;
                    chain_end = valid[j].end_time;
                    members.push(&valid[j]);
                }
                None => break,
            }
        }

        sessions.push(CombinedSession::from_chain(&members));
    }

    GroupingOutcome { sessions, rejected }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::slot::SlotStatus;
    use chrono::TimeZone;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 14).unwrap()
    }

    fn slot_at(client: Uuid, hour: u32, min: u32, duration: i64) -> BookingSlot {
        BookingSlot::new(
            Uuid::new_v4(),
            client,
            date(),
            Utc.with_ymd_and_hms(2024, 3, 14, hour, min, 0).unwrap(),
            duration,
        )
    }

    #[test]
    fn test_empty_input() {
        let outcome = group_slots(vec![]);
        assert!(outcome.sessions.is_empty());
        assert!(outcome.rejected.is_empty());
    }

    #[test]
    fn test_single_slot_is_degenerate_session() {
        let client = Uuid::new_v4();
        let s = slot_at(client, 10, 0, 30);
        let outcome = group_slots(vec![s.clone()]);

        assert_eq!(outcome.sessions.len(), 1);
        let session = &outcome.sessions[0];
        assert_eq!(session.member_ids, vec![s.id]);
        assert_eq!(session.primary_slot_id, s.id);
        assert_eq!(session.combined_start, s.start_time);
        assert_eq!(session.combined_end, s.end_time);
        assert_eq!(session.combined_duration_minutes, 30);
        assert!(!session.is_combined());
    }

    #[test]
    fn test_back_to_back_slots_merge() {
        let client = Uuid::new_v4();
        let a = slot_at(client, 10, 0, 30);
        let b = slot_at(client, 10, 30, 30);
        let outcome = group_slots(vec![a.clone(), b.clone()]);

        assert_eq!(outcome.sessions.len(), 1);
        let session = &outcome.sessions[0];
        assert_eq!(session.member_ids, vec![a.id, b.id]);
        assert_eq!(session.primary_slot_id, a.id);
        assert_eq!(session.combined_start, a.start_time);
        assert_eq!(session.combined_end, b.end_time);
        assert_eq!(session.combined_duration_minutes, 60);
    }

    #[test]
    fn test_four_consecutive_half_hours_become_one_session() {
        let client = Uuid::new_v4();
        let slots = vec![
            slot_at(client, 9, 0, 30),
            slot_at(client, 9, 30, 30),
            slot_at(client, 10, 0, 30),
            slot_at(client, 10, 30, 30),
        ];
        let outcome = group_slots(slots);

        assert_eq!(outcome.sessions.len(), 1);
        assert_eq!(outcome.sessions[0].member_ids.len(), 4);
        assert_eq!(outcome.sessions[0].combined_duration_minutes, 120);
    }

    #[test]
    fn test_ten_second_gap_is_not_continuous() {
        let client = Uuid::new_v4();
        let a = slot_at(client, 10, 0, 30);
        let mut b = slot_at(client, 10, 30, 30);
        b.start_time = a.end_time + Duration::seconds(10);
        b.end_time = b.start_time + Duration::minutes(30);
        let outcome = group_slots(vec![a, b]);

        assert_eq!(outcome.sessions.len(), 2);
    }

    #[test]
    fn test_gap_exactly_at_tolerance_is_continuous() {
        let client = Uuid::new_v4();
        let a = slot_at(client, 10, 0, 30);
        let mut b = slot_at(client, 10, 30, 30);
        b.start_time = a.end_time + Duration::seconds(CONTINUITY_TOLERANCE_SECS);
        b.end_time = b.start_time + Duration::minutes(30);
        let outcome = group_slots(vec![a, b]);

        assert_eq!(outcome.sessions.len(), 1);
        assert_eq!(outcome.sessions[0].member_ids.len(), 2);
    }

    #[test]
    fn test_slot_starting_slightly_early_still_links() {
        let client = Uuid::new_v4();
        let a = slot_at(client, 10, 0, 30);
        let mut b = slot_at(client, 10, 30, 30);
        b.start_time = a.end_time - Duration::seconds(3);
        b.end_time = b.start_time + Duration::minutes(30);
        let outcome = group_slots(vec![a, b]);

        assert_eq!(outcome.sessions.len(), 1);
    }

    #[test]
    fn test_other_client_in_the_middle_does_not_bridge() {
        let client_x = Uuid::new_v4();
        let client_y = Uuid::new_v4();
        let a = slot_at(client_x, 10, 0, 30);
        let b = slot_at(client_y, 10, 30, 30);
        let c = slot_at(client_y, 11, 0, 30);
        let outcome = group_slots(vec![a.clone(), b.clone(), c.clone()]);

        assert_eq!(outcome.sessions.len(), 2);
        let for_x: Vec<_> = outcome
            .sessions
            .iter()
            .filter(|s| s.client_id == client_x)
            .collect();
        assert_eq!(for_x.len(), 1);
        assert_eq!(for_x[0].member_ids, vec![a.id]);

        let for_y: Vec<_> = outcome
            .sessions
            .iter()
            .filter(|s| s.client_id == client_y)
            .collect();
        assert_eq!(for_y.len(), 1);
        assert_eq!(for_y[0].member_ids, vec![b.id, c.id]);
    }

    #[test]
    fn test_different_dates_never_merge() {
        let client = Uuid::new_v4();
        let a = slot_at(client, 23, 30, 30);
        let mut b = slot_at(client, 0, 0, 30);
        b.expert_date = date().succ_opt().unwrap();
        b.start_time = a.end_time;
        b.end_time = b.start_time + Duration::minutes(30);
        let outcome = group_slots(vec![a, b]);

        assert_eq!(outcome.sessions.len(), 2);
    }

    #[test]
    fn test_cancelled_member_still_bridges_continuity() {
        let client = Uuid::new_v4();
        let a = slot_at(client, 10, 0, 30);
        let mut b = slot_at(client, 10, 30, 30);
        b.status = SlotStatus::Cancelled;
        let c = slot_at(client, 11, 0, 30);
        let outcome = group_slots(vec![a, b, c]);

        assert_eq!(outcome.sessions.len(), 1);
        assert_eq!(outcome.sessions[0].member_ids.len(), 3);
    }

    #[test]
    fn test_malformed_slots_rejected_without_aborting_batch() {
        let client = Uuid::new_v4();
        let good = slot_at(client, 10, 0, 30);
        let mut bad = slot_at(client, 11, 0, 30);
        bad.end_time = bad.start_time;
        let outcome = group_slots(vec![good.clone(), bad.clone()]);

        assert_eq!(outcome.sessions.len(), 1);
        assert_eq!(outcome.sessions[0].member_ids, vec![good.id]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(
            outcome.rejected[0].reason,
            SlotError::EmptyInterval { id: bad.id }
        );
    }

    #[test]
    fn test_duplicate_id_rejected_first_occurrence_kept() {
        let client = Uuid::new_v4();
        let a = slot_at(client, 10, 0, 30);
        let mut dup = slot_at(client, 14, 0, 30);
        dup.id = a.id;
        let outcome = group_slots(vec![a.clone(), dup]);

        assert_eq!(outcome.sessions.len(), 1);
        assert_eq!(outcome.sessions[0].member_ids, vec![a.id]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(
            outcome.rejected[0].reason,
            SlotError::DuplicateId { id: a.id }
        );
    }

    #[test]
    fn test_every_valid_slot_covered_exactly_once() {
        let client_x = Uuid::new_v4();
        let client_y = Uuid::new_v4();
        let slots = vec![
            slot_at(client_x, 9, 0, 30),
            slot_at(client_x, 9, 30, 30),
            slot_at(client_y, 9, 30, 60),
            slot_at(client_x, 11, 0, 30),
            slot_at(client_y, 12, 0, 30),
        ];
        let ids: HashSet<Uuid> = slots.iter().map(|s| s.id).collect();
        let outcome = group_slots(slots);

        let mut covered = HashSet::new();
        for session in &outcome.sessions {
            for id in &session.member_ids {
                assert!(covered.insert(*id), "slot {} appeared twice", id);
            }
        }
        assert_eq!(covered, ids);
    }
}
