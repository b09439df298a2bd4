use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ledger evidence that money moved for a slot or one of its calls.
/// A credit row is a terminal signal for the session it references.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefundRecord {
    pub id: Uuid,
    pub reference_id: Uuid,
    pub reference_kind: ReferenceKind,
    pub reason: RefundReason,
    pub direction: LedgerDirection,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    Slot,
    Call,
}

impl ReferenceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceKind::Slot => "slot",
            ReferenceKind::Call => "call",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "slot" => Some(ReferenceKind::Slot),
            "call" => Some(ReferenceKind::Call),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RefundReason {
    ExpertNoShow,
    Refund,
    Other,
}

impl RefundReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundReason::ExpertNoShow => "expert_no_show",
            RefundReason::Refund => "refund",
            RefundReason::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "expert_no_show" => RefundReason::ExpertNoShow,
            "refund" => RefundReason::Refund,
            _ => RefundReason::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LedgerDirection {
    Credit,
    Debit,
}

impl LedgerDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerDirection::Credit => "credit",
            LedgerDirection::Debit => "debit",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credit" => Some(LedgerDirection::Credit),
            "debit" => Some(LedgerDirection::Debit),
            _ => None,
        }
    }
}

impl RefundRecord {
    /// A credit back to the client against the given slot or call.
    pub fn credit(reference_id: Uuid, reference_kind: ReferenceKind, reason: RefundReason) -> Self {
        Self {
            id: Uuid::new_v4(),
            reference_id,
            reference_kind,
            reason,
            direction: LedgerDirection::Credit,
            created_at: Utc::now(),
        }
    }
}
