// ==========================================
// Blood Bank Allocation - Allocation plan and outcomes
// ==========================================
// AllocationPlan: ephemeral, one per fulfillment call
// CommitResult / FulfillmentResult: complete accounting, never a bare bool
// ==========================================

use crate::domain::types::{BloodType, RequestStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ==========================================
// PlanEntry / AllocationPlan
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub unit_key: String,
    pub blood_type: BloodType,
    pub units_to_take: u32,
}

/// Ordered deductions; sum(units_to_take) <= units_requested and unit_key unique
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationPlan {
    pub entries: Vec<PlanEntry>,
}

impl AllocationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_units(&self) -> u32 {
        self.entries.iter().map(|e| e.units_to_take).sum()
    }

    pub fn contains(&self, unit_key: &str) -> bool {
        self.entries.iter().any(|e| e.unit_key == unit_key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn units_by_type(&self) -> BTreeMap<String, u32> {
        totals_by_type(&self.entries)
    }
}

pub(crate) fn totals_by_type(entries: &[PlanEntry]) -> BTreeMap<String, u32> {
    let mut totals = BTreeMap::new();
    for entry in entries {
        *totals.entry(entry.blood_type.code()).or_insert(0) += entry.units_to_take;
    }
    totals
}

// ==========================================
// Commit outcomes
// ==========================================

/// Why a single unit decrement was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitFailureReason {
    /// Conditional decrement matched no row: volume already consumed concurrently
    StaleQuantity,
    /// The unit record no longer exists
    UnitNotFound,
    /// Storage-level failure for this unit
    Storage(String),
}

impl fmt::Display for CommitFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitFailureReason::StaleQuantity => f.write_str("stale quantity"),
            CommitFailureReason::UnitNotFound => f.write_str("unit not found"),
            CommitFailureReason::Storage(msg) => write!(f, "storage error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFailure {
    pub entry: PlanEntry,
    pub reason: CommitFailureReason,
}

/// Per-unit outcome of applying a plan
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitResult {
    pub succeeded: Vec<PlanEntry>,
    pub failed: Vec<CommitFailure>,
}

impl CommitResult {
    pub fn succeeded_keys(&self) -> Vec<&str> {
        self.succeeded.iter().map(|e| e.unit_key.as_str()).collect()
    }

    pub fn units_committed(&self) -> u32 {
        self.succeeded.iter().map(|e| e.units_to_take).sum()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

// ==========================================
// FulfillmentResult - summary returned to callers
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentResult {
    pub request_id: i64,
    /// Status transition happened
    pub success: bool,
    pub status: RequestStatus,
    pub units_requested: u32,
    /// Units already logged for this request by earlier attempts
    #[serde(default)]
    pub units_previously_deducted: u32,
    pub units_planned: u32,
    /// Units actually removed from inventory
    pub units_deducted: u32,
    pub units_deducted_by_type: BTreeMap<String, u32>,
    /// Number of unit records successfully decremented
    pub units_committed: usize,
    /// Shortfall left after planning, net of earlier attempts
    pub units_still_needed: u32,
    pub commit_failures: Vec<CommitFailure>,
    pub errors: Vec<String>,
}

impl FulfillmentResult {
    /// Some supply could not be planned
    pub fn has_shortfall(&self) -> bool {
        self.units_still_needed > 0
    }

    /// Confirmed, but with a shortfall or per-unit failures the caller must see
    pub fn is_degraded(&self) -> bool {
        self.has_shortfall() || !self.commit_failures.is_empty() || !self.errors.is_empty()
    }
}

// ==========================================
// AllocationLog - audit row per committed deduction
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationLog {
    pub log_id: String,
    pub request_id: i64,
    pub unit_key: String,
    pub blood_type: BloodType,
    pub units_taken: u32,
    pub logged_at: NaiveDateTime,
}
