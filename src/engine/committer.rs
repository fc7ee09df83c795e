// ==========================================
// Blood Bank Allocation - Inventory committer
// ==========================================
// Applies a plan entry by entry through guarded decrements.
// Each entry is independent: a failure neither stops nor undoes the others.
// No automatic retry; a stale entry is reported back.
// ==========================================

use crate::domain::allocation::{AllocationPlan, CommitFailure, CommitFailureReason, CommitResult};
use crate::repository::{DecrementOutcome, DonationUnitRepository};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub struct InventoryCommitter {
    unit_repo: Arc<DonationUnitRepository>,
}

impl InventoryCommitter {
    pub fn new(unit_repo: Arc<DonationUnitRepository>) -> Self {
        Self { unit_repo }
    }

    /// Applies every entry in plan order
    ///
    /// # Returns
    /// Per-unit accounting; never an error
    #[instrument(skip(self, plan), fields(entries = plan.len()))]
    pub fn commit(&self, plan: &AllocationPlan, now: NaiveDateTime) -> CommitResult {
        let mut result = CommitResult::default();

        for entry in &plan.entries {
            let outcome = self
                .unit_repo
                .decrement_if_available(&entry.unit_key, entry.units_to_take, now);

            let reason = match outcome {
                Ok(DecrementOutcome::Applied) => {
                    result.succeeded.push(entry.clone());
                    continue;
                }
                Ok(DecrementOutcome::StaleQuantity) => CommitFailureReason::StaleQuantity,
                Ok(DecrementOutcome::NotFound) => CommitFailureReason::UnitNotFound,
                Err(e) => CommitFailureReason::Storage(e.to_string()),
            };

            warn!(
                unit_key = %entry.unit_key,
                units_to_take = entry.units_to_take,
                reason = %reason,
                "unit decrement rejected"
            );
            result.failed.push(CommitFailure {
                entry: entry.clone(),
                reason,
            });
        }

        info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            units_committed = result.units_committed(),
            "plan committed"
        );

        result
    }
}
