// ==========================================
// Blood Bank Allocation - Allocation planner
// ==========================================
// Input: request + inventory snapshot
// Output: AllocationPlan + units still needed
// Never writes; a short supply yields a partial plan, not an error
// ==========================================
// Passes:
// 1. exact match, in candidate order
// 2. compatible substitution, ascending priority
// 3. clamp so the plan never exceeds units_requested
// ==========================================

use crate::config::{AllocationSettings, CandidateOrder};
use crate::domain::allocation::{AllocationPlan, PlanEntry};
use crate::domain::donation::DonationUnit;
use crate::domain::request::BloodRequest;
use crate::domain::types::BloodType;
use crate::engine::compatibility::CompatibilityResolver;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    pub plan: AllocationPlan,
    pub units_still_needed: u32,
}

// ==========================================
// AllocationPlanner
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct AllocationPlanner {
    resolver: CompatibilityResolver,
}

impl AllocationPlanner {
    pub fn new() -> Self {
        Self {
            resolver: CompatibilityResolver::new(),
        }
    }

    /// Plans deductions for a loaded request
    pub fn plan(
        &self,
        request: &BloodRequest,
        available: &[DonationUnit],
        now: NaiveDateTime,
        settings: &AllocationSettings,
    ) -> PlanOutcome {
        self.plan_for(request.blood_type(), request.units_requested, available, now, settings)
    }

    /// Plans deductions for `units_requested` units of `requested`
    ///
    /// # Arguments
    /// - available: snapshot, in provider order
    /// - now: reference time for expiry
    pub fn plan_for(
        &self,
        requested: BloodType,
        units_requested: u32,
        available: &[DonationUnit],
        now: NaiveDateTime,
        settings: &AllocationSettings,
    ) -> PlanOutcome {
        let candidates = self.eligible_candidates(available, now, settings);

        let mut plan = AllocationPlan::new();
        let mut claimed: HashSet<&str> = HashSet::new();
        let mut still_needed = units_requested;

        // === Pass 1: exact match ===
        for &unit in &candidates {
            if still_needed == 0 {
                break;
            }
            if unit.blood_type == requested {
                take(unit, &mut plan, &mut claimed, &mut still_needed);
            }
        }

        debug!(
            requested = %requested,
            exact_units = plan.total_units(),
            still_needed,
            "exact-match pass done"
        );

        // === Pass 2: compatible substitution ===
        if still_needed > 0 {
            for donor in self.resolver.compatible_donors(requested.abo, requested.rh) {
                if still_needed == 0 {
                    break;
                }
                for &unit in &candidates {
                    if still_needed == 0 {
                        break;
                    }
                    if unit.blood_type == donor.blood_type {
                        take(unit, &mut plan, &mut claimed, &mut still_needed);
                    }
                }
            }

            debug!(
                requested = %requested,
                planned_units = plan.total_units(),
                still_needed,
                "substitution pass done"
            );
        }

        // === Pass 3: clamp ===
        clamp_to_requested(&mut plan, units_requested);

        PlanOutcome {
            units_still_needed: units_requested.saturating_sub(plan.total_units()),
            plan,
        }
    }

    /// Allocatable units in the configured order
    ///
    /// Expired, empty and failed-collection units never reach either pass.
    fn eligible_candidates<'a>(
        &self,
        available: &'a [DonationUnit],
        now: NaiveDateTime,
        settings: &AllocationSettings,
    ) -> Vec<&'a DonationUnit> {
        let shelf_life = settings.shelf_life_days;
        let mut candidates: Vec<&DonationUnit> = available
            .iter()
            .filter(|u| u.is_allocatable(now, shelf_life))
            .collect();

        if settings.candidate_order == CandidateOrder::ExpiryFirst {
            // stable: ties keep snapshot order
            candidates.sort_by_key(|u| u.expires_at(shelf_life));
        }

        candidates
    }
}

/// Claims `min(remaining, still_needed)` from an unclaimed unit
fn take<'a>(
    unit: &'a DonationUnit,
    plan: &mut AllocationPlan,
    claimed: &mut HashSet<&'a str>,
    still_needed: &mut u32,
) {
    if unit.remaining_volume == 0 || !claimed.insert(unit.unit_key.as_str()) {
        return;
    }

    let units_to_take = unit.remaining_volume.min(*still_needed);
    *still_needed -= units_to_take;
    plan.entries.push(PlanEntry {
        unit_key: unit.unit_key.clone(),
        blood_type: unit.blood_type,
        units_to_take,
    });
}

/// Trims the last entry by any excess over `units_requested`, then drops
/// entries left with nothing to take
pub fn clamp_to_requested(plan: &mut AllocationPlan, units_requested: u32) {
    let total = plan.total_units();
    if total > units_requested {
        let excess = total - units_requested;
        if let Some(last) = plan.entries.last_mut() {
            last.units_to_take = last.units_to_take.saturating_sub(excess);
        }
    }
    plan.entries.retain(|e| e.units_to_take > 0);
}
