// ==========================================
// Blood Bank Allocation - Request fulfillment coordinator
// ==========================================
// Flow: load request -> fetch snapshot -> plan -> commit -> status update
// A retry while Pending plans only what allocation_log does not yet cover
// Fatal (no mutation): request missing, not Pending, provider/config failure
// Non-fatal (reported): per-unit commit failures, audit/event failures
// ==========================================

use crate::config::AllocationConfigReader;
use crate::db::now_utc;
use crate::domain::allocation::{totals_by_type, AllocationLog, CommitResult, FulfillmentResult};
use crate::domain::donation::DonationUnit;
use crate::domain::request::BloodRequest;
use crate::domain::types::RequestStatus;
use crate::engine::committer::InventoryCommitter;
use crate::engine::compatibility::CompatibilityResolver;
use crate::engine::error::{FulfillmentError, FulfillmentOutcome};
use crate::engine::events::{FulfillmentEvent, OptionalEventPublisher};
use crate::engine::planner::AllocationPlanner;
use crate::engine::provider::InventorySnapshotProvider;
use crate::engine::repositories::FulfillmentRepositories;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// One candidate unit in a read-only preview
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateUnit {
    pub unit: DonationUnit,
    pub expires_at: NaiveDateTime,
}

// ==========================================
// RequestFulfillmentCoordinator
// ==========================================
pub struct RequestFulfillmentCoordinator<C>
where
    C: AllocationConfigReader,
{
    repos: FulfillmentRepositories,
    provider: Arc<dyn InventorySnapshotProvider>,
    config: Arc<C>,
    planner: AllocationPlanner,
    committer: InventoryCommitter,
    events: OptionalEventPublisher,
    in_flight: Mutex<HashSet<i64>>,
}

impl<C> RequestFulfillmentCoordinator<C>
where
    C: AllocationConfigReader,
{
    /// # Arguments
    /// - repos: request / unit / audit repositories
    /// - provider: inventory snapshot source
    /// - config: allocation settings reader
    /// - events: optional publisher, notified after the status step
    pub fn new(
        repos: FulfillmentRepositories,
        provider: Arc<dyn InventorySnapshotProvider>,
        config: Arc<C>,
        events: OptionalEventPublisher,
    ) -> Self {
        Self {
            committer: InventoryCommitter::new(repos.unit_repo.clone()),
            planner: AllocationPlanner::new(),
            repos,
            provider,
            config,
            events,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Fulfills a Pending request at the current time
    pub async fn fulfill(&self, request_id: i64) -> FulfillmentOutcome<FulfillmentResult> {
        self.fulfill_at(request_id, now_utc()).await
    }

    /// Fulfills a Pending request, evaluating expiry against `now`
    #[instrument(skip(self, now))]
    pub async fn fulfill_at(
        &self,
        request_id: i64,
        now: NaiveDateTime,
    ) -> FulfillmentOutcome<FulfillmentResult> {
        let _guard = InFlightGuard::acquire(&self.in_flight, request_id)?;

        // === Step 1: load request ===
        let request = self.load_pending_request(request_id)?;

        let already_deducted: u32 = self
            .repos
            .allocation_log_repo
            .list_by_request(request_id)?
            .iter()
            .map(|log| log.units_taken)
            .sum();
        let units_to_plan = request.units_requested.saturating_sub(already_deducted);
        if already_deducted > 0 {
            info!(already_deducted, units_to_plan, "resuming partially deducted request");
        }

        let settings = self
            .config
            .load_allocation_settings()
            .await
            .map_err(|e| FulfillmentError::Config(e.to_string()))?;

        // === Step 2: snapshot ===
        let snapshot = self.provider.fetch_successful_collections().await?;

        // === Step 3: plan ===
        let outcome = self.planner.plan_for(
            request.blood_type(),
            units_to_plan,
            &snapshot,
            now,
            &settings,
        );
        info!(
            requested = %request.blood_type(),
            units_requested = request.units_requested,
            units_to_plan,
            planned_units = outcome.plan.total_units(),
            plan_entries = outcome.plan.len(),
            units_still_needed = outcome.units_still_needed,
            "allocation planned"
        );
        if outcome.units_still_needed > 0 {
            warn!(
                units_still_needed = outcome.units_still_needed,
                "insufficient compatible supply"
            );
        }

        // === Step 4: commit ===
        let commit = self.committer.commit(&outcome.plan, now);

        let mut errors: Vec<String> = commit
            .failed
            .iter()
            .map(|f| format!("unit {}: {}", f.entry.unit_key, f.reason))
            .collect();

        if let Err(e) = self.record_allocations(request_id, &commit, now) {
            warn!(error = %e, "allocation audit log write failed");
            errors.push(format!("allocation log: {}", e));
        }

        // === Step 5: status ===
        let shortfall = outcome.units_still_needed > 0;
        let mut status = RequestStatus::Pending;
        if shortfall && !settings.confirm_on_shortfall {
            info!("request left Pending due to shortfall");
        } else {
            match self.repos.request_repo.transition_status(
                request_id,
                RequestStatus::Pending,
                RequestStatus::Confirmed,
                now,
            ) {
                Ok(()) => status = RequestStatus::Confirmed,
                Err(e) => {
                    warn!(error = %e, "status transition failed");
                    errors.push(format!("status update: {}", e));
                }
            }
        }

        let result = FulfillmentResult {
            request_id,
            success: status == RequestStatus::Confirmed,
            status,
            units_requested: request.units_requested,
            units_previously_deducted: already_deducted,
            units_planned: outcome.plan.total_units(),
            units_deducted: commit.units_committed(),
            units_deducted_by_type: totals_by_type(&commit.succeeded),
            units_committed: commit.succeeded.len(),
            units_still_needed: outcome.units_still_needed,
            commit_failures: commit.failed,
            errors,
        };

        if let Err(e) = self.events.publish(FulfillmentEvent::from_result(&result)) {
            warn!(error = %e, "fulfillment event publish failed");
        }

        info!(
            status = %result.status,
            units_deducted = result.units_deducted,
            units_committed = result.units_committed,
            degraded = result.is_degraded(),
            "fulfillment finished"
        );

        Ok(result)
    }

    /// Read-only list of units that could serve the request
    ///
    /// Oldest collection first, at most `units_requested` rows. The limit
    /// counts unit records, not volume, so the rows may cover more or less
    /// than the requested units.
    pub async fn preview(&self, request_id: i64) -> FulfillmentOutcome<Vec<CandidateUnit>> {
        self.preview_at(request_id, now_utc()).await
    }

    pub async fn preview_at(
        &self,
        request_id: i64,
        now: NaiveDateTime,
    ) -> FulfillmentOutcome<Vec<CandidateUnit>> {
        let request = self
            .repos
            .request_repo
            .find_by_id(request_id)?
            .ok_or(FulfillmentError::RequestNotFound(request_id))?;

        let settings = self
            .config
            .load_allocation_settings()
            .await
            .map_err(|e| FulfillmentError::Config(e.to_string()))?;

        let types: Vec<_> = CompatibilityResolver::new()
            .compatible_donors(request.patient_blood_type, request.rh_factor)
            .into_iter()
            .map(|d| d.blood_type)
            .collect();

        let candidates: Vec<CandidateUnit> = self
            .repos
            .unit_repo
            .list_available_by_types(&types)?
            .into_iter()
            .filter(|u| u.is_allocatable(now, settings.shelf_life_days))
            .take(request.units_requested as usize)
            .map(|unit| CandidateUnit {
                expires_at: unit.expires_at(settings.shelf_life_days),
                unit,
            })
            .collect();

        debug!(request_id, candidates = candidates.len(), "preview built");
        Ok(candidates)
    }

    fn load_pending_request(&self, request_id: i64) -> FulfillmentOutcome<BloodRequest> {
        let request = self
            .repos
            .request_repo
            .find_by_id(request_id)?
            .ok_or(FulfillmentError::RequestNotFound(request_id))?;

        if !request.is_pending() {
            return Err(FulfillmentError::InvalidRequestState {
                request_id,
                status: request.status,
            });
        }

        Ok(request)
    }

    fn record_allocations(
        &self,
        request_id: i64,
        commit: &CommitResult,
        now: NaiveDateTime,
    ) -> Result<usize, crate::repository::RepositoryError> {
        let logs: Vec<AllocationLog> = commit
            .succeeded
            .iter()
            .map(|entry| AllocationLog {
                log_id: Uuid::new_v4().to_string(),
                request_id,
                unit_key: entry.unit_key.clone(),
                blood_type: entry.blood_type,
                units_taken: entry.units_to_take,
                logged_at: now,
            })
            .collect();

        self.repos.allocation_log_repo.insert_batch(&logs)
    }
}

// ==========================================
// InFlightGuard - one live fulfillment per request id per coordinator
// ==========================================
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<i64>>,
    request_id: i64,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(set: &'a Mutex<HashSet<i64>>, request_id: i64) -> FulfillmentOutcome<Self> {
        let mut ids = set
            .lock()
            .map_err(|e| crate::repository::RepositoryError::LockError(e.to_string()))?;

        if !ids.insert(request_id) {
            return Err(FulfillmentError::FulfillmentInProgress(request_id));
        }

        Ok(Self { set, request_id })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut ids) = self.set.lock() {
            ids.remove(&self.request_id);
        }
    }
}
