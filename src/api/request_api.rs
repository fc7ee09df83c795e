// ==========================================
// Blood Bank Allocation - Request API
// ==========================================
// Caller-facing facade: submit, query, preview, fulfill, audit
// Engine and repository errors are mapped to ApiError here
// ==========================================

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::api::error::{ApiError, ApiResult};
use crate::config::config_manager::ConfigManager;
use crate::db::now_utc;
use crate::domain::allocation::{AllocationLog, FulfillmentResult};
use crate::domain::request::{BloodRequest, NewBloodRequest};
use crate::domain::types::RequestStatus;
use crate::engine::coordinator::{CandidateUnit, RequestFulfillmentCoordinator};
use crate::engine::events::OptionalEventPublisher;
use crate::engine::provider::SqliteSnapshotProvider;
use crate::engine::repositories::FulfillmentRepositories;

pub struct RequestApi {
    repos: FulfillmentRepositories,
    coordinator: Arc<RequestFulfillmentCoordinator<ConfigManager>>,
}

impl RequestApi {
    pub fn new(
        repos: FulfillmentRepositories,
        coordinator: Arc<RequestFulfillmentCoordinator<ConfigManager>>,
    ) -> Self {
        Self { repos, coordinator }
    }

    /// Wires repositories, SQLite snapshot provider and config for one database file
    pub fn open(db_path: &str, events: OptionalEventPublisher) -> ApiResult<Self> {
        let repos = FulfillmentRepositories::open(db_path)?;
        let config = ConfigManager::new(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        let provider = Arc::new(SqliteSnapshotProvider::new(repos.unit_repo.clone()));

        let coordinator = Arc::new(RequestFulfillmentCoordinator::new(
            repos.clone(),
            provider,
            Arc::new(config),
            events,
        ));

        Ok(Self::new(repos, coordinator))
    }

    /// Creates a Pending request and returns its id
    pub fn submit_request(&self, request: NewBloodRequest) -> ApiResult<i64> {
        request.validate().map_err(ApiError::InvalidInput)?;

        let request_id = self.repos.request_repo.insert(&request, now_utc())?;
        info!(
            request_id,
            blood_type = %crate::domain::BloodType::new(request.patient_blood_type, request.rh_factor),
            units_requested = request.units_requested,
            "blood request submitted"
        );
        Ok(request_id)
    }

    pub fn get_request(&self, request_id: i64) -> ApiResult<BloodRequest> {
        self.repos
            .request_repo
            .find_by_id(request_id)?
            .ok_or_else(|| ApiError::NotFound(format!("blood_request(id={})", request_id)))
    }

    /// Newest first; `None` lists every status
    pub fn list_requests(&self, status: Option<RequestStatus>) -> ApiResult<Vec<BloodRequest>> {
        let requests = self.repos.request_repo.list(status)?;
        debug!(count = requests.len(), "requests listed");
        Ok(requests)
    }

    pub async fn fulfill_request(&self, request_id: i64) -> ApiResult<FulfillmentResult> {
        Ok(self.coordinator.fulfill(request_id).await?)
    }

    /// Up to `units_requested` candidate rows; each row may hold any volume
    pub async fn preview_candidates(&self, request_id: i64) -> ApiResult<Vec<CandidateUnit>> {
        Ok(self.coordinator.preview(request_id).await?)
    }

    pub fn list_allocations(&self, request_id: i64) -> ApiResult<Vec<AllocationLog>> {
        // distinguishes "no allocations" from "no such request"
        self.get_request(request_id)?;
        Ok(self.repos.allocation_log_repo.list_by_request(request_id)?)
    }

    /// Remaining units per blood type over successful collections
    pub fn inventory_summary(&self) -> ApiResult<BTreeMap<String, u64>> {
        Ok(self.repos.unit_repo.remaining_by_type()?)
    }
}
