// ==========================================
// Blood Bank Allocation - Engine repository bundle
// ==========================================
// Groups the repositories the fulfillment engine needs so constructors
// take one argument instead of three.
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    AllocationLogRepository, BloodRequestRepository, DonationUnitRepository, RepositoryResult,
};

#[derive(Clone)]
pub struct FulfillmentRepositories {
    pub request_repo: Arc<BloodRequestRepository>,
    pub unit_repo: Arc<DonationUnitRepository>,
    pub allocation_log_repo: Arc<AllocationLogRepository>,
}

impl FulfillmentRepositories {
    pub fn new(
        request_repo: Arc<BloodRequestRepository>,
        unit_repo: Arc<DonationUnitRepository>,
        allocation_log_repo: Arc<AllocationLogRepository>,
    ) -> Self {
        Self {
            request_repo,
            unit_repo,
            allocation_log_repo,
        }
    }

    /// One dedicated connection per repository
    pub fn open(db_path: &str) -> RepositoryResult<Self> {
        Ok(Self::new(
            Arc::new(BloodRequestRepository::new(db_path)?),
            Arc::new(DonationUnitRepository::new(db_path)?),
            Arc::new(AllocationLogRepository::new(db_path)?),
        ))
    }

    /// All repositories over one shared connection
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self::new(
            Arc::new(BloodRequestRepository::from_connection(conn.clone())),
            Arc::new(DonationUnitRepository::from_connection(conn.clone())),
            Arc::new(AllocationLogRepository::from_connection(conn)),
        )
    }
}
