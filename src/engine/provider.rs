// ==========================================
// Blood Bank Allocation - Inventory snapshot provider
// ==========================================
// Boundary to the inventory store. Returns successful collections with
// volume left; expiry filtering is the planner's job, so expired records
// may be included.
// ==========================================

use crate::domain::donation::DonationUnit;
use crate::engine::error::ProviderError;
use crate::repository::DonationUnitRepository;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait InventorySnapshotProvider: Send + Sync {
    /// Successful collections (`collection_successful = true`), in store order
    async fn fetch_successful_collections(&self) -> Result<Vec<DonationUnit>, ProviderError>;
}

// ==========================================
// SqliteSnapshotProvider - reads donation_unit
// ==========================================
pub struct SqliteSnapshotProvider {
    unit_repo: Arc<DonationUnitRepository>,
}

impl SqliteSnapshotProvider {
    pub fn new(unit_repo: Arc<DonationUnitRepository>) -> Self {
        Self { unit_repo }
    }
}

#[async_trait]
impl InventorySnapshotProvider for SqliteSnapshotProvider {
    async fn fetch_successful_collections(&self) -> Result<Vec<DonationUnit>, ProviderError> {
        let units = self.unit_repo.list_successful_collections()?;
        tracing::debug!(snapshot_size = units.len(), "inventory snapshot fetched");
        Ok(units)
    }
}
