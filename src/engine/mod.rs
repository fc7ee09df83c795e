// ==========================================
// Blood Bank Allocation - Engine layer
// ==========================================
// Allocation rules; no SQL here
// Planner is pure; committer and coordinator write through repositories
// ==========================================

pub mod committer;
pub mod compatibility;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod planner;
pub mod provider;
pub mod repositories;

pub use committer::InventoryCommitter;
pub use compatibility::{CompatibilityResolver, CompatibleDonor};
pub use coordinator::{CandidateUnit, RequestFulfillmentCoordinator};
pub use error::{FulfillmentError, FulfillmentOutcome, ProviderError};
pub use events::{
    FulfillmentEvent, FulfillmentEventPublisher, FulfillmentEventType, NoOpEventPublisher,
    OptionalEventPublisher,
};
pub use planner::{clamp_to_requested, AllocationPlanner, PlanOutcome};
pub use provider::{InventorySnapshotProvider, SqliteSnapshotProvider};
pub use repositories::FulfillmentRepositories;
