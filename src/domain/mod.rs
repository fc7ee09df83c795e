// ==========================================
// Blood Bank Allocation - Domain layer
// ==========================================
// Entities and value types only
// No data access, no engine logic
// ==========================================

pub mod allocation;
pub mod donation;
pub mod request;
pub mod types;

pub use allocation::{
    AllocationLog, AllocationPlan, CommitFailure, CommitFailureReason, CommitResult,
    FulfillmentResult, PlanEntry,
};
pub use donation::{DonationUnit, DEFAULT_SHELF_LIFE_DAYS, MAX_SHELF_LIFE_DAYS};
pub use request::{BloodRequest, NewBloodRequest};
pub use types::{AboGroup, BloodType, ParseBloodTypeError, RequestStatus, RhFactor};
