// ==========================================
// Blood Bank Allocation - Data repositories
// ==========================================
// Data access only, no business rules
// All queries are parameterized
// ==========================================

pub mod allocation_log_repo;
pub mod blood_request_repo;
pub mod donation_unit_repo;
pub mod error;
mod mapping;

pub use allocation_log_repo::AllocationLogRepository;
pub use blood_request_repo::BloodRequestRepository;
pub use donation_unit_repo::{DecrementOutcome, DonationUnitRepository};
pub use error::{RepositoryError, RepositoryResult};
