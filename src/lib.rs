// ==========================================
// Blood Bank Allocation - Core library
// ==========================================
// Stack: Rust + SQLite (rusqlite) + tokio
// Matches hospital blood requests to compatible donation units,
// deducts inventory and confirms the request
// ==========================================

// ==========================================
// Modules
// ==========================================

// Domain layer - entities and value types
pub mod domain;

// Repository layer - data access
pub mod repository;

// Engine layer - allocation rules
pub mod engine;

// Import layer - collection records
pub mod importer;

// Configuration layer
pub mod config;

// Database infrastructure (connection setup / PRAGMAs / schema)
pub mod db;

// Logging
pub mod logging;

// API layer - caller-facing facade
pub mod api;

// ==========================================
// Re-exports
// ==========================================

pub use domain::types::{AboGroup, BloodType, RequestStatus, RhFactor};

pub use domain::{
    AllocationLog, AllocationPlan, BloodRequest, CommitResult, DonationUnit, FulfillmentResult,
    NewBloodRequest, PlanEntry,
};

pub use engine::{
    AllocationPlanner, CompatibilityResolver, InventoryCommitter, RequestFulfillmentCoordinator,
};

pub use api::{ApiError, ApiResult, RequestApi};

// ==========================================
// Constants
// ==========================================

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_NAME: &str = "Blood Bank Allocation";
