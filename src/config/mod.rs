// ==========================================
// Blood Bank Allocation - Configuration layer
// ==========================================
// Storage: config_kv table
// ==========================================

pub mod allocation_config_trait;
pub mod config_manager;

pub use allocation_config_trait::{
    AllocationConfigReader, AllocationSettings, CandidateOrder, ConfigResult,
    StaticAllocationConfig,
};
pub use config_manager::{config_keys, ConfigManager};
