// ==========================================
// Blood Bank Allocation - Allocation config reader trait
// ==========================================
// Read-only configuration interface for the engine
// Implementor: ConfigManager (config_kv table)
// ==========================================

use crate::domain::donation::DEFAULT_SHELF_LIFE_DAYS;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;

pub type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// CandidateOrder - order of candidates before both passes
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CandidateOrder {
    /// Provider order, untouched
    Snapshot,
    /// Soonest-to-expire first (stable)
    ExpiryFirst,
}

impl CandidateOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SNAPSHOT" => Some(CandidateOrder::Snapshot),
            "EXPIRY_FIRST" => Some(CandidateOrder::ExpiryFirst),
            _ => None,
        }
    }
}

impl fmt::Display for CandidateOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CandidateOrder::Snapshot => write!(f, "SNAPSHOT"),
            CandidateOrder::ExpiryFirst => write!(f, "EXPIRY_FIRST"),
        }
    }
}

// ==========================================
// AllocationSettings - values used by one fulfillment call
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationSettings {
    pub shelf_life_days: i64,
    pub candidate_order: CandidateOrder,
    /// Confirm the request even when supply falls short
    pub confirm_on_shortfall: bool,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            shelf_life_days: DEFAULT_SHELF_LIFE_DAYS,
            candidate_order: CandidateOrder::Snapshot,
            confirm_on_shortfall: true,
        }
    }
}

// ==========================================
// AllocationConfigReader
// ==========================================
#[async_trait]
pub trait AllocationConfigReader: Send + Sync {
    /// Days after collection at which a unit expires
    ///
    /// # Default
    /// - 35
    async fn get_shelf_life_days(&self) -> ConfigResult<i64>;

    /// Candidate ordering policy
    ///
    /// # Default
    /// - SNAPSHOT
    async fn get_candidate_order(&self) -> ConfigResult<CandidateOrder>;

    /// Whether a short-supplied request is still confirmed
    ///
    /// # Default
    /// - true
    async fn get_confirm_on_shortfall(&self) -> ConfigResult<bool>;

    /// Loads all allocation settings at once
    async fn load_allocation_settings(&self) -> ConfigResult<AllocationSettings> {
        Ok(AllocationSettings {
            shelf_life_days: self.get_shelf_life_days().await?,
            candidate_order: self.get_candidate_order().await?,
            confirm_on_shortfall: self.get_confirm_on_shortfall().await?,
        })
    }
}

/// Fixed settings, for tests and embedded use without a config table
#[derive(Debug, Clone, Default)]
pub struct StaticAllocationConfig(pub AllocationSettings);

#[async_trait]
impl AllocationConfigReader for StaticAllocationConfig {
    async fn get_shelf_life_days(&self) -> ConfigResult<i64> {
        Ok(self.0.shelf_life_days)
    }

    async fn get_candidate_order(&self) -> ConfigResult<CandidateOrder> {
        Ok(self.0.candidate_order)
    }

    async fn get_confirm_on_shortfall(&self) -> ConfigResult<bool> {
        Ok(self.0.confirm_on_shortfall)
    }
}
