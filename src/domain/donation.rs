// ==========================================
// Blood Bank Allocation - Donation unit
// ==========================================
// Join of an eligibility record and its collection record
// remaining_volume only ever decreases; never resurrected
// ==========================================

use crate::domain::types::BloodType;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Days a collected unit stays usable
pub const DEFAULT_SHELF_LIFE_DAYS: i64 = 35;

/// Largest shelf life accepted from configuration
pub const MAX_SHELF_LIFE_DAYS: i64 = 3650;

// ==========================================
// DonationUnit
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DonationUnit {
    pub unit_key: String,
    pub donor_id: String,
    pub blood_type: BloodType,
    pub remaining_volume: u32,
    pub collected_at: NaiveDateTime,
    pub collection_successful: bool,
    pub unit_serial_number: Option<String>,
}

impl DonationUnit {
    /// collected_at + shelf life, saturating at the calendar bounds
    pub fn expires_at(&self, shelf_life_days: i64) -> NaiveDateTime {
        Duration::try_days(shelf_life_days)
            .and_then(|shelf_life| self.collected_at.checked_add_signed(shelf_life))
            .unwrap_or(if shelf_life_days < 0 {
                NaiveDateTime::MIN
            } else {
                NaiveDateTime::MAX
            })
    }

    /// A unit is expired once `expires_at <= now`
    pub fn is_expired(&self, now: NaiveDateTime, shelf_life_days: i64) -> bool {
        self.expires_at(shelf_life_days) <= now
    }

    /// Successful collection, volume left, not expired
    pub fn is_allocatable(&self, now: NaiveDateTime, shelf_life_days: i64) -> bool {
        self.collection_successful
            && self.remaining_volume > 0
            && !self.is_expired(now, shelf_life_days)
    }
}
