// ==========================================
// Blood Bank Allocation - Hospital blood request
// ==========================================
// Aligned with the blood_request table
// units_requested is never decremented; only status changes
// ==========================================

use crate::domain::types::{AboGroup, BloodType, RequestStatus, RhFactor};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// BloodRequest
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequest {
    pub request_id: i64,
    pub patient_name: String,
    pub hospital_admitted: Option<String>,
    pub patient_blood_type: AboGroup,
    pub rh_factor: RhFactor,
    pub units_requested: u32,
    pub status: RequestStatus,
    pub requested_at: NaiveDateTime,
    pub last_updated: NaiveDateTime,
}

impl BloodRequest {
    /// Full requested type, e.g. B + Positive -> "B+"
    pub fn blood_type(&self) -> BloodType {
        BloodType::new(self.patient_blood_type, self.rh_factor)
    }

    pub fn is_pending(&self) -> bool {
        self.status == RequestStatus::Pending
    }
}

// ==========================================
// NewBloodRequest - submission payload
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBloodRequest {
    pub patient_name: String,
    pub hospital_admitted: Option<String>,
    pub patient_blood_type: AboGroup,
    pub rh_factor: RhFactor,
    pub units_requested: u32,
}

impl NewBloodRequest {
    /// Returns the first validation problem, if any
    pub fn validate(&self) -> Result<(), String> {
        if self.patient_name.trim().is_empty() {
            return Err("patient_name must not be empty".to_string());
        }
        if self.units_requested == 0 {
            return Err("units_requested must be greater than 0".to_string());
        }
        Ok(())
    }
}
