// ==========================================
// Blood Bank Allocation - Domain value types
// ==========================================
// ABO group, Rh factor, combined blood type, request status
// Storage format: blood type "O+", status "Pending"/"Confirmed"
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// ABO group
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AboGroup {
    O,
    A,
    B,
    #[serde(rename = "AB")]
    Ab,
}

impl AboGroup {
    pub fn as_str(&self) -> &'static str {
        match self {
            AboGroup::O => "O",
            AboGroup::A => "A",
            AboGroup::B => "B",
            AboGroup::Ab => "AB",
        }
    }

    /// Parses the stored ABO column ("O", "A", "B", "AB"), case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "O" => Some(AboGroup::O),
            "A" => Some(AboGroup::A),
            "B" => Some(AboGroup::B),
            "AB" => Some(AboGroup::Ab),
            _ => None,
        }
    }
}

impl fmt::Display for AboGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// Rh factor
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RhFactor {
    Positive,
    Negative,
}

impl RhFactor {
    pub fn as_str(&self) -> &'static str {
        match self {
            RhFactor::Positive => "Positive",
            RhFactor::Negative => "Negative",
        }
    }

    /// "+" or "-"
    pub fn sign(&self) -> char {
        match self {
            RhFactor::Positive => '+',
            RhFactor::Negative => '-',
        }
    }

    /// Accepts "Positive"/"Negative" as well as "+"/"-"
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "+" => Some(RhFactor::Positive),
            "-" => Some(RhFactor::Negative),
            other => match other.to_lowercase().as_str() {
                "positive" | "pos" => Some(RhFactor::Positive),
                "negative" | "neg" => Some(RhFactor::Negative),
                _ => None,
            },
        }
    }
}

impl fmt::Display for RhFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==========================================
// BloodType - combined ABO + Rh ("O+", "AB-")
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BloodType {
    pub abo: AboGroup,
    pub rh: RhFactor,
}

impl BloodType {
    pub const fn new(abo: AboGroup, rh: RhFactor) -> Self {
        Self { abo, rh }
    }

    /// Storage/display code, e.g. "AB-"
    pub fn code(&self) -> String {
        format!("{}{}", self.abo.as_str(), self.rh.sign())
    }
}

impl fmt::Display for BloodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.abo.as_str(), self.rh.sign())
    }
}

/// Error returned when a blood type code cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized blood type: {0:?}")]
pub struct ParseBloodTypeError(pub String);

impl FromStr for BloodType {
    type Err = ParseBloodTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let err = || ParseBloodTypeError(s.to_string());

        let sign = trimmed.chars().last().ok_or_else(err)?;
        let rh = RhFactor::parse(&sign.to_string()).ok_or_else(err)?;
        let abo = AboGroup::parse(&trimmed[..trimmed.len() - sign.len_utf8()]).ok_or_else(err)?;

        Ok(BloodType { abo, rh })
    }
}

impl Serialize for BloodType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.code())
    }
}

impl<'de> Deserialize<'de> for BloodType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ==========================================
// RequestStatus
// ==========================================
// Pending -> Confirmed; Confirmed is terminal for the allocation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    Pending,
    Confirmed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Confirmed => "Confirmed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Pending" => Some(RequestStatus::Pending),
            "Confirmed" => Some(RequestStatus::Confirmed),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blood_type_round_trip_codes() {
        for code in ["O+", "O-", "A+", "A-", "B+", "B-", "AB+", "AB-"] {
            let parsed: BloodType = code.parse().unwrap();
            assert_eq!(parsed.code(), code);
        }
    }

    #[test]
    fn test_blood_type_parse_is_lenient_on_case_and_whitespace() {
        let parsed: BloodType = " ab+ ".parse().unwrap();
        assert_eq!(parsed, BloodType::new(AboGroup::Ab, RhFactor::Positive));
    }

    #[test]
    fn test_blood_type_rejects_garbage() {
        assert!("".parse::<BloodType>().is_err());
        assert!("C+".parse::<BloodType>().is_err());
        assert!("O".parse::<BloodType>().is_err());
        assert!("+".parse::<BloodType>().is_err());
    }

    #[test]
    fn test_rh_factor_accepts_words_and_signs() {
        assert_eq!(RhFactor::parse("Positive"), Some(RhFactor::Positive));
        assert_eq!(RhFactor::parse("negative"), Some(RhFactor::Negative));
        assert_eq!(RhFactor::parse("-"), Some(RhFactor::Negative));
        assert_eq!(RhFactor::parse("maybe"), None);
    }

    #[test]
    fn test_blood_type_serializes_as_code() {
        let bt = BloodType::new(AboGroup::B, RhFactor::Negative);
        assert_eq!(serde_json::to_string(&bt).unwrap(), "\"B-\"");
        let back: BloodType = serde_json::from_str("\"B-\"").unwrap();
        assert_eq!(back, bt);
    }
}
