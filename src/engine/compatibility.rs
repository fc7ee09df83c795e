// ==========================================
// Blood Bank Allocation - Compatibility resolver
// ==========================================
// Red-cell compatibility table with tie-break priorities.
// Lists are returned in ascending priority, which is the substitution
// order: the most widely compatible donor type is tried first.
// ==========================================

use crate::domain::types::{AboGroup, BloodType, RhFactor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibleDonor {
    pub blood_type: BloodType,
    pub priority: u8,
}

const fn donor(abo: AboGroup, rh: RhFactor, priority: u8) -> CompatibleDonor {
    CompatibleDonor {
        blood_type: BloodType::new(abo, rh),
        priority,
    }
}

use AboGroup::{Ab, A, B, O};
use RhFactor::{Negative as Neg, Positive as Pos};

const O_POS: &[CompatibleDonor] = &[donor(O, Pos, 2), donor(O, Neg, 1)];
const O_NEG: &[CompatibleDonor] = &[donor(O, Neg, 1)];

const A_POS: &[CompatibleDonor] = &[
    donor(A, Pos, 4),
    donor(A, Neg, 3),
    donor(O, Pos, 2),
    donor(O, Neg, 1),
];
const A_NEG: &[CompatibleDonor] = &[donor(A, Neg, 2), donor(O, Neg, 1)];

const B_POS: &[CompatibleDonor] = &[
    donor(B, Pos, 4),
    donor(B, Neg, 3),
    donor(O, Pos, 2),
    donor(O, Neg, 1),
];
const B_NEG: &[CompatibleDonor] = &[donor(B, Neg, 2), donor(O, Neg, 1)];

const AB_POS: &[CompatibleDonor] = &[
    donor(Ab, Pos, 8),
    donor(Ab, Neg, 7),
    donor(A, Pos, 6),
    donor(A, Neg, 5),
    donor(B, Pos, 4),
    donor(B, Neg, 3),
    donor(O, Pos, 2),
    donor(O, Neg, 1),
];
const AB_NEG: &[CompatibleDonor] = &[
    donor(Ab, Neg, 4),
    donor(A, Neg, 3),
    donor(B, Neg, 2),
    donor(O, Neg, 1),
];

// ==========================================
// CompatibilityResolver
// ==========================================
// Pure lookup, no state
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibilityResolver;

impl CompatibilityResolver {
    pub fn new() -> Self {
        Self
    }

    /// Acceptable donor types for a recipient, ascending by priority
    pub fn compatible_donors(&self, abo: AboGroup, rh: RhFactor) -> Vec<CompatibleDonor> {
        let table = match (abo, rh) {
            (O, Pos) => O_POS,
            (O, Neg) => O_NEG,
            (A, Pos) => A_POS,
            (A, Neg) => A_NEG,
            (B, Pos) => B_POS,
            (B, Neg) => B_NEG,
            (Ab, Pos) => AB_POS,
            (Ab, Neg) => AB_NEG,
        };

        let mut donors = table.to_vec();
        donors.sort_by_key(|d| d.priority);
        donors
    }

    /// Same lookup from raw stored strings; unrecognized input gives an empty list
    pub fn compatible_donors_for(&self, abo: &str, rh: &str) -> Vec<CompatibleDonor> {
        match (AboGroup::parse(abo), RhFactor::parse(rh)) {
            (Some(abo), Some(rh)) => self.compatible_donors(abo, rh),
            _ => Vec::new(),
        }
    }

    /// Whether `donor` may be given to `recipient`
    pub fn is_compatible(&self, recipient: BloodType, donor: BloodType) -> bool {
        self.compatible_donors(recipient.abo, recipient.rh)
            .iter()
            .any(|d| d.blood_type == donor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(donors: &[CompatibleDonor]) -> Vec<String> {
        donors.iter().map(|d| d.blood_type.code()).collect()
    }

    #[test]
    fn test_o_recipients() {
        let r = CompatibilityResolver::new();
        assert_eq!(codes(&r.compatible_donors(O, Pos)), vec!["O-", "O+"]);
        assert_eq!(codes(&r.compatible_donors(O, Neg)), vec!["O-"]);
    }

    #[test]
    fn test_a_and_b_mirror_each_other() {
        let r = CompatibilityResolver::new();
        assert_eq!(codes(&r.compatible_donors(A, Pos)), vec!["O-", "O+", "A-", "A+"]);
        assert_eq!(codes(&r.compatible_donors(A, Neg)), vec!["O-", "A-"]);
        assert_eq!(codes(&r.compatible_donors(B, Pos)), vec!["O-", "O+", "B-", "B+"]);
        assert_eq!(codes(&r.compatible_donors(B, Neg)), vec!["O-", "B-"]);
    }

    #[test]
    fn test_ab_recipients() {
        let r = CompatibilityResolver::new();
        assert_eq!(
            codes(&r.compatible_donors(Ab, Pos)),
            vec!["O-", "O+", "B-", "B+", "A-", "A+", "AB-", "AB+"]
        );
        assert_eq!(codes(&r.compatible_donors(Ab, Neg)), vec!["O-", "B-", "A-", "AB-"]);
    }

    #[test]
    fn test_priorities_are_ascending() {
        let r = CompatibilityResolver::new();
        for abo in [O, A, B, Ab] {
            for rh in [Pos, Neg] {
                let donors = r.compatible_donors(abo, rh);
                assert!(donors.windows(2).all(|w| w[0].priority < w[1].priority));
                assert_eq!(donors[0].blood_type.code(), "O-");
            }
        }
    }

    #[test]
    fn test_unrecognized_input_is_empty() {
        let r = CompatibilityResolver::new();
        assert!(r.compatible_donors_for("C", "Positive").is_empty());
        assert!(r.compatible_donors_for("A", "Unknown").is_empty());
        assert_eq!(r.compatible_donors_for("ab", "Negative").len(), 4);
    }

    #[test]
    fn test_negative_recipient_never_gets_positive_blood() {
        let r = CompatibilityResolver::new();
        let recipient: BloodType = "A-".parse().unwrap();
        assert!(!r.is_compatible(recipient, "A+".parse().unwrap()));
        assert!(!r.is_compatible(recipient, "B-".parse().unwrap()));
        assert!(r.is_compatible(recipient, "O-".parse().unwrap()));
    }
}
