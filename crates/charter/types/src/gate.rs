//! Gate levels, statuses, and subject classes for change promotion.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered promotion stages a change proposal passes through, draft (G0) to
/// binding (G4).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GateLevel {
    G0,
    G1,
    G2,
    G3,
    G4,
}

impl GateLevel {
    pub const FINAL: GateLevel = GateLevel::G4;

    pub fn ordinal(self) -> u8 {
        match self {
            GateLevel::G0 => 0,
            GateLevel::G1 => 1,
            GateLevel::G2 => 2,
            GateLevel::G3 => 3,
            GateLevel::G4 => 4,
        }
    }

    /// The next gate up, or `None` at the final gate.
    pub fn next(self) -> Option<GateLevel> {
        match self {
            GateLevel::G0 => Some(GateLevel::G1),
            GateLevel::G1 => Some(GateLevel::G2),
            GateLevel::G2 => Some(GateLevel::G3),
            GateLevel::G3 => Some(GateLevel::G4),
            GateLevel::G4 => None,
        }
    }
}

impl fmt::Display for GateLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.ordinal())
    }
}

/// Where a subject stands at one gate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateStatus {
    Pending,
    InProgress,
    Passed,
    Failed,
    Blocked,
    /// A passed gate set aside under explicit elevated authority.
    Bypassed,
}

/// How safety-level freezes apply to a subject's gate advancement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateClass {
    /// Frozen at Orange and above.
    #[default]
    Standard,
    /// Keeps moving until Black.
    Emergency,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_walk_in_order() {
        assert_eq!(GateLevel::G0.next(), Some(GateLevel::G1));
        assert_eq!(GateLevel::G4.next(), None);
        assert!(GateLevel::G1 < GateLevel::G3);
        assert_eq!(GateLevel::G3.ordinal(), 3);
    }

    #[test]
    fn display_names_gates() {
        assert_eq!(GateLevel::G2.to_string(), "G2");
    }
}
