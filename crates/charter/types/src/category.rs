//! Ledger entry classification: category, severity, and discrepancy class.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which constitutional concern an entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryCategory {
    /// Gate registrations, transitions, bypasses.
    Governance,
    /// Attestation issuance, suspension, reinstatement.
    Certification,
    /// Chain verification findings and safety-level transitions.
    Integrity,
    /// Kill-switch events and detected interference.
    Adversarial,
    /// Retest cycles, closures, reopens.
    Compliance,
    /// Routine operational events from external collaborators.
    Operational,
    /// Break-glass exceptions and rejected mutation attempts.
    Sovereignty,
}

impl fmt::Display for EntryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntryCategory::Governance => "governance",
            EntryCategory::Certification => "certification",
            EntryCategory::Integrity => "integrity",
            EntryCategory::Adversarial => "adversarial",
            EntryCategory::Compliance => "compliance",
            EntryCategory::Operational => "operational",
            EntryCategory::Sovereignty => "sovereignty",
        };
        f.write_str(name)
    }
}

/// How serious an entry is, ordered least to most severe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

/// Severity tier of a detected governance anomaly.
///
/// Ordered least to most severe: `None < C < B < A`. Class A anomalies are
/// constitutional violations and feed straight into escalation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyClass {
    None,
    C,
    B,
    A,
}

impl DiscrepancyClass {
    /// Whether this entry marks an anomaly at all.
    pub fn is_discrepancy(self) -> bool {
        self != DiscrepancyClass::None
    }
}
