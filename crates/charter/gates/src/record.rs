//! Gate records and engine configuration.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use charter_types::{
    Actor, ChainId, EvidenceBundle, GateClass, GateLevel, GateStatus, SafetyLevel, SubjectId,
};

/// One subject's standing at one gate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateRecord {
    pub subject_id: SubjectId,
    pub gate_class: GateClass,
    pub level: GateLevel,
    pub status: GateStatus,
    pub required_approvers: BTreeSet<Actor>,
    pub approvers_signed: BTreeSet<Actor>,
    pub entered_at: DateTime<Utc>,
    pub exited_at: Option<DateTime<Utc>>,
    pub evidence: EvidenceBundle,
    /// Hex blake3 of the subject content, captured on first entry to the
    /// freeze gate and immutable afterwards.
    pub content_hash: Option<String>,
}

/// Gate engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GateConfig {
    /// Entering this gate (or any above it) freezes subject content.
    pub freeze_level: GateLevel,
    /// Standard-class subjects stop advancing at this safety level.
    pub standard_freeze_at: SafetyLevel,
    /// Emergency-class subjects stop advancing at this safety level.
    pub emergency_freeze_at: SafetyLevel,
    /// Chain that receives gate ledger entries.
    pub chain: ChainId,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            freeze_level: GateLevel::G2,
            standard_freeze_at: SafetyLevel::Orange,
            emergency_freeze_at: SafetyLevel::Black,
            chain: ChainId::new("governance"),
        }
    }
}

/// Read-only view of where a subject stands, for dashboards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubjectGateView {
    pub subject_id: SubjectId,
    pub gate_class: GateClass,
    pub highest_passed: Option<GateLevel>,
    pub active_level: GateLevel,
    pub active_status: GateStatus,
    pub frozen: bool,
}
