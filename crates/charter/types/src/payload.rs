//! Schema-versioned ledger entry payloads.
//!
//! Each variant family belongs to one [`EntryCategory`]; the store rejects an
//! append whose payload does not match the entry's declared category, so
//! payload shapes cannot drift silently across consumers.

use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::category::EntryCategory;
use crate::certification::CertificationStatus;
use crate::gate::{GateLevel, GateStatus};
use crate::ids::{ChainId, FailureModeId, SubjectId};
use crate::level::{SafetyLevel, TransitionType};
use crate::retest::{CycleResult, FailureStage};
use crate::switches::{KillSwitchKind, KillSwitchScope};

/// The structured body of a ledger entry, tagged by schema name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "schema")]
pub enum EntryPayload {
    /// A subject registered with or moved through a change gate.
    #[serde(rename = "governance.gate.v1")]
    GateTransition {
        subject_id: SubjectId,
        from_level: Option<GateLevel>,
        to_level: GateLevel,
        status: GateStatus,
        approvers: Vec<Actor>,
    },

    /// An attestation gate was recorded, or a certification suspended or
    /// reinstated.
    #[serde(rename = "certification.issuance.v1")]
    CertificationIssuance {
        subject_id: SubjectId,
        version: String,
        gate: Option<u8>,
        status: CertificationStatus,
    },

    /// A chain verification finding or frozen-content check result.
    #[serde(rename = "integrity.finding.v1")]
    IntegrityFinding {
        chain_id: Option<ChainId>,
        subject_id: Option<SubjectId>,
        first_break_position: Option<u64>,
        detail: String,
    },

    /// The global safety level moved.
    #[serde(rename = "integrity.safety.v1")]
    SafetyShift {
        from: SafetyLevel,
        to: SafetyLevel,
        transition_type: TransitionType,
        reason: String,
    },

    /// A kill-switch was armed, triggered, or reset.
    #[serde(rename = "adversarial.killswitch.v1")]
    KillSwitchEvent {
        name: String,
        kind: KillSwitchKind,
        scope: KillSwitchScope,
        event: String,
    },

    /// A retest lifecycle decision: cycle recorded, closure, or reopen.
    #[serde(rename = "compliance.retest.v1")]
    RetestDecision {
        failure_mode_id: FailureModeId,
        stage: FailureStage,
        result: Option<CycleResult>,
        reopen_count: u32,
        detail: String,
    },

    /// A routine event appended by an external collaborator.
    #[serde(rename = "operational.event.v1")]
    OperationalEvent {
        metric: String,
        value: f64,
        detail: String,
    },

    /// A break-glass exception record, written alongside the redaction it
    /// authorizes.
    #[serde(rename = "sovereignty.breakglass.v1")]
    BreakGlassException {
        chain_id: ChainId,
        position: u64,
        original_self_hash: String,
        reason: String,
    },

    /// A rejected attempt to mutate or delete an existing entry.
    #[serde(rename = "sovereignty.mutation-attempt.v1")]
    MutationAttempt {
        chain_id: ChainId,
        position: u64,
        detail: String,
    },

    /// Left in place of a payload removed through the break-glass path.
    #[serde(rename = "redacted.v1")]
    Redacted {
        original_self_hash: String,
        reason: String,
    },
}

impl EntryPayload {
    /// Whether this payload shape belongs to the given entry category.
    ///
    /// [`EntryPayload::Redacted`] matches every category: redaction replaces
    /// a payload in place without rewriting the entry's classification.
    pub fn matches_category(&self, category: EntryCategory) -> bool {
        match self {
            EntryPayload::GateTransition { .. } => category == EntryCategory::Governance,
            EntryPayload::CertificationIssuance { .. } => category == EntryCategory::Certification,
            EntryPayload::IntegrityFinding { .. } | EntryPayload::SafetyShift { .. } => {
                category == EntryCategory::Integrity
            }
            EntryPayload::KillSwitchEvent { .. } => category == EntryCategory::Adversarial,
            EntryPayload::RetestDecision { .. } => category == EntryCategory::Compliance,
            EntryPayload::OperationalEvent { .. } => category == EntryCategory::Operational,
            EntryPayload::BreakGlassException { .. } | EntryPayload::MutationAttempt { .. } => {
                category == EntryCategory::Sovereignty
            }
            EntryPayload::Redacted { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operational(metric: &str) -> EntryPayload {
        EntryPayload::OperationalEvent {
            metric: metric.into(),
            value: 1.0,
            detail: "observed".into(),
        }
    }

    #[test]
    fn payloads_match_their_category() {
        assert!(operational("fills").matches_category(EntryCategory::Operational));
        assert!(!operational("fills").matches_category(EntryCategory::Governance));

        let shift = EntryPayload::SafetyShift {
            from: SafetyLevel::Green,
            to: SafetyLevel::Yellow,
            transition_type: TransitionType::Upgrade,
            reason: "discrepancy velocity".into(),
        };
        assert!(shift.matches_category(EntryCategory::Integrity));
        assert!(!shift.matches_category(EntryCategory::Compliance));
    }

    #[test]
    fn redacted_matches_any_category() {
        let redacted = EntryPayload::Redacted {
            original_self_hash: "ab".repeat(32),
            reason: "court order".into(),
        };
        assert!(redacted.matches_category(EntryCategory::Operational));
        assert!(redacted.matches_category(EntryCategory::Sovereignty));
    }

    #[test]
    fn schema_tag_is_explicit_on_the_wire() {
        let json = serde_json::to_value(operational("fills")).unwrap();
        assert_eq!(json["schema"], "operational.event.v1");
    }

    #[test]
    fn payload_roundtrip() {
        let payload = EntryPayload::GateTransition {
            subject_id: SubjectId::new("schema-change-7"),
            from_level: Some(GateLevel::G1),
            to_level: GateLevel::G2,
            status: GateStatus::Passed,
            approvers: vec![Actor::Orchestrator, Actor::RiskSentinel],
        };
        let json = serde_json::to_string(&payload).unwrap();
        let back: EntryPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(payload, back);
    }
}
