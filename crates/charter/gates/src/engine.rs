//! The gate promotion engine.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use tracing::{info, warn};

use charter_ledger::{AppendRequest, InMemoryLedger, LedgerWriter};
use charter_types::{
    Actor, Capability, DiscrepancyClass, EntryCategory, EntryPayload, EvidenceBundle, GateClass,
    GateLevel, GateStatus, SafetyLevelProvider, Severity, SubjectId,
};

use crate::error::GateError;
use crate::record::{GateConfig, GateRecord, SubjectGateView};

/// Domain-separation prefix for frozen subject content.
const CONTENT_DOMAIN: &[u8] = b"charter-gates-content-v1:";

fn content_digest(content: &[u8]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(CONTENT_DOMAIN);
    hasher.update(content);
    *hasher.finalize().as_bytes()
}

fn hex(hash: &[u8; 32]) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

struct SubjectState {
    gate_class: GateClass,
    required_approvers: BTreeSet<Actor>,
    records: BTreeMap<GateLevel, GateRecord>,
    highest_passed: Option<GateLevel>,
    frozen_hash: Option<[u8; 32]>,
    seen_evidence: BTreeSet<String>,
}

impl SubjectState {
    /// The gate the subject would pass next, `None` once fully promoted.
    fn next_eligible(&self) -> Option<GateLevel> {
        match self.highest_passed {
            None => Some(GateLevel::G0),
            Some(level) => level.next(),
        }
    }
}

/// Promotes subjects through gates G0–G4, writing every transition to the
/// ledger in the same critical section as the state change.
///
/// Different subjects advance independently; the engine serializes writes per
/// call, and the current safety level (read through the provider seam)
/// constrains which advancements are legal at all.
pub struct GateEngine {
    ledger: Arc<InMemoryLedger>,
    safety: Arc<dyn SafetyLevelProvider>,
    config: GateConfig,
    subjects: RwLock<HashMap<SubjectId, SubjectState>>,
}

impl GateEngine {
    pub fn new(
        ledger: Arc<InMemoryLedger>,
        safety: Arc<dyn SafetyLevelProvider>,
        config: GateConfig,
    ) -> Self {
        Self {
            ledger,
            safety,
            config,
            subjects: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Register a subject at G0.
    pub fn register_subject(
        &self,
        actor: &Actor,
        subject_id: &SubjectId,
        gate_class: GateClass,
        required_approvers: BTreeSet<Actor>,
    ) -> Result<GateRecord, GateError> {
        if !actor.has_capability(Capability::AdvanceGates) {
            return Err(GateError::Unauthorized {
                subject: subject_id.to_string(),
                actor: actor.to_string(),
                operation: "register subjects".into(),
            });
        }

        let mut subjects = self.write_subjects()?;
        if subjects.contains_key(subject_id) {
            return Err(GateError::AlreadyRegistered(subject_id.to_string()));
        }

        let record = GateRecord {
            subject_id: subject_id.clone(),
            gate_class,
            level: GateLevel::G0,
            status: GateStatus::Pending,
            required_approvers: required_approvers.clone(),
            approvers_signed: BTreeSet::new(),
            entered_at: Utc::now(),
            exited_at: None,
            evidence: EvidenceBundle::default(),
            content_hash: None,
        };

        let mut records = BTreeMap::new();
        records.insert(GateLevel::G0, record.clone());
        subjects.insert(
            subject_id.clone(),
            SubjectState {
                gate_class,
                required_approvers,
                records,
                highest_passed: None,
                frozen_hash: None,
                seen_evidence: BTreeSet::new(),
            },
        );

        self.log_transition(
            actor,
            subject_id,
            None,
            GateLevel::G0,
            GateStatus::Pending,
            &BTreeSet::new(),
            Severity::Info,
        )?;

        info!(subject = %subject_id, class = ?gate_class, "subject registered at G0");
        Ok(record)
    }

    /// Promote a subject through `target`.
    ///
    /// `content` must be supplied when the promotion first reaches the freeze
    /// gate; it is hashed and frozen there. Re-entering a gate that already
    /// passed demands an evidence bundle composed entirely of references the
    /// subject has never used before.
    pub fn advance_gate(
        &self,
        actor: &Actor,
        subject_id: &SubjectId,
        target: GateLevel,
        approvers: &BTreeSet<Actor>,
        evidence: EvidenceBundle,
        content: Option<&[u8]>,
    ) -> Result<GateRecord, GateError> {
        if !actor.has_capability(Capability::AdvanceGates) {
            return Err(GateError::Unauthorized {
                subject: subject_id.to_string(),
                actor: actor.to_string(),
                operation: "advance gates".into(),
            });
        }

        let mut subjects = self.write_subjects()?;
        let state = subjects
            .get_mut(subject_id)
            .ok_or_else(|| GateError::UnknownSubject(subject_id.to_string()))?;

        let level = self.safety.current_level();
        let freeze_at = match state.gate_class {
            GateClass::Standard => self.config.standard_freeze_at,
            GateClass::Emergency => self.config.emergency_freeze_at,
        };
        if level >= freeze_at {
            return Err(GateError::SafetyHold {
                subject: subject_id.to_string(),
                level,
            });
        }

        let next_eligible = state.next_eligible();
        let reentry = state
            .records
            .get(&target)
            .map(|record| {
                matches!(record.status, GateStatus::Passed | GateStatus::Bypassed)
            })
            .unwrap_or(false);

        if !reentry {
            let expected = next_eligible.ok_or_else(|| GateError::Validation {
                subject: subject_id.to_string(),
                reason: "subject is already fully promoted".into(),
            })?;
            if target != expected {
                return Err(GateError::Sequence {
                    subject: subject_id.to_string(),
                    requested: target,
                    expected,
                });
            }
        }

        let missing: Vec<_> = state
            .required_approvers
            .difference(approvers)
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(GateError::MissingApprovers {
                subject: subject_id.to_string(),
                missing: missing
                    .iter()
                    .map(Actor::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        if evidence.is_empty() {
            return Err(GateError::Validation {
                subject: subject_id.to_string(),
                reason: "an evidence bundle is required to pass a gate".into(),
            });
        }
        if reentry {
            let stale: Vec<_> = evidence
                .references
                .iter()
                .filter(|reference| state.seen_evidence.contains(*reference))
                .cloned()
                .collect();
            if !stale.is_empty() {
                return Err(GateError::Validation {
                    subject: subject_id.to_string(),
                    reason: format!(
                        "re-entry to a passed gate requires a fresh evidence bundle; already used: {}",
                        stale.join(", ")
                    ),
                });
            }
        }

        if target >= self.config.freeze_level && state.frozen_hash.is_none() {
            let content = content.ok_or_else(|| GateError::Validation {
                subject: subject_id.to_string(),
                reason: format!(
                    "subject content is required to freeze at {}",
                    self.config.freeze_level
                ),
            })?;
            state.frozen_hash = Some(content_digest(content));
            info!(subject = %subject_id, gate = %target, "subject content frozen");
        }

        let now = Utc::now();
        let record = GateRecord {
            subject_id: subject_id.clone(),
            gate_class: state.gate_class,
            level: target,
            status: GateStatus::Passed,
            required_approvers: state.required_approvers.clone(),
            approvers_signed: approvers.clone(),
            entered_at: now,
            exited_at: Some(now),
            evidence: evidence.clone(),
            content_hash: state.frozen_hash.as_ref().map(hex),
        };

        let from_level = state.highest_passed;
        state.records.insert(target, record.clone());
        if state.highest_passed.map_or(true, |passed| target > passed) {
            state.highest_passed = Some(target);
        }
        state
            .seen_evidence
            .extend(evidence.references.iter().cloned());

        self.log_transition(
            actor,
            subject_id,
            from_level,
            target,
            GateStatus::Passed,
            approvers,
            Severity::Info,
        )?;

        info!(subject = %subject_id, gate = %target, "gate passed");
        Ok(record)
    }

    /// Regress the subject's in-progress gate to Failed or Blocked.
    ///
    /// Allowed at any stage; previously passed gates are left standing.
    pub fn regress_gate(
        &self,
        actor: &Actor,
        subject_id: &SubjectId,
        status: GateStatus,
        reason: &str,
    ) -> Result<GateRecord, GateError> {
        if !matches!(status, GateStatus::Failed | GateStatus::Blocked) {
            return Err(GateError::Validation {
                subject: subject_id.to_string(),
                reason: "regression status must be Failed or Blocked".into(),
            });
        }
        if !actor.has_capability(Capability::AdvanceGates) {
            return Err(GateError::Unauthorized {
                subject: subject_id.to_string(),
                actor: actor.to_string(),
                operation: "regress gates".into(),
            });
        }

        let mut subjects = self.write_subjects()?;
        let state = subjects
            .get_mut(subject_id)
            .ok_or_else(|| GateError::UnknownSubject(subject_id.to_string()))?;

        let at = state.next_eligible().ok_or_else(|| GateError::Validation {
            subject: subject_id.to_string(),
            reason: "subject is already fully promoted".into(),
        })?;

        let now = Utc::now();
        let record = GateRecord {
            subject_id: subject_id.clone(),
            gate_class: state.gate_class,
            level: at,
            status,
            required_approvers: state.required_approvers.clone(),
            approvers_signed: BTreeSet::new(),
            entered_at: now,
            exited_at: Some(now),
            evidence: EvidenceBundle::default().with_summary(reason),
            content_hash: state.frozen_hash.as_ref().map(hex),
        };
        state.records.insert(at, record.clone());

        self.log_transition(
            actor,
            subject_id,
            state.highest_passed,
            at,
            status,
            &BTreeSet::new(),
            Severity::Warning,
        )?;

        warn!(subject = %subject_id, gate = %at, ?status, reason, "gate regressed");
        Ok(record)
    }

    /// Set a passed gate aside under explicit elevated authority.
    pub fn bypass_gate(
        &self,
        actor: &Actor,
        subject_id: &SubjectId,
        level: GateLevel,
        authority: &str,
    ) -> Result<GateRecord, GateError> {
        if !actor.has_capability(Capability::BypassGates) || authority.trim().is_empty() {
            return Err(GateError::Unauthorized {
                subject: subject_id.to_string(),
                actor: actor.to_string(),
                operation: "bypass gates".into(),
            });
        }

        let mut subjects = self.write_subjects()?;
        let state = subjects
            .get_mut(subject_id)
            .ok_or_else(|| GateError::UnknownSubject(subject_id.to_string()))?;

        let record = state
            .records
            .get_mut(&level)
            .ok_or_else(|| GateError::Validation {
                subject: subject_id.to_string(),
                reason: format!("no record at gate {level}"),
            })?;
        if record.status != GateStatus::Passed {
            return Err(GateError::Validation {
                subject: subject_id.to_string(),
                reason: format!("only a passed gate can be bypassed, {level} is {:?}", record.status),
            });
        }

        record.status = GateStatus::Bypassed;
        let snapshot = record.clone();

        self.log_transition(
            actor,
            subject_id,
            Some(level),
            level,
            GateStatus::Bypassed,
            &BTreeSet::new(),
            Severity::Warning,
        )?;

        warn!(subject = %subject_id, gate = %level, authority, "gate bypassed");
        Ok(snapshot)
    }

    /// Recompute the subject's content hash against the frozen value.
    ///
    /// Divergence is a constitutional violation: a discrepancy-class-A entry
    /// is appended before the error is returned.
    pub fn verify_freeze(
        &self,
        subject_id: &SubjectId,
        current_content: &[u8],
    ) -> Result<(), GateError> {
        let frozen = {
            let subjects = self.read_subjects()?;
            let state = subjects
                .get(subject_id)
                .ok_or_else(|| GateError::UnknownSubject(subject_id.to_string()))?;
            state.frozen_hash.ok_or_else(|| GateError::Validation {
                subject: subject_id.to_string(),
                reason: "subject content has not been frozen yet".into(),
            })?
        };

        let recomputed = content_digest(current_content);
        if recomputed == frozen {
            return Ok(());
        }

        let detail = format!(
            "frozen content hash mismatch: frozen {}, recomputed {}",
            hex(&frozen),
            hex(&recomputed)
        );
        let request = AppendRequest::new(
            EntryCategory::Integrity,
            Actor::ComplianceAuditor,
            "freeze.mismatch",
            subject_id.to_string(),
            EntryPayload::IntegrityFinding {
                chain_id: None,
                subject_id: Some(subject_id.clone()),
                first_break_position: None,
                detail: detail.clone(),
            },
        )
        .with_severity(Severity::Critical)
        .with_discrepancy_class(DiscrepancyClass::A);
        self.ledger.append(&self.config.chain, request)?;

        warn!(subject = %subject_id, "frozen content diverged");
        Err(GateError::ConstitutionalViolation {
            subject: subject_id.to_string(),
            reason: detail,
        })
    }

    /// Dashboard view of one subject.
    pub fn view(&self, subject_id: &SubjectId) -> Result<SubjectGateView, GateError> {
        let subjects = self.read_subjects()?;
        let state = subjects
            .get(subject_id)
            .ok_or_else(|| GateError::UnknownSubject(subject_id.to_string()))?;

        let (active_level, active_status) = match state.next_eligible() {
            Some(next) => match state.records.get(&next) {
                Some(record) => (next, record.status),
                None => (next, GateStatus::Pending),
            },
            None => {
                let status = state
                    .records
                    .get(&GateLevel::FINAL)
                    .map(|record| record.status)
                    .unwrap_or(GateStatus::Passed);
                (GateLevel::FINAL, status)
            }
        };

        Ok(SubjectGateView {
            subject_id: subject_id.clone(),
            gate_class: state.gate_class,
            highest_passed: state.highest_passed,
            active_level,
            active_status,
            frozen: state.frozen_hash.is_some(),
        })
    }

    pub fn subjects(&self) -> Result<Vec<SubjectId>, GateError> {
        let subjects = self.read_subjects()?;
        let mut ids: Vec<_> = subjects.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    pub fn record(
        &self,
        subject_id: &SubjectId,
        level: GateLevel,
    ) -> Result<Option<GateRecord>, GateError> {
        let subjects = self.read_subjects()?;
        Ok(subjects
            .get(subject_id)
            .and_then(|state| state.records.get(&level).cloned()))
    }

    #[allow(clippy::too_many_arguments)]
    fn log_transition(
        &self,
        actor: &Actor,
        subject_id: &SubjectId,
        from_level: Option<GateLevel>,
        to_level: GateLevel,
        status: GateStatus,
        approvers: &BTreeSet<Actor>,
        severity: Severity,
    ) -> Result<(), GateError> {
        let request = AppendRequest::new(
            EntryCategory::Governance,
            actor.clone(),
            "gate.transition",
            subject_id.to_string(),
            EntryPayload::GateTransition {
                subject_id: subject_id.clone(),
                from_level,
                to_level,
                status,
                approvers: approvers.iter().cloned().collect(),
            },
        )
        .with_severity(severity);
        self.ledger.append(&self.config.chain, request)?;
        Ok(())
    }

    fn read_subjects(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<SubjectId, SubjectState>>, GateError> {
        self.subjects
            .read()
            .map_err(|_| GateError::Ledger(charter_ledger::LedgerError::LockPoisoned))
    }

    fn write_subjects(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<SubjectId, SubjectState>>, GateError> {
        self.subjects
            .write()
            .map_err(|_| GateError::Ledger(charter_ledger::LedgerError::LockPoisoned))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::RwLock as StdRwLock;

    use charter_ledger::LedgerReader;
    use charter_types::SafetyLevel;

    use super::*;

    struct StaticSafety(StdRwLock<SafetyLevel>);

    impl StaticSafety {
        fn at(level: SafetyLevel) -> Arc<Self> {
            Arc::new(Self(StdRwLock::new(level)))
        }

        fn set(&self, level: SafetyLevel) {
            *self.0.write().unwrap() = level;
        }
    }

    impl SafetyLevelProvider for StaticSafety {
        fn current_level(&self) -> SafetyLevel {
            *self.0.read().unwrap()
        }
    }

    fn engine_at(level: SafetyLevel) -> (GateEngine, Arc<InMemoryLedger>, Arc<StaticSafety>) {
        let ledger = Arc::new(InMemoryLedger::default());
        let safety = StaticSafety::at(level);
        let engine = GateEngine::new(Arc::clone(&ledger), safety.clone(), GateConfig::default());
        (engine, ledger, safety)
    }

    fn subject() -> SubjectId {
        SubjectId::new("schema-change-7")
    }

    fn approvers() -> BTreeSet<Actor> {
        [Actor::Orchestrator, Actor::RiskSentinel]
            .into_iter()
            .collect()
    }

    fn evidence(reference: &str) -> EvidenceBundle {
        EvidenceBundle::from_references(vec![reference.into()])
    }

    fn register(engine: &GateEngine) {
        engine
            .register_subject(
                &Actor::Orchestrator,
                &subject(),
                GateClass::Standard,
                approvers(),
            )
            .unwrap();
    }

    fn advance(engine: &GateEngine, target: GateLevel, reference: &str) -> Result<GateRecord, GateError> {
        engine.advance_gate(
            &Actor::Orchestrator,
            &subject(),
            target,
            &approvers(),
            evidence(reference),
            Some(b"subject content v1"),
        )
    }

    #[test]
    fn promotion_walks_gates_in_order() {
        let (engine, ledger, _) = engine_at(SafetyLevel::Green);
        register(&engine);

        for (target, reference) in [
            (GateLevel::G0, "obj://e0"),
            (GateLevel::G1, "obj://e1"),
            (GateLevel::G2, "obj://e2"),
            (GateLevel::G3, "obj://e3"),
            (GateLevel::G4, "obj://e4"),
        ] {
            let record = advance(&engine, target, reference).unwrap();
            assert_eq!(record.status, GateStatus::Passed);
        }

        let view = engine.view(&subject()).unwrap();
        assert_eq!(view.highest_passed, Some(GateLevel::G4));
        assert!(view.frozen);

        // Registration + five passes, all on the governance chain.
        let entries = ledger.read_all(&GateConfig::default().chain).unwrap();
        assert_eq!(entries.len(), 6);
    }

    #[test]
    fn skipping_a_gate_fails_with_sequence_error() {
        let (engine, _, _) = engine_at(SafetyLevel::Green);
        register(&engine);
        advance(&engine, GateLevel::G0, "obj://e0").unwrap();

        let error = advance(&engine, GateLevel::G2, "obj://skip").unwrap_err();
        assert!(matches!(
            error,
            GateError::Sequence {
                requested: GateLevel::G2,
                expected: GateLevel::G1,
                ..
            }
        ));
    }

    #[test]
    fn missing_approver_blocks_promotion() {
        let (engine, _, _) = engine_at(SafetyLevel::Green);
        register(&engine);

        let partial: BTreeSet<Actor> = [Actor::Orchestrator].into_iter().collect();
        let error = engine
            .advance_gate(
                &Actor::Orchestrator,
                &subject(),
                GateLevel::G0,
                &partial,
                evidence("obj://e0"),
                None,
            )
            .unwrap_err();
        assert!(matches!(error, GateError::MissingApprovers { .. }));
    }

    #[test]
    fn empty_evidence_blocks_promotion() {
        let (engine, _, _) = engine_at(SafetyLevel::Green);
        register(&engine);

        let error = engine
            .advance_gate(
                &Actor::Orchestrator,
                &subject(),
                GateLevel::G0,
                &approvers(),
                EvidenceBundle::default(),
                None,
            )
            .unwrap_err();
        assert!(matches!(error, GateError::Validation { .. }));
    }

    #[test]
    fn orange_freezes_standard_subjects() {
        let (engine, _, safety) = engine_at(SafetyLevel::Green);
        register(&engine);
        advance(&engine, GateLevel::G0, "obj://e0").unwrap();

        safety.set(SafetyLevel::Orange);
        let error = advance(&engine, GateLevel::G1, "obj://e1").unwrap_err();
        assert!(matches!(
            error,
            GateError::SafetyHold {
                level: SafetyLevel::Orange,
                ..
            }
        ));
    }

    #[test]
    fn emergency_subjects_advance_until_black() {
        let (engine, _, safety) = engine_at(SafetyLevel::Red);
        engine
            .register_subject(
                &Actor::Orchestrator,
                &subject(),
                GateClass::Emergency,
                approvers(),
            )
            .unwrap();

        advance(&engine, GateLevel::G0, "obj://e0").unwrap();

        safety.set(SafetyLevel::Black);
        let error = advance(&engine, GateLevel::G1, "obj://e1").unwrap_err();
        assert!(matches!(error, GateError::SafetyHold { .. }));
    }

    #[test]
    fn content_freezes_on_first_entry_to_g2() {
        let (engine, _, _) = engine_at(SafetyLevel::Green);
        register(&engine);
        advance(&engine, GateLevel::G0, "obj://e0").unwrap();
        let record = advance(&engine, GateLevel::G1, "obj://e1").unwrap();
        assert!(record.content_hash.is_none());

        let record = advance(&engine, GateLevel::G2, "obj://e2").unwrap();
        assert!(record.content_hash.is_some());

        engine
            .verify_freeze(&subject(), b"subject content v1")
            .unwrap();
    }

    #[test]
    fn freeze_requires_content_at_g2() {
        let (engine, _, _) = engine_at(SafetyLevel::Green);
        register(&engine);
        advance(&engine, GateLevel::G0, "obj://e0").unwrap();
        advance(&engine, GateLevel::G1, "obj://e1").unwrap();

        let error = engine
            .advance_gate(
                &Actor::Orchestrator,
                &subject(),
                GateLevel::G2,
                &approvers(),
                evidence("obj://e2"),
                None,
            )
            .unwrap_err();
        assert!(matches!(error, GateError::Validation { .. }));
    }

    #[test]
    fn diverged_content_is_a_constitutional_violation_and_logged_class_a() {
        let (engine, ledger, _) = engine_at(SafetyLevel::Green);
        register(&engine);
        advance(&engine, GateLevel::G0, "obj://e0").unwrap();
        advance(&engine, GateLevel::G1, "obj://e1").unwrap();
        advance(&engine, GateLevel::G2, "obj://e2").unwrap();

        let error = engine
            .verify_freeze(&subject(), b"subject content v2 (tampered)")
            .unwrap_err();
        assert!(matches!(error, GateError::ConstitutionalViolation { .. }));

        let entries = ledger.read_all(&GateConfig::default().chain).unwrap();
        let finding = entries.last().unwrap();
        assert_eq!(finding.discrepancy_class, DiscrepancyClass::A);
        assert_eq!(finding.severity, Severity::Critical);
        assert!(matches!(
            finding.payload,
            EntryPayload::IntegrityFinding { .. }
        ));
    }

    #[test]
    fn reentry_to_a_passed_gate_requires_fresh_evidence() {
        let (engine, _, _) = engine_at(SafetyLevel::Green);
        register(&engine);
        advance(&engine, GateLevel::G0, "obj://e0").unwrap();
        advance(&engine, GateLevel::G1, "obj://e1").unwrap();

        // Re-running G1 with the evidence already on file is refused.
        let error = advance(&engine, GateLevel::G1, "obj://e1").unwrap_err();
        assert!(matches!(error, GateError::Validation { .. }));

        // A fresh bundle is accepted.
        advance(&engine, GateLevel::G1, "obj://e1-rerun").unwrap();
    }

    #[test]
    fn regression_leaves_passed_gates_standing() {
        let (engine, _, _) = engine_at(SafetyLevel::Green);
        register(&engine);
        advance(&engine, GateLevel::G0, "obj://e0").unwrap();
        advance(&engine, GateLevel::G1, "obj://e1").unwrap();

        engine
            .regress_gate(
                &Actor::Orchestrator,
                &subject(),
                GateStatus::Failed,
                "load test regression",
            )
            .unwrap();

        let view = engine.view(&subject()).unwrap();
        assert_eq!(view.highest_passed, Some(GateLevel::G1));
        assert_eq!(view.active_level, GateLevel::G2);
        assert_eq!(view.active_status, GateStatus::Failed);

        // The failed gate can be retried in order.
        advance(&engine, GateLevel::G2, "obj://e2-retry").unwrap();
    }

    #[test]
    fn bypass_needs_elevated_authority() {
        let (engine, _, _) = engine_at(SafetyLevel::Green);
        register(&engine);
        advance(&engine, GateLevel::G0, "obj://e0").unwrap();

        let error = engine
            .bypass_gate(
                &Actor::Orchestrator,
                &subject(),
                GateLevel::G0,
                "mandate://x",
            )
            .unwrap_err();
        assert!(matches!(error, GateError::Unauthorized { .. }));

        let record = engine
            .bypass_gate(
                &Actor::Custodian,
                &subject(),
                GateLevel::G0,
                "mandate://board/22",
            )
            .unwrap();
        assert_eq!(record.status, GateStatus::Bypassed);
    }

    #[test]
    fn unknown_subject_is_reported_by_id() {
        let (engine, _, _) = engine_at(SafetyLevel::Green);
        let error = advance(&engine, GateLevel::G0, "obj://e0").unwrap_err();
        assert!(matches!(error, GateError::UnknownSubject(id) if id == "schema-change-7"));
    }
}
