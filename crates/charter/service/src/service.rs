//! The control-plane facade and its async boundary.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use charter_attestation::{Attestation, CertificationRegistry};
use charter_escalation::{EscalationEngine, TransitionOutcome};
use charter_gates::{GateEngine, GateRecord};
use charter_ledger::{
    AppendRequest, ChainVerifier, EntryRef, InMemoryLedger, IntegrityReport, LedgerWriter,
};
use charter_retest::{CycleObservation, RetestValidator};
use charter_types::{
    Actor, AuthorizationMethod, Capability, ChainId, CycleResult, DiscrepancyClass, EntryCategory,
    EntryPayload, EvidenceBundle, FailureModeId, GateLevel, KillSwitchScope, SafetyLevel, Severity,
    Signature, SubjectId,
};

use crate::config::CharterConfig;
use crate::error::ServiceError;

/// The logical service boundary of the control plane.
///
/// Implementations never expose partial state: each operation either fully
/// commits (state change plus its documenting ledger entry) or fails with
/// the offending id and rule.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn append(
        &self,
        chain: ChainId,
        request: AppendRequest,
    ) -> Result<EntryRef, ServiceError>;

    async fn verify_chain(
        &self,
        chain: ChainId,
        limit: Option<usize>,
    ) -> Result<IntegrityReport, ServiceError>;

    async fn advance_gate(
        &self,
        actor: Actor,
        subject: SubjectId,
        target: GateLevel,
        approvers: BTreeSet<Actor>,
        evidence: EvidenceBundle,
        content: Option<Vec<u8>>,
    ) -> Result<GateRecord, ServiceError>;

    async fn issue_attestation(
        &self,
        actor: Actor,
        subject: SubjectId,
        version: String,
        gate: u8,
        evidence: EvidenceBundle,
        signature: Signature,
    ) -> Result<Attestation, ServiceError>;

    async fn evaluate_thresholds(&self) -> Result<(SafetyLevel, bool), ServiceError>;

    async fn transition_safety_level(
        &self,
        actor: Actor,
        to: SafetyLevel,
        reason: String,
        evidence: EvidenceBundle,
        method: AuthorizationMethod,
    ) -> Result<TransitionOutcome, ServiceError>;

    async fn record_retest_cycle(
        &self,
        actor: Actor,
        failure_mode: FailureModeId,
        observation: CycleObservation,
    ) -> Result<CycleResult, ServiceError>;

    async fn try_close_failure_mode(
        &self,
        actor: Actor,
        failure_mode: FailureModeId,
    ) -> Result<bool, ServiceError>;
}

/// Wires one shared ledger through every engine and enforces actor
/// capabilities and kill-switch halts ahead of the writes.
pub struct CharterService {
    config: CharterConfig,
    ledger: Arc<InMemoryLedger>,
    escalation: Arc<EscalationEngine>,
    gates: GateEngine,
    certifications: CertificationRegistry,
    retests: RetestValidator,
}

impl CharterService {
    pub fn new(config: CharterConfig) -> Self {
        let ledger = Arc::new(InMemoryLedger::new(config.ledger.clone()));
        let escalation = Arc::new(EscalationEngine::new(
            Arc::clone(&ledger),
            config.escalation.clone(),
        ));
        let gates = GateEngine::new(
            Arc::clone(&ledger),
            escalation.clone(),
            config.gates.clone(),
        );
        let certifications =
            CertificationRegistry::new(Arc::clone(&ledger), config.certification.clone());
        let retests = RetestValidator::new(Arc::clone(&ledger), config.retest.clone());
        Self {
            config,
            ledger,
            escalation,
            gates,
            certifications,
            retests,
        }
    }

    pub fn config(&self) -> &CharterConfig {
        &self.config
    }

    pub fn ledger(&self) -> &Arc<InMemoryLedger> {
        &self.ledger
    }

    pub fn escalation(&self) -> &Arc<EscalationEngine> {
        &self.escalation
    }

    pub fn gates(&self) -> &GateEngine {
        &self.gates
    }

    pub fn certifications(&self) -> &CertificationRegistry {
        &self.certifications
    }

    pub fn retests(&self) -> &RetestValidator {
        &self.retests
    }

    fn ensure_not_halted(
        &self,
        scope: &KillSwitchScope,
        operation: &str,
    ) -> Result<(), ServiceError> {
        let blocked = self.escalation.kill_switches().blocks(scope)?;
        if blocked {
            warn!(operation, "operation halted by a triggered kill-switch");
            return Err(ServiceError::Halted {
                operation: operation.to_string(),
            });
        }
        Ok(())
    }

    /// A broken chain that an active gate or certification relies on is a
    /// constitutional finding, recorded as a class-A entry.
    fn record_broken_referenced_chain(
        &self,
        report: &IntegrityReport,
    ) -> Result<(), ServiceError> {
        let gates_active =
            report.chain_id == self.gates.config().chain && !self.gates.subjects()?.is_empty();
        let certifications_active = report.chain_id == self.certifications.config().chain
            && !self.certifications.tracks()?.is_empty();
        if !gates_active && !certifications_active {
            return Ok(());
        }

        let request = AppendRequest::new(
            EntryCategory::Integrity,
            Actor::ComplianceAuditor,
            "chain.broken",
            report.chain_id.to_string(),
            EntryPayload::IntegrityFinding {
                chain_id: Some(report.chain_id.clone()),
                subject_id: None,
                first_break_position: report.first_break_position,
                detail: format!(
                    "chain {} is broken: {} of {} entries invalid",
                    report.chain_id, report.broken_links, report.total_entries
                ),
            },
        )
        .with_severity(Severity::Critical)
        .with_discrepancy_class(DiscrepancyClass::A);
        self.ledger.append(&self.config.integrity_chain, request)?;
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for CharterService {
    async fn append(
        &self,
        chain: ChainId,
        request: AppendRequest,
    ) -> Result<EntryRef, ServiceError> {
        if !request.actor.has_capability(Capability::AppendEntries) {
            return Err(ServiceError::Unauthorized {
                actor: request.actor.to_string(),
                operation: format!("append to chain {chain}"),
            });
        }
        if request.category == EntryCategory::Operational {
            self.ensure_not_halted(&KillSwitchScope::Global, "operational append")?;
            self.ensure_not_halted(
                &KillSwitchScope::Asset(request.target.clone()),
                "operational append",
            )?;
        }
        Ok(self.ledger.append(&chain, request)?)
    }

    async fn verify_chain(
        &self,
        chain: ChainId,
        limit: Option<usize>,
    ) -> Result<IntegrityReport, ServiceError> {
        let report = ChainVerifier::verify_chain(self.ledger.as_ref(), &chain, limit)?;
        if report.is_broken() {
            self.record_broken_referenced_chain(&report)?;
        }
        Ok(report)
    }

    async fn advance_gate(
        &self,
        actor: Actor,
        subject: SubjectId,
        target: GateLevel,
        approvers: BTreeSet<Actor>,
        evidence: EvidenceBundle,
        content: Option<Vec<u8>>,
    ) -> Result<GateRecord, ServiceError> {
        self.ensure_not_halted(&KillSwitchScope::Global, "gate advancement")?;
        self.ensure_not_halted(
            &KillSwitchScope::Subject(subject.clone()),
            "gate advancement",
        )?;
        Ok(self.gates.advance_gate(
            &actor,
            &subject,
            target,
            &approvers,
            evidence,
            content.as_deref(),
        )?)
    }

    async fn issue_attestation(
        &self,
        actor: Actor,
        subject: SubjectId,
        version: String,
        gate: u8,
        evidence: EvidenceBundle,
        signature: Signature,
    ) -> Result<Attestation, ServiceError> {
        self.ensure_not_halted(&KillSwitchScope::Global, "attestation issuance")?;
        self.ensure_not_halted(
            &KillSwitchScope::Subject(subject.clone()),
            "attestation issuance",
        )?;
        Ok(self.certifications.issue_attestation(
            &actor,
            &subject,
            &version,
            gate,
            evidence,
            signature,
        )?)
    }

    async fn evaluate_thresholds(&self) -> Result<(SafetyLevel, bool), ServiceError> {
        Ok(self.escalation.evaluate_thresholds()?)
    }

    async fn transition_safety_level(
        &self,
        actor: Actor,
        to: SafetyLevel,
        reason: String,
        evidence: EvidenceBundle,
        method: AuthorizationMethod,
    ) -> Result<TransitionOutcome, ServiceError> {
        Ok(self
            .escalation
            .transition(&actor, to, &reason, evidence, method)?)
    }

    async fn record_retest_cycle(
        &self,
        actor: Actor,
        failure_mode: FailureModeId,
        observation: CycleObservation,
    ) -> Result<CycleResult, ServiceError> {
        Ok(self.retests.record_cycle(&actor, &failure_mode, observation)?)
    }

    async fn try_close_failure_mode(
        &self,
        actor: Actor,
        failure_mode: FailureModeId,
    ) -> Result<bool, ServiceError> {
        Ok(self.retests.try_close(&actor, &failure_mode)?)
    }
}
