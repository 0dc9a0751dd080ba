//! The certification registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use charter_ledger::{AppendRequest, EntryRef, InMemoryLedger, LedgerError, LedgerWriter};
use charter_types::{
    Actor, Capability, CertificationStatus, ChainId, EntryCategory, EntryPayload, EvidenceBundle,
    Severity, Signature, SubjectId,
};

use crate::error::AttestationError;

/// Registry configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CertificationConfig {
    /// Number of gates in the lifecycle; the last one yields
    /// `FULLY_CERTIFIED`.
    pub gate_count: u8,
    /// Chain that receives certification ledger entries.
    pub chain: ChainId,
}

impl Default for CertificationConfig {
    fn default() -> Self {
        Self {
            gate_count: 6,
            chain: ChainId::new("certification"),
        }
    }
}

/// One recorded gate issuance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateIssuance {
    pub gate: u8,
    pub issued_at: DateTime<Utc>,
    pub evidence: EvidenceBundle,
    pub signature: Signature,
    pub ledger_ref: EntryRef,
}

/// A signed, gate-staged approval returned from each issuance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    pub subject_id: SubjectId,
    pub version: String,
    pub attestation_type: String,
    pub gate: u8,
    pub status: CertificationStatus,
    pub signature: Signature,
    pub evidence: EvidenceBundle,
    /// The ledger entry that recorded this issuance.
    pub ledger_ref: EntryRef,
    pub issued_at: DateTime<Utc>,
}

/// The full lifecycle state of one (subject, version) certification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CertificationTrack {
    pub subject_id: SubjectId,
    pub version: String,
    pub attestation_type: String,
    pub status: CertificationStatus,
    pub issuances: BTreeMap<u8, GateIssuance>,
    pub suspended_reason: Option<String>,
    pub opened_at: DateTime<Utc>,
}

impl CertificationTrack {
    /// Status implied by the recorded issuances alone.
    fn progressed_status(&self, gate_count: u8) -> CertificationStatus {
        match self.issuances.keys().max() {
            None => CertificationStatus::Pending,
            Some(&gate) if gate == gate_count => CertificationStatus::FullyCertified,
            Some(&gate) => CertificationStatus::GateApproved(gate),
        }
    }
}

/// N-gate certification lifecycle keyed by (subject, version).
///
/// Issuances are strictly ordered: recording gate `n` demands every gate
/// below it on file. Suspension arrives from the escalation path at any
/// point and halts further issuance until reinstatement.
pub struct CertificationRegistry {
    ledger: Arc<InMemoryLedger>,
    config: CertificationConfig,
    tracks: RwLock<HashMap<(SubjectId, String), CertificationTrack>>,
}

impl CertificationRegistry {
    pub fn new(ledger: Arc<InMemoryLedger>, config: CertificationConfig) -> Self {
        Self {
            ledger,
            config,
            tracks: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CertificationConfig {
        &self.config
    }

    /// Open a track explicitly, naming its attestation type.
    ///
    /// Tracks are otherwise opened implicitly by the first gate issuance with
    /// the default type `model-certification`.
    pub fn open_track(
        &self,
        actor: &Actor,
        subject_id: &SubjectId,
        version: &str,
        attestation_type: &str,
    ) -> Result<CertificationTrack, AttestationError> {
        self.require_capability(actor, subject_id, version, Capability::IssueAttestations, "open certification tracks")?;

        let mut tracks = self.write_tracks()?;
        let key = (subject_id.clone(), version.to_string());
        if tracks.contains_key(&key) {
            return Err(AttestationError::Validation {
                subject: subject_id.to_string(),
                version: version.to_string(),
                reason: "certification track already exists".into(),
            });
        }

        let track = CertificationTrack {
            subject_id: subject_id.clone(),
            version: version.to_string(),
            attestation_type: attestation_type.to_string(),
            status: CertificationStatus::Pending,
            issuances: BTreeMap::new(),
            suspended_reason: None,
            opened_at: Utc::now(),
        };
        tracks.insert(key, track.clone());

        info!(subject = %subject_id, version, attestation_type, "certification track opened");
        Ok(track)
    }

    /// Record one gate issuance and return the resulting attestation.
    pub fn issue_attestation(
        &self,
        actor: &Actor,
        subject_id: &SubjectId,
        version: &str,
        gate: u8,
        evidence: EvidenceBundle,
        signature: Signature,
    ) -> Result<Attestation, AttestationError> {
        self.require_capability(actor, subject_id, version, Capability::IssueAttestations, "issue attestations")?;

        if gate == 0 || gate > self.config.gate_count {
            return Err(AttestationError::Validation {
                subject: subject_id.to_string(),
                version: version.to_string(),
                reason: format!(
                    "gate {gate} is outside the lifecycle 1..={}",
                    self.config.gate_count
                ),
            });
        }

        let mut tracks = self.write_tracks()?;
        let key = (subject_id.clone(), version.to_string());
        if !tracks.contains_key(&key) {
            if gate != 1 {
                return Err(AttestationError::Sequence {
                    subject: subject_id.to_string(),
                    version: version.to_string(),
                    gate,
                    missing: (1..gate)
                        .map(|g| g.to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                });
            }
            tracks.insert(
                key.clone(),
                CertificationTrack {
                    subject_id: subject_id.clone(),
                    version: version.to_string(),
                    attestation_type: "model-certification".into(),
                    status: CertificationStatus::Pending,
                    issuances: BTreeMap::new(),
                    suspended_reason: None,
                    opened_at: Utc::now(),
                },
            );
        }
        let track = tracks
            .get_mut(&key)
            .ok_or_else(|| AttestationError::UnknownTrack {
                subject: subject_id.to_string(),
                version: version.to_string(),
            })?;

        if let Some(reason) = &track.suspended_reason {
            return Err(AttestationError::Suspended {
                subject: subject_id.to_string(),
                version: version.to_string(),
                reason: reason.clone(),
            });
        }
        if track.issuances.contains_key(&gate) {
            return Err(AttestationError::Duplicate {
                subject: subject_id.to_string(),
                version: version.to_string(),
                gate,
            });
        }

        let missing: Vec<u8> = (1..gate)
            .filter(|g| !track.issuances.contains_key(g))
            .collect();
        if !missing.is_empty() {
            return Err(AttestationError::Sequence {
                subject: subject_id.to_string(),
                version: version.to_string(),
                gate,
                missing: missing
                    .iter()
                    .map(|g| g.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let status = if gate == self.config.gate_count {
            CertificationStatus::FullyCertified
        } else {
            CertificationStatus::GateApproved(gate)
        };

        let ledger_ref = self.log_issuance(
            actor,
            subject_id,
            version,
            Some(gate),
            status,
            Severity::Info,
        )?;

        let issued_at = Utc::now();
        track.issuances.insert(
            gate,
            GateIssuance {
                gate,
                issued_at,
                evidence: evidence.clone(),
                signature: signature.clone(),
                ledger_ref: ledger_ref.clone(),
            },
        );
        track.status = status;

        info!(subject = %subject_id, version, gate, %status, "attestation issued");
        Ok(Attestation {
            subject_id: subject_id.clone(),
            version: version.to_string(),
            attestation_type: track.attestation_type.clone(),
            gate,
            status,
            signature,
            evidence,
            ledger_ref,
            issued_at,
        })
    }

    /// Suspend a certification, independent of its forward gate progress.
    ///
    /// Invoked by the escalation path; further issuance is refused until
    /// reinstatement.
    pub fn suspend(
        &self,
        actor: &Actor,
        subject_id: &SubjectId,
        version: &str,
        reason: &str,
    ) -> Result<CertificationTrack, AttestationError> {
        self.require_capability(actor, subject_id, version, Capability::TransitionSafetyLevel, "suspend certifications")?;

        let mut tracks = self.write_tracks()?;
        let track = tracks
            .get_mut(&(subject_id.clone(), version.to_string()))
            .ok_or_else(|| AttestationError::UnknownTrack {
                subject: subject_id.to_string(),
                version: version.to_string(),
            })?;

        track.status = CertificationStatus::Suspended;
        track.suspended_reason = Some(reason.to_string());

        self.log_issuance(
            actor,
            subject_id,
            version,
            None,
            CertificationStatus::Suspended,
            Severity::Warning,
        )?;

        warn!(subject = %subject_id, version, reason, "certification suspended");
        Ok(track.clone())
    }

    /// Lift a suspension; the track resumes at the status its recorded
    /// issuances imply.
    pub fn reinstate(
        &self,
        actor: &Actor,
        subject_id: &SubjectId,
        version: &str,
    ) -> Result<CertificationTrack, AttestationError> {
        self.require_capability(actor, subject_id, version, Capability::TransitionSafetyLevel, "reinstate certifications")?;

        let mut tracks = self.write_tracks()?;
        let track = tracks
            .get_mut(&(subject_id.clone(), version.to_string()))
            .ok_or_else(|| AttestationError::UnknownTrack {
                subject: subject_id.to_string(),
                version: version.to_string(),
            })?;

        if track.suspended_reason.is_none() {
            return Err(AttestationError::Validation {
                subject: subject_id.to_string(),
                version: version.to_string(),
                reason: "certification is not suspended".into(),
            });
        }

        track.suspended_reason = None;
        track.status = track.progressed_status(self.config.gate_count);

        self.log_issuance(actor, subject_id, version, None, track.status, Severity::Info)?;

        info!(subject = %subject_id, version, status = %track.status, "certification reinstated");
        Ok(track.clone())
    }

    pub fn track(
        &self,
        subject_id: &SubjectId,
        version: &str,
    ) -> Result<Option<CertificationTrack>, AttestationError> {
        let tracks = self.read_tracks()?;
        Ok(tracks
            .get(&(subject_id.clone(), version.to_string()))
            .cloned())
    }

    pub fn tracks(&self) -> Result<Vec<CertificationTrack>, AttestationError> {
        let tracks = self.read_tracks()?;
        let mut all: Vec<_> = tracks.values().cloned().collect();
        all.sort_by(|a, b| {
            (&a.subject_id, &a.version).cmp(&(&b.subject_id, &b.version))
        });
        Ok(all)
    }

    fn log_issuance(
        &self,
        actor: &Actor,
        subject_id: &SubjectId,
        version: &str,
        gate: Option<u8>,
        status: CertificationStatus,
        severity: Severity,
    ) -> Result<EntryRef, AttestationError> {
        let request = AppendRequest::new(
            EntryCategory::Certification,
            actor.clone(),
            "certification.update",
            format!("{subject_id}@{version}"),
            EntryPayload::CertificationIssuance {
                subject_id: subject_id.clone(),
                version: version.to_string(),
                gate,
                status,
            },
        )
        .with_severity(severity);
        Ok(self.ledger.append(&self.config.chain, request)?)
    }

    fn require_capability(
        &self,
        actor: &Actor,
        subject_id: &SubjectId,
        version: &str,
        capability: Capability,
        operation: &str,
    ) -> Result<(), AttestationError> {
        if actor.has_capability(capability) {
            Ok(())
        } else {
            Err(AttestationError::Unauthorized {
                subject: subject_id.to_string(),
                version: version.to_string(),
                actor: actor.to_string(),
                operation: operation.to_string(),
            })
        }
    }

    fn read_tracks(
        &self,
    ) -> Result<
        std::sync::RwLockReadGuard<'_, HashMap<(SubjectId, String), CertificationTrack>>,
        AttestationError,
    > {
        self.tracks
            .read()
            .map_err(|_| AttestationError::Ledger(LedgerError::LockPoisoned))
    }

    fn write_tracks(
        &self,
    ) -> Result<
        std::sync::RwLockWriteGuard<'_, HashMap<(SubjectId, String), CertificationTrack>>,
        AttestationError,
    > {
        self.tracks
            .write()
            .map_err(|_| AttestationError::Ledger(LedgerError::LockPoisoned))
    }
}

#[cfg(test)]
mod tests {
    use charter_ledger::LedgerReader;

    use super::*;

    fn registry() -> (CertificationRegistry, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::default());
        let registry =
            CertificationRegistry::new(Arc::clone(&ledger), CertificationConfig::default());
        (registry, ledger)
    }

    fn subject() -> SubjectId {
        SubjectId::new("volatility-model")
    }

    fn signature(n: u8) -> Signature {
        Signature::new(format!("sig-{n:02x}"), "key://certifier/1")
    }

    fn evidence(gate: u8) -> EvidenceBundle {
        EvidenceBundle::from_references(vec![format!("obj://cert-gate-{gate}")])
    }

    fn issue(
        registry: &CertificationRegistry,
        gate: u8,
    ) -> Result<Attestation, AttestationError> {
        registry.issue_attestation(
            &Actor::ComplianceAuditor,
            &subject(),
            "2.1.0",
            gate,
            evidence(gate),
            signature(gate),
        )
    }

    #[test]
    fn gates_map_deterministically_to_statuses() {
        let (registry, _) = registry();

        for gate in 1..=5u8 {
            let attestation = issue(&registry, gate).unwrap();
            assert_eq!(attestation.status, CertificationStatus::GateApproved(gate));
        }
        let final_attestation = issue(&registry, 6).unwrap();
        assert_eq!(
            final_attestation.status,
            CertificationStatus::FullyCertified
        );
    }

    #[test]
    fn skipping_gates_fails_with_sequence_error() {
        let (registry, _) = registry();
        issue(&registry, 1).unwrap();

        let error = issue(&registry, 3).unwrap_err();
        assert!(matches!(
            error,
            AttestationError::Sequence { gate: 3, .. }
        ));
    }

    #[test]
    fn first_gate_on_unknown_track_opens_it() {
        let (registry, _) = registry();
        let attestation = issue(&registry, 1).unwrap();
        assert_eq!(attestation.attestation_type, "model-certification");

        let track = registry.track(&subject(), "2.1.0").unwrap().unwrap();
        assert_eq!(track.status, CertificationStatus::GateApproved(1));
    }

    #[test]
    fn later_gate_on_unknown_track_is_a_sequence_error() {
        let (registry, _) = registry();
        let error = issue(&registry, 2).unwrap_err();
        assert!(matches!(error, AttestationError::Sequence { .. }));
    }

    #[test]
    fn duplicate_issuance_is_rejected() {
        let (registry, _) = registry();
        issue(&registry, 1).unwrap();
        let error = issue(&registry, 1).unwrap_err();
        assert!(matches!(error, AttestationError::Duplicate { gate: 1, .. }));
    }

    #[test]
    fn out_of_range_gate_is_rejected() {
        let (registry, _) = registry();
        assert!(matches!(
            issue(&registry, 0),
            Err(AttestationError::Validation { .. })
        ));
        assert!(matches!(
            issue(&registry, 7),
            Err(AttestationError::Validation { .. })
        ));
    }

    #[test]
    fn every_issuance_lands_on_the_ledger() {
        let (registry, ledger) = registry();
        issue(&registry, 1).unwrap();
        issue(&registry, 2).unwrap();

        let entries = ledger
            .read_all(&CertificationConfig::default().chain)
            .unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries
            .iter()
            .all(|entry| entry.category == EntryCategory::Certification));

        // Back-references point at the recording entries.
        let track = registry.track(&subject(), "2.1.0").unwrap().unwrap();
        assert_eq!(track.issuances[&1].ledger_ref.chain_position, 1);
        assert_eq!(track.issuances[&2].ledger_ref.chain_position, 2);
    }

    #[test]
    fn suspension_halts_issuance_until_reinstated() {
        let (registry, _) = registry();
        issue(&registry, 1).unwrap();
        issue(&registry, 2).unwrap();

        registry
            .suspend(&Actor::RiskSentinel, &subject(), "2.1.0", "drawdown breach")
            .unwrap();

        let error = issue(&registry, 3).unwrap_err();
        assert!(matches!(error, AttestationError::Suspended { .. }));

        let track = registry
            .reinstate(&Actor::RiskSentinel, &subject(), "2.1.0")
            .unwrap();
        assert_eq!(track.status, CertificationStatus::GateApproved(2));

        issue(&registry, 3).unwrap();
    }

    #[test]
    fn suspension_requires_escalation_authority() {
        let (registry, _) = registry();
        issue(&registry, 1).unwrap();

        let error = registry
            .suspend(
                &Actor::ExecutionAgent,
                &subject(),
                "2.1.0",
                "not my call",
            )
            .unwrap_err();
        assert!(matches!(error, AttestationError::Unauthorized { .. }));
    }

    #[test]
    fn issuance_requires_certifier_capability() {
        let (registry, _) = registry();
        let error = registry
            .issue_attestation(
                &Actor::ExecutionAgent,
                &subject(),
                "2.1.0",
                1,
                evidence(1),
                signature(1),
            )
            .unwrap_err();
        assert!(matches!(error, AttestationError::Unauthorized { .. }));
    }
}
