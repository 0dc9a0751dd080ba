//! End-to-end scenarios across the full control plane.

use std::collections::BTreeSet;
use std::sync::Arc;

use charter_ledger::{AppendRequest, ChainStatus, LedgerReader, LedgerWriter};
use charter_retest::{CycleObservation, ReopenTrigger};
use charter_service::{CharterConfig, CharterService, ControlPlane, ProjectionBuilder};
use charter_types::{
    Actor, AuthorizationMethod, CertificationStatus, ChainId, CycleResult, DiscrepancyClass,
    EntryCategory, EntryPayload, EvidenceBundle, FailureModeId, FailureStage, GateClass,
    GateLevel, KillSwitchKind, KillSwitchScope, SafetyLevel, Severity, Signature, SubjectId,
    TransitionType,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

fn service() -> CharterService {
    init_tracing();
    CharterService::new(CharterConfig::default())
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

fn class_b_event(n: usize) -> AppendRequest {
    AppendRequest::new(
        EntryCategory::Operational,
        Actor::ExecutionAgent,
        "observe",
        format!("reconciliation-{n}"),
        EntryPayload::OperationalEvent {
            metric: "reconciliation".into(),
            value: n as f64,
            detail: "position mismatch".into(),
        },
    )
    .with_severity(Severity::Warning)
    .with_discrepancy_class(DiscrepancyClass::B)
}

const PASS: CycleObservation = CycleObservation {
    corrective_mechanism_active: true,
    original_failure_reappeared: false,
    new_failure_introduced: false,
    metrics_improved: true,
};

const FAIL: CycleObservation = CycleObservation {
    corrective_mechanism_active: true,
    original_failure_reappeared: true,
    new_failure_introduced: false,
    metrics_improved: true,
};

#[tokio::test]
async fn a_proposal_is_promoted_certified_and_stays_verifiable() {
    let service = service();

    service
        .gates()
        .register_subject(
            &Actor::Orchestrator,
            &subject(),
            GateClass::Standard,
            approvers(),
        )
        .unwrap();

    for (target, reference) in [
        (GateLevel::G0, "obj://draft-review"),
        (GateLevel::G1, "obj://design-review"),
        (GateLevel::G2, "obj://risk-review"),
        (GateLevel::G3, "obj://staging-run"),
        (GateLevel::G4, "obj://final-signoff"),
    ] {
        let record = service
            .advance_gate(
                Actor::Orchestrator,
                subject(),
                target,
                approvers(),
                evidence(reference),
                Some(b"proposal body v1".to_vec()),
            )
            .await
            .unwrap();
        assert_eq!(record.level, target);
    }

    for gate in 1..=6u8 {
        let attestation = service
            .issue_attestation(
                Actor::ComplianceAuditor,
                subject(),
                "1.0.0".into(),
                gate,
                evidence(&format!("obj://cert-{gate}")),
                Signature::new(format!("sig-{gate}"), "key://certifier/1"),
            )
            .await
            .unwrap();
        if gate == 6 {
            assert_eq!(attestation.status, CertificationStatus::FullyCertified);
        } else {
            assert_eq!(attestation.status, CertificationStatus::GateApproved(gate));
        }
    }

    // Both write chains verify clean end to end.
    for chain in [ChainId::new("governance"), ChainId::new("certification")] {
        let report = service.verify_chain(chain, None).await.unwrap();
        assert_eq!(report.status, ChainStatus::Valid);
        assert_eq!(report.broken_links, 0);
    }

    let dashboard = ProjectionBuilder::dashboard(&service).unwrap();
    assert_eq!(dashboard.safety.level, SafetyLevel::Green);
    assert_eq!(dashboard.gates.len(), 1);
    assert_eq!(dashboard.gates[0].highest_passed, Some(GateLevel::G4));
    assert!(dashboard.gates[0].frozen);
    assert!(dashboard
        .chains
        .iter()
        .all(|chain| chain.status == ChainStatus::Valid));
}

#[tokio::test]
async fn the_fifth_class_b_discrepancy_upgrades_the_safety_level_once() {
    let service = service();
    let chain = ChainId::new("operational");

    for n in 0..4 {
        service.append(chain.clone(), class_b_event(n)).await.unwrap();
    }
    let (level, transitioned) = service.evaluate_thresholds().await.unwrap();
    assert_eq!(level, SafetyLevel::Green);
    assert!(!transitioned);

    service.append(chain.clone(), class_b_event(4)).await.unwrap();
    let (level, transitioned) = service.evaluate_thresholds().await.unwrap();
    assert_eq!(level, SafetyLevel::Yellow);
    assert!(transitioned);

    let current = service.escalation().current().unwrap();
    assert_eq!(current.authorization_method, AuthorizationMethod::Automatic);
    assert_eq!(current.transition_type, TransitionType::Upgrade);

    // Re-evaluating the same breach does not fire again.
    let (level, transitioned) = service.evaluate_thresholds().await.unwrap();
    assert_eq!(level, SafetyLevel::Yellow);
    assert!(!transitioned);
}

#[tokio::test]
async fn a_frozen_content_breach_escalates_and_freezes_standard_gates() {
    let service = service();

    service
        .gates()
        .register_subject(
            &Actor::Orchestrator,
            &subject(),
            GateClass::Standard,
            approvers(),
        )
        .unwrap();
    for (target, reference) in [
        (GateLevel::G0, "obj://e0"),
        (GateLevel::G1, "obj://e1"),
        (GateLevel::G2, "obj://e2"),
    ] {
        service
            .advance_gate(
                Actor::Orchestrator,
                subject(),
                target,
                approvers(),
                evidence(reference),
                Some(b"proposal body v1".to_vec()),
            )
            .await
            .unwrap();
    }

    // The subject's content changes after the freeze.
    let violation = service
        .gates()
        .verify_freeze(&subject(), b"proposal body v2")
        .unwrap_err();
    assert!(matches!(
        violation,
        charter_gates::GateError::ConstitutionalViolation { .. }
    ));

    // The class-A finding drives escalation straight to Red.
    let (level, transitioned) = service.evaluate_thresholds().await.unwrap();
    assert_eq!(level, SafetyLevel::Red);
    assert!(transitioned);

    // Standard gate advancement is now frozen.
    let error = service
        .advance_gate(
            Actor::Orchestrator,
            subject(),
            GateLevel::G3,
            approvers(),
            evidence("obj://e3"),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        charter_service::ServiceError::Gate(charter_gates::GateError::SafetyHold { .. })
    ));
}

#[tokio::test]
async fn a_broken_governance_chain_is_recorded_as_a_class_a_finding() {
    let service = service();

    service
        .gates()
        .register_subject(
            &Actor::Orchestrator,
            &subject(),
            GateClass::Standard,
            approvers(),
        )
        .unwrap();
    service
        .advance_gate(
            Actor::Orchestrator,
            subject(),
            GateLevel::G0,
            approvers(),
            evidence("obj://e0"),
            None,
        )
        .await
        .unwrap();

    // A break-glass redaction leaves the governance chain visibly broken.
    service
        .ledger()
        .break_glass_redact(
            &ChainId::new("governance"),
            1,
            &Actor::Custodian,
            "mandate://board/2026-014",
            "regulator order",
        )
        .unwrap();

    let report = service
        .verify_chain(ChainId::new("governance"), None)
        .await
        .unwrap();
    assert!(report.is_broken());

    let findings = service
        .ledger()
        .read_all(&ChainId::new("integrity"))
        .unwrap();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].discrepancy_class, DiscrepancyClass::A);
    assert!(matches!(
        findings[0].payload,
        EntryPayload::IntegrityFinding { .. }
    ));
}

#[tokio::test]
async fn a_triggered_kill_switch_halts_scoped_operations_until_reset() {
    let service = service();
    let sentinel = Actor::RiskSentinel;
    let panel = service.escalation().kill_switches();

    panel
        .define(
            &sentinel,
            "global-halt",
            KillSwitchKind::Manual,
            KillSwitchScope::Global,
        )
        .unwrap();
    panel.arm(&sentinel, "global-halt").unwrap();
    panel
        .trigger(&sentinel, "global-halt", "incident response drill")
        .unwrap();

    let error = service
        .append(ChainId::new("operational"), class_b_event(0))
        .await
        .unwrap_err();
    assert!(matches!(error, charter_service::ServiceError::Halted { .. }));

    service
        .gates()
        .register_subject(
            &Actor::Orchestrator,
            &subject(),
            GateClass::Standard,
            approvers(),
        )
        .unwrap();
    let error = service
        .advance_gate(
            Actor::Orchestrator,
            subject(),
            GateLevel::G0,
            approvers(),
            evidence("obj://e0"),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(error, charter_service::ServiceError::Halted { .. }));

    panel.reset(&sentinel, "global-halt").unwrap();
    service
        .append(ChainId::new("operational"), class_b_event(0))
        .await
        .unwrap();
}

#[tokio::test]
async fn a_failure_mode_closes_after_seven_passes_and_reopens_on_regression() {
    let service = service();
    let auditor = Actor::ComplianceAuditor;
    let failure_mode = FailureModeId::new("fm-slippage-spike");

    service
        .retests()
        .capture(&auditor, &failure_mode, "fill slippage spike")
        .unwrap();
    for _ in 0..3 {
        service
            .retests()
            .advance_stage(&auditor, &failure_mode)
            .unwrap();
    }

    for n in 0..7 {
        let result = service
            .record_retest_cycle(auditor.clone(), failure_mode.clone(), PASS)
            .await
            .unwrap();
        assert_eq!(result, CycleResult::Pass);
        let closed = service
            .try_close_failure_mode(auditor.clone(), failure_mode.clone())
            .await
            .unwrap();
        assert_eq!(closed, n == 6);
    }

    let result = service
        .record_retest_cycle(auditor.clone(), failure_mode.clone(), FAIL)
        .await
        .unwrap();
    assert_eq!(result, CycleResult::Regression);

    let report = service.retests().report(&failure_mode).unwrap();
    assert_eq!(report.stage, FailureStage::Retest);
    assert_eq!(report.reopen_count, 1);

    // A wrong root cause sends a later closure back to diagnosis.
    for _ in 0..7 {
        service
            .record_retest_cycle(auditor.clone(), failure_mode.clone(), PASS)
            .await
            .unwrap();
    }
    assert!(service
        .try_close_failure_mode(auditor.clone(), failure_mode.clone())
        .await
        .unwrap());
    let mode = service
        .retests()
        .reopen(&auditor, &failure_mode, ReopenTrigger::RootCauseWrong)
        .unwrap();
    assert_eq!(mode.stage, FailureStage::Diagnosis);
    assert_eq!(mode.reopen_count, 2);
}

#[tokio::test]
async fn concurrent_transitions_converge_on_one_current_row() {
    let service = Arc::new(service());

    let mut handles = Vec::new();
    for worker in 0..8u8 {
        let service = Arc::clone(&service);
        handles.push(tokio::task::spawn_blocking(move || {
            let target = match worker % 3 {
                0 => SafetyLevel::Yellow,
                1 => SafetyLevel::Orange,
                _ => SafetyLevel::Red,
            };
            for _ in 0..20 {
                let _ = service.escalation().transition(
                    &Actor::Operator(format!("op-{worker}")),
                    target,
                    "stress",
                    EvidenceBundle::default(),
                    AuthorizationMethod::Elevated("mandate://stress".into()),
                );
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let history = service.escalation().history().unwrap();
    assert_eq!(history.iter().filter(|row| row.is_current).count(), 1);

    let projection = ProjectionBuilder::safety(&service).unwrap();
    assert_eq!(projection.level, history.last().unwrap().to);
}

#[tokio::test]
async fn authorization_is_enforced_ahead_of_every_write_surface() {
    let service = service();

    // An execution agent may append evidence of its own work...
    service
        .append(ChainId::new("operational"), class_b_event(0))
        .await
        .unwrap();

    // ...but cannot drive gates, attestations, or the safety level.
    let error = service
        .advance_gate(
            Actor::ExecutionAgent,
            subject(),
            GateLevel::G0,
            approvers(),
            evidence("obj://e0"),
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        charter_service::ServiceError::Gate(charter_gates::GateError::Unauthorized { .. })
    ));

    let error = service
        .issue_attestation(
            Actor::ExecutionAgent,
            subject(),
            "1.0.0".into(),
            1,
            evidence("obj://cert-1"),
            Signature::new("sig-1", "key://certifier/1"),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        charter_service::ServiceError::Attestation(_)
    ));

    let error = service
        .transition_safety_level(
            Actor::ExecutionAgent,
            SafetyLevel::Yellow,
            "not my call".into(),
            EvidenceBundle::default(),
            AuthorizationMethod::Elevated("mandate://x".into()),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        charter_service::ServiceError::Escalation(_)
    ));

    // A mismatched payload/category pairing is rejected by the store with
    // the offending chain named.
    let mismatched = AppendRequest::new(
        EntryCategory::Governance,
        Actor::Orchestrator,
        "observe",
        "fills",
        EntryPayload::OperationalEvent {
            metric: "fills".into(),
            value: 1.0,
            detail: String::new(),
        },
    );
    let error = service
        .append(ChainId::new("governance"), mismatched)
        .await
        .unwrap_err();
    assert!(matches!(
        error,
        charter_service::ServiceError::Ledger(charter_ledger::LedgerError::Validation { .. })
    ));
}
