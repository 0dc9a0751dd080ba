//! Read-only projections for external dashboards and collaborators.
//!
//! Projections are derived from committed state on demand and are never fed
//! back into writes; there is no stored read model to drift from the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use charter_gates::SubjectGateView;
use charter_ledger::{ChainStatus, ChainVerifier, LedgerReader};
use charter_retest::FailureModeReport;
use charter_types::{ChainId, SafetyLevel};

use crate::error::ServiceError;
use crate::service::CharterService;

/// Current safety posture.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyProjection {
    pub level: SafetyLevel,
    pub since: DateTime<Utc>,
    pub transitions: usize,
}

/// Derived integrity standing of one chain.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainIntegrityProjection {
    pub chain_id: ChainId,
    pub status: ChainStatus,
    pub total_entries: u64,
    pub first_break_position: Option<u64>,
}

/// Everything a dashboard needs in one read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardProjection {
    pub generated_at: DateTime<Utc>,
    pub safety: SafetyProjection,
    pub chains: Vec<ChainIntegrityProjection>,
    pub gates: Vec<SubjectGateView>,
    pub failure_modes: Vec<FailureModeReport>,
}

/// Deterministic projection builders over a service's committed state.
pub struct ProjectionBuilder;

impl ProjectionBuilder {
    pub fn safety(service: &CharterService) -> Result<SafetyProjection, ServiceError> {
        let current = service.escalation().current()?;
        let history = service.escalation().history()?;
        Ok(SafetyProjection {
            level: current.to,
            since: current.occurred_at,
            transitions: history.len(),
        })
    }

    pub fn chain_integrity(
        service: &CharterService,
    ) -> Result<Vec<ChainIntegrityProjection>, ServiceError> {
        let ledger = service.ledger();
        let mut projections = Vec::new();
        for chain in ledger.chains()? {
            let report = ChainVerifier::verify_chain(ledger.as_ref(), &chain, None)?;
            projections.push(ChainIntegrityProjection {
                chain_id: chain,
                status: report.status,
                total_entries: report.total_entries,
                first_break_position: report.first_break_position,
            });
        }
        Ok(projections)
    }

    pub fn gate_status(service: &CharterService) -> Result<Vec<SubjectGateView>, ServiceError> {
        let mut views = Vec::new();
        for subject in service.gates().subjects()? {
            views.push(service.gates().view(&subject)?);
        }
        Ok(views)
    }

    pub fn failure_modes(
        service: &CharterService,
    ) -> Result<Vec<FailureModeReport>, ServiceError> {
        let mut reports = Vec::new();
        for id in service.retests().failure_modes()? {
            reports.push(service.retests().report(&id)?);
        }
        Ok(reports)
    }

    pub fn dashboard(service: &CharterService) -> Result<DashboardProjection, ServiceError> {
        Ok(DashboardProjection {
            generated_at: Utc::now(),
            safety: Self::safety(service)?,
            chains: Self::chain_integrity(service)?,
            gates: Self::gate_status(service)?,
            failure_modes: Self::failure_modes(service)?,
        })
    }
}
