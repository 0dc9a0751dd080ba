//! The retest / closure validator.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use charter_ledger::{AppendRequest, InMemoryLedger, LedgerError, LedgerWriter};
use charter_types::{
    Actor, Capability, ChainId, CycleResult, EntryCategory, EntryPayload, FailureModeId,
    FailureStage, Severity,
};

use crate::error::RetestError;

/// Validator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetestConfig {
    /// Consecutive passing cycles required to close a failure mode.
    pub consecutive_passes: usize,
    /// Reopen counts above this are surfaced as an architectural-flaw
    /// signal. Never auto-remediated.
    pub reopen_limit: u32,
    /// Chain that receives retest ledger entries.
    pub chain: ChainId,
}

impl Default for RetestConfig {
    fn default() -> Self {
        Self {
            consecutive_passes: 7,
            reopen_limit: 3,
            chain: ChainId::new("compliance"),
        }
    }
}

/// The four booleans observed in one retest cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleObservation {
    pub corrective_mechanism_active: bool,
    pub original_failure_reappeared: bool,
    pub new_failure_introduced: bool,
    pub metrics_improved: bool,
}

impl CycleObservation {
    /// A cycle passes only when every boolean points the closing direction.
    pub fn is_pass(&self) -> bool {
        self.corrective_mechanism_active
            && !self.original_failure_reappeared
            && !self.new_failure_introduced
            && self.metrics_improved
    }
}

/// One recorded observation cycle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetestCycle {
    pub number: u32,
    pub observation: CycleObservation,
    pub result: CycleResult,
    pub recorded_at: DateTime<Utc>,
}

/// Why a closed failure mode was reopened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReopenTrigger {
    /// A failing cycle arrived after closure.
    RegressionAfterClosure,
    /// The diagnosed root cause turned out to be wrong; work restarts at
    /// diagnosis rather than retest.
    RootCauseWrong,
    /// An operator reopened it, with a stated reason.
    Manual(String),
}

impl ReopenTrigger {
    fn target_stage(&self) -> FailureStage {
        match self {
            ReopenTrigger::RootCauseWrong => FailureStage::Diagnosis,
            _ => FailureStage::Retest,
        }
    }
}

/// One reopen log entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReopenEvent {
    pub previous_stage: FailureStage,
    pub trigger: ReopenTrigger,
    pub reopen_count: u32,
    pub occurred_at: DateTime<Utc>,
}

/// A tracked failure mode and its accumulated cycles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureMode {
    pub id: FailureModeId,
    pub description: String,
    pub stage: FailureStage,
    pub cycles: Vec<RetestCycle>,
    pub reopen_log: Vec<ReopenEvent>,
    pub reopen_count: u32,
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

impl FailureMode {
    fn trailing_passes(&self) -> usize {
        self.cycles
            .iter()
            .rev()
            .take_while(|cycle| cycle.result == CycleResult::Pass)
            .count()
    }
}

/// Read-only summary for dashboards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FailureModeReport {
    pub id: FailureModeId,
    pub stage: FailureStage,
    pub cycle_count: usize,
    pub trailing_passes: usize,
    pub reopen_count: u32,
    /// Reopen count exceeded the configured limit; a design problem, not
    /// something retest can fix.
    pub architectural_flaw: bool,
}

/// Longitudinal state machine enforcing closure discipline: a failure mode
/// closes only on enough consecutive passing cycles, and any failing cycle
/// after closure reopens it.
pub struct RetestValidator {
    ledger: Arc<InMemoryLedger>,
    config: RetestConfig,
    modes: RwLock<HashMap<FailureModeId, FailureMode>>,
}

impl RetestValidator {
    pub fn new(ledger: Arc<InMemoryLedger>, config: RetestConfig) -> Self {
        Self {
            ledger,
            config,
            modes: RwLock::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &RetestConfig {
        &self.config
    }

    /// Start tracking a newly observed failure.
    pub fn capture(
        &self,
        actor: &Actor,
        id: &FailureModeId,
        description: &str,
    ) -> Result<FailureMode, RetestError> {
        self.require_capability(actor, id, "capture failure modes")?;

        let mut modes = self.write_modes()?;
        if modes.contains_key(id) {
            return Err(RetestError::AlreadyTracked(id.to_string()));
        }

        let mode = FailureMode {
            id: id.clone(),
            description: description.to_string(),
            stage: FailureStage::Capture,
            cycles: Vec::new(),
            reopen_log: Vec::new(),
            reopen_count: 0,
            opened_at: Utc::now(),
            closed_at: None,
        };
        modes.insert(id.clone(), mode.clone());

        self.log_decision(actor, &mode, None, "captured", Severity::Warning)?;
        info!(failure_mode = %id, "failure mode captured");
        Ok(mode)
    }

    /// Move one stage forward: capture → diagnosis → action definition →
    /// retest. Closure is not a stage step; it goes through [`Self::try_close`].
    pub fn advance_stage(
        &self,
        actor: &Actor,
        id: &FailureModeId,
    ) -> Result<FailureMode, RetestError> {
        self.require_capability(actor, id, "advance failure-mode stages")?;

        let mut modes = self.write_modes()?;
        let mode = modes
            .get_mut(id)
            .ok_or_else(|| RetestError::UnknownFailureMode(id.to_string()))?;

        let next = mode.stage.next().ok_or_else(|| RetestError::Validation {
            id: id.to_string(),
            reason: format!("stage {} has no forward step", mode.stage),
        })?;
        mode.stage = next;
        let snapshot = mode.clone();

        self.log_decision(actor, &snapshot, None, "stage advanced", Severity::Info)?;
        Ok(snapshot)
    }

    /// Record one observation cycle.
    ///
    /// A failing cycle against a closed mode is a regression: it reopens the
    /// mode at the retest stage and increments the reopen count by exactly
    /// one.
    pub fn record_cycle(
        &self,
        actor: &Actor,
        id: &FailureModeId,
        observation: CycleObservation,
    ) -> Result<CycleResult, RetestError> {
        self.require_capability(actor, id, "record retest cycles")?;

        let mut modes = self.write_modes()?;
        let mode = modes
            .get_mut(id)
            .ok_or_else(|| RetestError::UnknownFailureMode(id.to_string()))?;

        if !matches!(mode.stage, FailureStage::Retest | FailureStage::Closed) {
            return Err(RetestError::WrongStage {
                id: id.to_string(),
                required: FailureStage::Retest,
                actual: mode.stage,
            });
        }

        let was_closed = mode.stage == FailureStage::Closed;
        let result = if observation.is_pass() {
            CycleResult::Pass
        } else if was_closed {
            CycleResult::Regression
        } else {
            CycleResult::Fail
        };

        mode.cycles.push(RetestCycle {
            number: mode.cycles.len() as u32 + 1,
            observation,
            result,
            recorded_at: Utc::now(),
        });

        if result == CycleResult::Regression {
            mode.reopen_count += 1;
            mode.reopen_log.push(ReopenEvent {
                previous_stage: FailureStage::Closed,
                trigger: ReopenTrigger::RegressionAfterClosure,
                reopen_count: mode.reopen_count,
                occurred_at: Utc::now(),
            });
            mode.stage = FailureStage::Retest;
            mode.closed_at = None;
            warn!(failure_mode = %id, reopen_count = mode.reopen_count, "regression after closure");
        }

        let snapshot = mode.clone();
        let severity = match result {
            CycleResult::Pass => Severity::Info,
            CycleResult::Fail => Severity::Warning,
            CycleResult::Regression => Severity::Error,
        };
        self.log_decision(actor, &snapshot, Some(result), "cycle recorded", severity)?;

        if snapshot.reopen_count > self.config.reopen_limit {
            warn!(
                failure_mode = %id,
                reopen_count = snapshot.reopen_count,
                limit = self.config.reopen_limit,
                "reopen count exceeds the limit; architectural flaw suspected"
            );
        }

        Ok(result)
    }

    /// Close the failure mode if the trailing cycles allow it.
    ///
    /// Returns `true` when closed (idempotently for an already closed mode),
    /// `false` when the pass streak is still too short.
    pub fn try_close(&self, actor: &Actor, id: &FailureModeId) -> Result<bool, RetestError> {
        self.require_capability(actor, id, "close failure modes")?;

        let mut modes = self.write_modes()?;
        let mode = modes
            .get_mut(id)
            .ok_or_else(|| RetestError::UnknownFailureMode(id.to_string()))?;

        if mode.stage == FailureStage::Closed {
            return Ok(true);
        }
        if mode.stage != FailureStage::Retest {
            return Err(RetestError::WrongStage {
                id: id.to_string(),
                required: FailureStage::Retest,
                actual: mode.stage,
            });
        }

        if mode.cycles.len() < self.config.consecutive_passes
            || mode.trailing_passes() < self.config.consecutive_passes
        {
            return Ok(false);
        }

        mode.stage = FailureStage::Closed;
        mode.closed_at = Some(Utc::now());
        let snapshot = mode.clone();

        self.log_decision(actor, &snapshot, None, "closed", Severity::Info)?;
        info!(failure_mode = %id, cycles = snapshot.cycles.len(), "failure mode closed");
        Ok(true)
    }

    /// Reopen a closed failure mode.
    pub fn reopen(
        &self,
        actor: &Actor,
        id: &FailureModeId,
        trigger: ReopenTrigger,
    ) -> Result<FailureMode, RetestError> {
        self.require_capability(actor, id, "reopen failure modes")?;

        let mut modes = self.write_modes()?;
        let mode = modes
            .get_mut(id)
            .ok_or_else(|| RetestError::UnknownFailureMode(id.to_string()))?;

        if mode.stage != FailureStage::Closed {
            return Err(RetestError::WrongStage {
                id: id.to_string(),
                required: FailureStage::Closed,
                actual: mode.stage,
            });
        }

        mode.reopen_count += 1;
        mode.reopen_log.push(ReopenEvent {
            previous_stage: mode.stage,
            trigger: trigger.clone(),
            reopen_count: mode.reopen_count,
            occurred_at: Utc::now(),
        });
        mode.stage = trigger.target_stage();
        mode.closed_at = None;
        let snapshot = mode.clone();

        self.log_decision(actor, &snapshot, None, "reopened", Severity::Warning)?;
        warn!(
            failure_mode = %id,
            reopen_count = snapshot.reopen_count,
            stage = %snapshot.stage,
            "failure mode reopened"
        );

        if snapshot.reopen_count > self.config.reopen_limit {
            warn!(
                failure_mode = %id,
                reopen_count = snapshot.reopen_count,
                limit = self.config.reopen_limit,
                "reopen count exceeds the limit; architectural flaw suspected"
            );
        }

        Ok(snapshot)
    }

    pub fn mode(&self, id: &FailureModeId) -> Result<Option<FailureMode>, RetestError> {
        let modes = self.read_modes()?;
        Ok(modes.get(id).cloned())
    }

    pub fn report(&self, id: &FailureModeId) -> Result<FailureModeReport, RetestError> {
        let modes = self.read_modes()?;
        let mode = modes
            .get(id)
            .ok_or_else(|| RetestError::UnknownFailureMode(id.to_string()))?;
        Ok(FailureModeReport {
            id: mode.id.clone(),
            stage: mode.stage,
            cycle_count: mode.cycles.len(),
            trailing_passes: mode.trailing_passes(),
            reopen_count: mode.reopen_count,
            architectural_flaw: mode.reopen_count > self.config.reopen_limit,
        })
    }

    pub fn failure_modes(&self) -> Result<Vec<FailureModeId>, RetestError> {
        let modes = self.read_modes()?;
        let mut ids: Vec<_> = modes.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn log_decision(
        &self,
        actor: &Actor,
        mode: &FailureMode,
        result: Option<CycleResult>,
        detail: &str,
        severity: Severity,
    ) -> Result<(), RetestError> {
        let request = AppendRequest::new(
            EntryCategory::Compliance,
            actor.clone(),
            "retest.decision",
            mode.id.to_string(),
            EntryPayload::RetestDecision {
                failure_mode_id: mode.id.clone(),
                stage: mode.stage,
                result,
                reopen_count: mode.reopen_count,
                detail: detail.to_string(),
            },
        )
        .with_severity(severity);
        self.ledger.append(&self.config.chain, request)?;
        Ok(())
    }

    fn require_capability(
        &self,
        actor: &Actor,
        id: &FailureModeId,
        operation: &str,
    ) -> Result<(), RetestError> {
        if actor.has_capability(Capability::RecordRetests) {
            Ok(())
        } else {
            Err(RetestError::Unauthorized {
                id: id.to_string(),
                actor: actor.to_string(),
                operation: operation.to_string(),
            })
        }
    }

    fn read_modes(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, HashMap<FailureModeId, FailureMode>>, RetestError>
    {
        self.modes
            .read()
            .map_err(|_| RetestError::Ledger(LedgerError::LockPoisoned))
    }

    fn write_modes(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<FailureModeId, FailureMode>>, RetestError>
    {
        self.modes
            .write()
            .map_err(|_| RetestError::Ledger(LedgerError::LockPoisoned))
    }
}
