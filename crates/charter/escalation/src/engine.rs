//! The escalation engine: owner of the single current safety level.

use std::sync::{Arc, RwLock};

use chrono::{Duration, Utc};
use tracing::{info, warn};

use charter_ledger::{
    AppendRequest, InMemoryLedger, LedgerError, LedgerReader, LedgerWriter,
};
use charter_types::{
    Actor, AuthorizationMethod, Capability, DiscrepancyClass, EntryCategory, EntryId,
    EntryPayload, EvidenceBundle, SafetyLevel, SafetyLevelProvider, Severity, TransitionType,
};

use crate::error::EscalationError;
use crate::switches::KillSwitchPanel;
use crate::transition::{EscalationConfig, SafetyTransition, TransitionOutcome};

struct EscalationState {
    history: Vec<SafetyTransition>,
    class_a_cursor: EntryId,
    class_b_cursor: EntryId,
    velocity_cursor: EntryId,
}

impl EscalationState {
    fn current_level(&self) -> SafetyLevel {
        self.history
            .last()
            .map(|row| row.to)
            .unwrap_or(SafetyLevel::BASELINE)
    }
}

/// Owns the global safety posture and the kill-switch panel.
///
/// Transitions are an atomic swap under one write lock: the old current row
/// is unmarked, the new row is pushed, and the documenting ledger entry is
/// appended, all in the same critical section. Concurrent transition calls
/// race on the lock; the loser re-evaluates against the new current level
/// and may legitimately become a no-op.
pub struct EscalationEngine {
    ledger: Arc<InMemoryLedger>,
    config: EscalationConfig,
    state: RwLock<EscalationState>,
    switches: KillSwitchPanel,
}

impl EscalationEngine {
    pub fn new(ledger: Arc<InMemoryLedger>, config: EscalationConfig) -> Self {
        let genesis = SafetyTransition {
            from: SafetyLevel::BASELINE,
            to: SafetyLevel::BASELINE,
            transition_type: TransitionType::Reset,
            reason: "baseline posture".into(),
            authorized_by: Actor::RiskSentinel,
            authorization_method: AuthorizationMethod::Automatic,
            evidence: EvidenceBundle::default(),
            occurred_at: Utc::now(),
            is_current: true,
        };
        let switches = KillSwitchPanel::new(Arc::clone(&ledger), config.chain.clone());
        Self {
            ledger,
            config,
            state: RwLock::new(EscalationState {
                history: vec![genesis],
                class_a_cursor: EntryId(0),
                class_b_cursor: EntryId(0),
                velocity_cursor: EntryId(0),
            }),
            switches,
        }
    }

    pub fn config(&self) -> &EscalationConfig {
        &self.config
    }

    pub fn kill_switches(&self) -> &KillSwitchPanel {
        &self.switches
    }

    /// The current transition row.
    pub fn current(&self) -> Result<SafetyTransition, EscalationError> {
        let state = self.read_state()?;
        state
            .history
            .last()
            .cloned()
            .ok_or_else(|| EscalationError::Validation("safety history is empty".into()))
    }

    /// Full transition history, oldest first.
    pub fn history(&self) -> Result<Vec<SafetyTransition>, EscalationError> {
        let state = self.read_state()?;
        Ok(state.history.clone())
    }

    /// Request a safety-level transition.
    ///
    /// Automatic requests may only upgrade. A downgrade (or reset) away from
    /// a level at or above the configured floor demands an elevated-authority
    /// method and an actor holding the override capability. A request for the
    /// level already in force is a no-op.
    pub fn transition(
        &self,
        actor: &Actor,
        to: SafetyLevel,
        reason: &str,
        evidence: EvidenceBundle,
        method: AuthorizationMethod,
    ) -> Result<TransitionOutcome, EscalationError> {
        if !actor.has_capability(Capability::TransitionSafetyLevel) {
            return Err(EscalationError::Unauthorized {
                actor: actor.to_string(),
                operation: "transition the safety level".into(),
            });
        }
        if let AuthorizationMethod::Elevated(authority) = &method {
            if authority.trim().is_empty() {
                return Err(EscalationError::Validation(
                    "elevated authorization requires a non-empty authority reference".into(),
                ));
            }
        }

        let mut state = self.write_state()?;
        self.transition_locked(&mut state, actor, to, reason, evidence, method)
    }

    /// Scan ledger entries committed since the last evaluation and move the
    /// safety level if a threshold has been met.
    ///
    /// Each rule keeps its own cursor over entry ids and advances it in the
    /// same evaluation that fires, so one breach produces exactly one
    /// transition no matter how often evaluation runs.
    pub fn evaluate_thresholds(&self) -> Result<(SafetyLevel, bool), EscalationError> {
        let mut state = self.write_state()?;
        let now = Utc::now();
        let mut transitioned = false;
        let sentinel = Actor::RiskSentinel;

        // Class-A discrepancies escalate straight to at least Red.
        let fresh = self.ledger.entries_since(state.class_a_cursor)?;
        let class_a_max = fresh
            .iter()
            .filter(|entry| entry.discrepancy_class == DiscrepancyClass::A)
            .map(|entry| entry.entry_id)
            .max();
        if let Some(max_id) = class_a_max {
            state.class_a_cursor = max_id;
            if state.current_level() < SafetyLevel::Red {
                self.transition_locked(
                    &mut state,
                    &sentinel,
                    SafetyLevel::Red,
                    "class-A discrepancy recorded",
                    EvidenceBundle::default(),
                    AuthorizationMethod::Automatic,
                )?;
                transitioned = true;
            }
        }

        // Class-B count within the rolling window.
        let fresh = self.ledger.entries_since(state.class_b_cursor)?;
        let cutoff = now - Duration::hours(self.config.class_b_window_hours);
        let class_b: Vec<EntryId> = fresh
            .iter()
            .filter(|entry| {
                entry.discrepancy_class == DiscrepancyClass::B && entry.timestamp >= cutoff
            })
            .map(|entry| entry.entry_id)
            .collect();
        if class_b.len() >= self.config.class_b_threshold {
            if let Some(max_id) = class_b.iter().max() {
                state.class_b_cursor = *max_id;
            }
            if let Some(target) = state.current_level().next_more_severe() {
                let reason = format!(
                    "{} class-B discrepancies within {}h",
                    class_b.len(),
                    self.config.class_b_window_hours
                );
                self.transition_locked(
                    &mut state,
                    &sentinel,
                    target,
                    &reason,
                    EvidenceBundle::default(),
                    AuthorizationMethod::Automatic,
                )?;
                transitioned = true;
            }
        }

        // Operational velocity spike.
        let fresh = self.ledger.entries_since(state.velocity_cursor)?;
        let cutoff = now - Duration::minutes(self.config.velocity_window_minutes);
        let operational: Vec<EntryId> = fresh
            .iter()
            .filter(|entry| {
                entry.category == EntryCategory::Operational && entry.timestamp >= cutoff
            })
            .map(|entry| entry.entry_id)
            .collect();
        if operational.len() >= self.config.velocity_threshold {
            if let Some(max_id) = operational.iter().max() {
                state.velocity_cursor = *max_id;
            }
            if let Some(target) = state.current_level().next_more_severe() {
                let reason = format!(
                    "{} operational events within {}m",
                    operational.len(),
                    self.config.velocity_window_minutes
                );
                self.transition_locked(
                    &mut state,
                    &sentinel,
                    target,
                    &reason,
                    EvidenceBundle::default(),
                    AuthorizationMethod::Automatic,
                )?;
                transitioned = true;
            }
        }

        Ok((state.current_level(), transitioned))
    }

    fn transition_locked(
        &self,
        state: &mut EscalationState,
        actor: &Actor,
        to: SafetyLevel,
        reason: &str,
        evidence: EvidenceBundle,
        method: AuthorizationMethod,
    ) -> Result<TransitionOutcome, EscalationError> {
        let from = state.current_level();
        let Some(transition_type) = TransitionType::between(from, to) else {
            // Losing a race to the same target is legitimate.
            let record = state
                .history
                .last()
                .cloned()
                .ok_or_else(|| EscalationError::Validation("safety history is empty".into()))?;
            return Ok(TransitionOutcome {
                record,
                transitioned: false,
            });
        };

        let moving_down = to < from;
        if method.is_automatic() && moving_down {
            return Err(EscalationError::Unauthorized {
                actor: actor.to_string(),
                operation: "downgrade automatically; automatic evaluation may only upgrade".into(),
            });
        }
        if moving_down && from >= self.config.manual_downgrade_floor {
            let elevated = matches!(method, AuthorizationMethod::Elevated(_));
            if !elevated || !actor.has_capability(Capability::SafetyOverride) {
                return Err(EscalationError::Unauthorized {
                    actor: actor.to_string(),
                    operation: format!(
                        "downgrade from {from}; a manual override with safety-override authority is required"
                    ),
                });
            }
        }

        if let Some(last) = state.history.last_mut() {
            last.is_current = false;
        }
        let record = SafetyTransition {
            from,
            to,
            transition_type,
            reason: reason.to_string(),
            authorized_by: actor.clone(),
            authorization_method: method.clone(),
            evidence,
            occurred_at: Utc::now(),
            is_current: true,
        };
        state.history.push(record.clone());

        let severity = match to {
            SafetyLevel::Green => Severity::Info,
            SafetyLevel::Yellow => Severity::Warning,
            SafetyLevel::Orange => Severity::Error,
            SafetyLevel::Red | SafetyLevel::Black => Severity::Critical,
        };
        let authority = match &method {
            AuthorizationMethod::Automatic => "threshold-evaluation".to_string(),
            AuthorizationMethod::Elevated(authority) => authority.clone(),
        };
        let request = AppendRequest::new(
            EntryCategory::Integrity,
            actor.clone(),
            "safety.transition",
            to.to_string(),
            EntryPayload::SafetyShift {
                from,
                to,
                transition_type,
                reason: reason.to_string(),
            },
        )
        .with_severity(severity)
        .with_authority(authority);
        self.ledger.append(&self.config.chain, request)?;

        match transition_type {
            TransitionType::Upgrade => {
                warn!(%from, %to, reason, "safety level upgraded")
            }
            TransitionType::Downgrade | TransitionType::Reset => {
                info!(%from, %to, reason, "safety level lowered")
            }
        }

        Ok(TransitionOutcome {
            record,
            transitioned: true,
        })
    }

    fn read_state(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, EscalationState>, EscalationError> {
        self.state
            .read()
            .map_err(|_| EscalationError::Ledger(LedgerError::LockPoisoned))
    }

    fn write_state(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, EscalationState>, EscalationError> {
        self.state
            .write()
            .map_err(|_| EscalationError::Ledger(LedgerError::LockPoisoned))
    }
}

impl SafetyLevelProvider for EscalationEngine {
    fn current_level(&self) -> SafetyLevel {
        // A poisoned lock reads as the most restrictive posture.
        self.state
            .read()
            .map(|state| state.current_level())
            .unwrap_or(SafetyLevel::Black)
    }
}
