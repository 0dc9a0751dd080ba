//! Independently armable kill-switches.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use charter_ledger::{AppendRequest, InMemoryLedger, LedgerError, LedgerWriter};
use charter_types::{
    Actor, Capability, ChainId, EntryCategory, EntryPayload, KillSwitchKind, KillSwitchScope,
    KillSwitchState, Severity,
};

use crate::error::EscalationError;

/// One named halt mechanism.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KillSwitch {
    pub name: String,
    pub kind: KillSwitchKind,
    pub scope: KillSwitchScope,
    pub state: KillSwitchState,
    pub armed_at: Option<DateTime<Utc>>,
    pub triggered_at: Option<DateTime<Utc>>,
    pub trigger_reason: Option<String>,
}

/// The set of kill-switches, managed independently of the safety level.
///
/// A triggered switch blocks every operation its scope covers until it is
/// explicitly reset; resetting re-arms rather than disarms, so the halt
/// mechanism stays ready.
pub struct KillSwitchPanel {
    ledger: Arc<InMemoryLedger>,
    chain: ChainId,
    switches: RwLock<BTreeMap<String, KillSwitch>>,
}

impl KillSwitchPanel {
    pub fn new(ledger: Arc<InMemoryLedger>, chain: ChainId) -> Self {
        Self {
            ledger,
            chain,
            switches: RwLock::new(BTreeMap::new()),
        }
    }

    /// Define a switch in the disarmed state.
    pub fn define(
        &self,
        actor: &Actor,
        name: &str,
        kind: KillSwitchKind,
        scope: KillSwitchScope,
    ) -> Result<KillSwitch, EscalationError> {
        self.require_manage(actor, "define kill-switches")?;

        let mut switches = self.write_switches()?;
        if switches.contains_key(name) {
            return Err(EscalationError::SwitchState {
                name: name.to_string(),
                reason: "already defined".into(),
            });
        }

        let switch = KillSwitch {
            name: name.to_string(),
            kind,
            scope,
            state: KillSwitchState::Disarmed,
            armed_at: None,
            triggered_at: None,
            trigger_reason: None,
        };
        switches.insert(name.to_string(), switch.clone());
        info!(switch = name, ?kind, "kill-switch defined");
        Ok(switch)
    }

    pub fn arm(&self, actor: &Actor, name: &str) -> Result<KillSwitch, EscalationError> {
        self.require_manage(actor, "arm kill-switches")?;

        let mut switches = self.write_switches()?;
        let switch = switches
            .get_mut(name)
            .ok_or_else(|| EscalationError::UnknownSwitch(name.to_string()))?;
        if switch.state == KillSwitchState::Triggered {
            return Err(EscalationError::SwitchState {
                name: name.to_string(),
                reason: "cannot arm a triggered switch, reset it first".into(),
            });
        }

        switch.state = KillSwitchState::Armed;
        switch.armed_at = Some(Utc::now());
        let snapshot = switch.clone();

        self.log_event(actor, &snapshot, "armed", Severity::Info)?;
        info!(switch = name, "kill-switch armed");
        Ok(snapshot)
    }

    /// Trip an armed switch. Operations in its scope are blocked until reset.
    pub fn trigger(
        &self,
        actor: &Actor,
        name: &str,
        reason: &str,
    ) -> Result<KillSwitch, EscalationError> {
        self.require_manage(actor, "trigger kill-switches")?;

        let mut switches = self.write_switches()?;
        let switch = switches
            .get_mut(name)
            .ok_or_else(|| EscalationError::UnknownSwitch(name.to_string()))?;
        if switch.state != KillSwitchState::Armed {
            return Err(EscalationError::SwitchState {
                name: name.to_string(),
                reason: format!("only an armed switch can trigger, state is {:?}", switch.state),
            });
        }

        switch.state = KillSwitchState::Triggered;
        switch.triggered_at = Some(Utc::now());
        switch.trigger_reason = Some(reason.to_string());
        let snapshot = switch.clone();

        self.log_event(actor, &snapshot, "triggered", Severity::Critical)?;
        warn!(switch = name, reason, "kill-switch triggered");
        Ok(snapshot)
    }

    /// Clear a triggered switch back to armed.
    pub fn reset(&self, actor: &Actor, name: &str) -> Result<KillSwitch, EscalationError> {
        self.require_manage(actor, "reset kill-switches")?;

        let mut switches = self.write_switches()?;
        let switch = switches
            .get_mut(name)
            .ok_or_else(|| EscalationError::UnknownSwitch(name.to_string()))?;
        if switch.state != KillSwitchState::Triggered {
            return Err(EscalationError::SwitchState {
                name: name.to_string(),
                reason: "only a triggered switch can be reset".into(),
            });
        }

        switch.state = KillSwitchState::Armed;
        switch.triggered_at = None;
        switch.trigger_reason = None;
        let snapshot = switch.clone();

        self.log_event(actor, &snapshot, "reset", Severity::Info)?;
        info!(switch = name, "kill-switch reset");
        Ok(snapshot)
    }

    /// Whether any triggered switch covers an operation in `scope`.
    pub fn blocks(&self, scope: &KillSwitchScope) -> Result<bool, EscalationError> {
        let switches = self.read_switches()?;
        Ok(switches
            .values()
            .any(|switch| switch.state == KillSwitchState::Triggered && switch.scope.covers(scope)))
    }

    pub fn switches(&self) -> Result<Vec<KillSwitch>, EscalationError> {
        let switches = self.read_switches()?;
        Ok(switches.values().cloned().collect())
    }

    fn log_event(
        &self,
        actor: &Actor,
        switch: &KillSwitch,
        event: &str,
        severity: Severity,
    ) -> Result<(), EscalationError> {
        let request = AppendRequest::new(
            EntryCategory::Adversarial,
            actor.clone(),
            format!("killswitch.{event}"),
            switch.name.clone(),
            EntryPayload::KillSwitchEvent {
                name: switch.name.clone(),
                kind: switch.kind,
                scope: switch.scope.clone(),
                event: event.to_string(),
            },
        )
        .with_severity(severity);
        self.ledger.append(&self.chain, request)?;
        Ok(())
    }

    fn require_manage(&self, actor: &Actor, operation: &str) -> Result<(), EscalationError> {
        if actor.has_capability(Capability::ManageKillSwitches) {
            Ok(())
        } else {
            Err(EscalationError::Unauthorized {
                actor: actor.to_string(),
                operation: operation.to_string(),
            })
        }
    }

    fn read_switches(
        &self,
    ) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<String, KillSwitch>>, EscalationError> {
        self.switches
            .read()
            .map_err(|_| EscalationError::Ledger(LedgerError::LockPoisoned))
    }

    fn write_switches(
        &self,
    ) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, KillSwitch>>, EscalationError> {
        self.switches
            .write()
            .map_err(|_| EscalationError::Ledger(LedgerError::LockPoisoned))
    }
}
