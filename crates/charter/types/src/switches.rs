//! Kill-switch kinds, scopes, and states.

use serde::{Deserialize, Serialize};

use crate::ids::SubjectId;

/// What a kill-switch reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillSwitchKind {
    Threshold,
    Manual,
    RegimeBreach,
    VelocitySpike,
}

/// Which operations a triggered switch halts.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillSwitchScope {
    Global,
    Asset(String),
    Subject(SubjectId),
}

impl KillSwitchScope {
    /// Whether an operation in `target` scope is covered by this switch.
    pub fn covers(&self, target: &KillSwitchScope) -> bool {
        match self {
            KillSwitchScope::Global => true,
            scope => scope == target,
        }
    }
}

/// Arming state of a switch. Only triggered switches block operations, and
/// they stay triggered until explicitly reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KillSwitchState {
    #[default]
    Disarmed,
    Armed,
    Triggered,
}
