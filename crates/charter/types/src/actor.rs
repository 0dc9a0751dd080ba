//! Enumerated platform actors and their capability sets.
//!
//! Authorization decisions are made in application code ahead of every write
//! surface, against the actor's static capability set. Free-text actor
//! strings are deliberately not representable.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A platform participant recorded on ledger entries and authorization checks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Actor {
    /// Coordinates agent work and shepherds change proposals through gates.
    Orchestrator,
    /// Watches thresholds and owns automatic safety-level movement.
    RiskSentinel,
    /// Audits chains and certifies artifacts.
    ComplianceAuditor,
    /// Executes operational actions; may only append evidence of its work.
    ExecutionAgent,
    /// Break-glass and override authority of last resort.
    Custodian,
    /// A named human operator.
    Operator(String),
}

/// What an actor is allowed to do at the control-plane write surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    /// Append entries to ledger chains.
    AppendEntries,
    /// Advance subjects through change gates.
    AdvanceGates,
    /// Mark a passed gate as bypassed under elevated authority.
    BypassGates,
    /// Issue certification attestations.
    IssueAttestations,
    /// Request safety-level transitions.
    TransitionSafetyLevel,
    /// Authorize downgrades from elevated safety levels.
    SafetyOverride,
    /// Invoke the break-glass redaction path.
    BreakGlass,
    /// Arm, trigger, and reset kill-switches.
    ManageKillSwitches,
    /// Record retest cycles and close failure modes.
    RecordRetests,
}

impl Actor {
    /// The actor's capability set.
    pub fn capabilities(&self) -> &'static [Capability] {
        use Capability::*;
        match self {
            Actor::Orchestrator => &[AppendEntries, AdvanceGates, RecordRetests],
            Actor::RiskSentinel => &[
                AppendEntries,
                TransitionSafetyLevel,
                ManageKillSwitches,
                RecordRetests,
            ],
            Actor::ComplianceAuditor => &[AppendEntries, IssueAttestations, RecordRetests],
            Actor::ExecutionAgent => &[AppendEntries],
            Actor::Custodian => &[
                AppendEntries,
                AdvanceGates,
                BypassGates,
                IssueAttestations,
                TransitionSafetyLevel,
                SafetyOverride,
                BreakGlass,
                ManageKillSwitches,
                RecordRetests,
            ],
            Actor::Operator(_) => &[
                AppendEntries,
                AdvanceGates,
                IssueAttestations,
                TransitionSafetyLevel,
                RecordRetests,
            ],
        }
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::Orchestrator => f.write_str("orchestrator"),
            Actor::RiskSentinel => f.write_str("risk-sentinel"),
            Actor::ComplianceAuditor => f.write_str("compliance-auditor"),
            Actor::ExecutionAgent => f.write_str("execution-agent"),
            Actor::Custodian => f.write_str("custodian"),
            Actor::Operator(name) => write!(f, "operator:{name}"),
        }
    }
}
