//! Escalation engine error types.

use thiserror::Error;

use charter_ledger::LedgerError;

/// Errors that can occur while moving the safety level or operating
/// kill-switches.
#[derive(Debug, Error)]
pub enum EscalationError {
    #[error("{actor} is not authorized to {operation}")]
    Unauthorized { actor: String, operation: String },

    #[error("kill-switch {0} is not defined")]
    UnknownSwitch(String),

    #[error("kill-switch {name}: {reason}")]
    SwitchState { name: String, reason: String },

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
