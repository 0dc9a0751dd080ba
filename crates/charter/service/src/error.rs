//! Service boundary error type.

use thiserror::Error;

use charter_attestation::AttestationError;
use charter_escalation::EscalationError;
use charter_gates::GateError;
use charter_ledger::LedgerError;
use charter_retest::RetestError;

/// Everything the control plane can refuse to do, with the offending
/// chain/subject id carried by the underlying error.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{actor} is not authorized to {operation}")]
    Unauthorized { actor: String, operation: String },

    /// A triggered kill-switch covers this operation's scope.
    #[error("operation {operation} is halted by a triggered kill-switch")]
    Halted { operation: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Attestation(#[from] AttestationError),

    #[error(transparent)]
    Escalation(#[from] EscalationError),

    #[error(transparent)]
    Retest(#[from] RetestError),
}
