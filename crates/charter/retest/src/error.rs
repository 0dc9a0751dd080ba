//! Retest validator error types.

use thiserror::Error;

use charter_ledger::LedgerError;
use charter_types::FailureStage;

/// Errors that can occur while recording cycles or closing failure modes.
#[derive(Debug, Error)]
pub enum RetestError {
    #[error("failure mode {0} is not tracked")]
    UnknownFailureMode(String),

    #[error("failure mode {0} is already tracked")]
    AlreadyTracked(String),

    #[error("failure mode {id}: operation requires stage {required}, currently {actual}")]
    WrongStage {
        id: String,
        required: FailureStage,
        actual: FailureStage,
    },

    #[error("failure mode {id}: {reason}")]
    Validation { id: String, reason: String },

    #[error("failure mode {id}: {actor} is not authorized to {operation}")]
    Unauthorized {
        id: String,
        actor: String,
        operation: String,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
