//! Certification registry error types.

use thiserror::Error;

use charter_ledger::LedgerError;

/// Errors that can occur while issuing or suspending attestations.
#[derive(Debug, Error)]
pub enum AttestationError {
    #[error("no certification track for {subject} version {version}")]
    UnknownTrack { subject: String, version: String },

    /// A later gate was issued before all earlier gates were recorded.
    #[error("{subject} version {version}: gate {gate} requires gates {missing} first")]
    Sequence {
        subject: String,
        version: String,
        gate: u8,
        missing: String,
    },

    #[error("{subject} version {version}: gate {gate} is already recorded")]
    Duplicate {
        subject: String,
        version: String,
        gate: u8,
    },

    #[error("{subject} version {version}: certification is suspended: {reason}")]
    Suspended {
        subject: String,
        version: String,
        reason: String,
    },

    #[error("{subject} version {version}: {reason}")]
    Validation {
        subject: String,
        version: String,
        reason: String,
    },

    #[error("{subject} version {version}: {actor} is not authorized to {operation}")]
    Unauthorized {
        subject: String,
        version: String,
        actor: String,
        operation: String,
    },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
