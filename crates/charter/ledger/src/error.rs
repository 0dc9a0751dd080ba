//! Ledger error types.

use thiserror::Error;

/// Errors returned by the ledger store and verifier.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The append was rejected before persistence; nothing was written.
    #[error("validation failed on chain {chain}: {reason}")]
    Validation { chain: String, reason: String },

    /// The chain head moved between hash computation and commit, and the
    /// retry bound was exhausted.
    #[error("optimistic append conflict on chain {chain} after {attempts} attempts")]
    AppendConflict { chain: String, attempts: u32 },

    /// No entry exists at the addressed position.
    #[error("entry not found: chain {chain} position {position}")]
    NotFound { chain: String, position: u64 },

    /// The actor lacks the capability or authority the operation demands.
    #[error("actor {actor} is not authorized to {operation} on chain {chain}")]
    Unauthorized {
        actor: String,
        operation: String,
        chain: String,
    },

    /// An attempt to mutate committed history outside the break-glass path.
    /// Always accompanied by a critical ledger entry recording the attempt.
    #[error("immutability violation on chain {chain} at position {position}: {reason}")]
    ImmutabilityViolation {
        chain: String,
        position: u64,
        reason: String,
    },

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}
