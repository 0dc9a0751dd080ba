//! Gate engine error types.

use thiserror::Error;

use charter_ledger::LedgerError;
use charter_types::{GateLevel, SafetyLevel};

/// Errors that can occur while promoting subjects through gates.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("subject {0} is not registered")]
    UnknownSubject(String),

    #[error("subject {0} is already registered")]
    AlreadyRegistered(String),

    /// Level skipping or an out-of-order promotion request.
    #[error("subject {subject}: cannot advance to {requested}, next eligible gate is {expected}")]
    Sequence {
        subject: String,
        requested: GateLevel,
        expected: GateLevel,
    },

    /// Exit criteria unmet: required approvers have not signed.
    #[error("subject {subject}: missing required approver signatures: {missing}")]
    MissingApprovers { subject: String, missing: String },

    /// The current safety level freezes this subject's gate class.
    #[error("subject {subject}: gate advancement frozen at safety level {level}")]
    SafetyHold {
        subject: String,
        level: SafetyLevel,
    },

    #[error("subject {subject}: {reason}")]
    Validation { subject: String, reason: String },

    /// The actor lacks the capability or elevated authority required.
    #[error("subject {subject}: {actor} is not authorized to {operation}")]
    Unauthorized {
        subject: String,
        actor: String,
        operation: String,
    },

    /// Frozen-content divergence or another constitutional breach. Always
    /// paired with a discrepancy-class-A ledger entry.
    #[error("constitutional violation on subject {subject}: {reason}")]
    ConstitutionalViolation { subject: String, reason: String },

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
