#![deny(unsafe_code)]
//! Charter certification registry.
//!
//! A parallel N-gate lifecycle (default six gates) keyed by
//! (subject, version). Gate issuances map deterministically to statuses —
//! gate 1 yields `GATE_1_APPROVED`, the final gate `FULLY_CERTIFIED` — and
//! every issuance, suspension, and reinstatement is recorded as a
//! certification ledger entry the returned attestation points back to.
//! Suspension arrives from the escalation path independent of forward gate
//! progress.

pub mod error;
pub mod registry;

pub use error::AttestationError;
pub use registry::{
    Attestation, CertificationConfig, CertificationRegistry, CertificationTrack, GateIssuance,
};
