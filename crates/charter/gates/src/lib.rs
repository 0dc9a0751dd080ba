#![deny(unsafe_code)]
//! Charter change-gate state machine.
//!
//! Subjects (documents, modules, schema changes) are promoted through the
//! ordered gates G0–G4. Promotion demands the subject's required approver
//! signatures and a non-empty evidence bundle, never skips a level, and is
//! constrained by the current safety level read through
//! [`charter_types::SafetyLevelProvider`]. First entry to the freeze gate
//! captures a content hash that must never change again; every transition is
//! written to the ledger in the same critical section as the state change.

pub mod engine;
pub mod error;
pub mod record;

pub use engine::GateEngine;
pub use error::GateError;
pub use record::{GateConfig, GateRecord, SubjectGateView};
