#![deny(unsafe_code)]
//! Charter escalation / circuit-breaker engine.
//!
//! This crate owns the single current safety level. Threshold evaluation
//! reads committed ledger entries through per-rule cursors and upgrades the
//! level automatically — exactly once per breach; downgrades from elevated
//! postures demand a manual override. Independent kill-switches halt scoped
//! operation classes until explicitly reset. Every movement is written to
//! the ledger in the same critical section as the state change, and the
//! engine implements [`charter_types::SafetyLevelProvider`] for the gate
//! machine.

pub mod engine;
pub mod error;
pub mod switches;
pub mod transition;

pub use engine::EscalationEngine;
pub use error::EscalationError;
pub use switches::{KillSwitch, KillSwitchPanel};
pub use transition::{EscalationConfig, SafetyTransition, TransitionOutcome};
