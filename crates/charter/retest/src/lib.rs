#![deny(unsafe_code)]
//! Charter retest / closure validator.
//!
//! Failure modes move capture → diagnosis → action definition → retest, then
//! close only after the configured number of consecutive passing observation
//! cycles (default seven). A failing cycle against a closed mode is a
//! regression: it reopens the mode and increments the reopen count by
//! exactly one. Reopen counts past the configured limit are reported as an
//! architectural-flaw signal, never auto-remediated. Every decision lands on
//! the compliance chain.

pub mod error;
pub mod validator;

pub use error::RetestError;
pub use validator::{
    CycleObservation, FailureMode, FailureModeReport, ReopenEvent, ReopenTrigger, RetestConfig,
    RetestCycle, RetestValidator,
};
