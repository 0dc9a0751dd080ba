#![deny(unsafe_code)]
//! Shared vocabulary for the Charter control plane.
//!
//! This crate provides:
//! - **Actors and capabilities** ([`Actor`], [`Capability`]) — every platform
//!   participant is an enumerated actor with a static capability set, never a
//!   free-text string.
//! - **Entry classification** ([`EntryCategory`], [`Severity`],
//!   [`DiscrepancyClass`]) for ledger entries.
//! - **Safety posture** ([`SafetyLevel`], [`TransitionType`],
//!   [`AuthorizationMethod`], [`SafetyLevelProvider`]) — the ordered global
//!   risk level and how transitions between levels are classified.
//! - **Gate, certification, retest, and kill-switch vocabulary** shared by
//!   the engines and the ledger payloads they write.
//! - **Payload schemas** ([`EntryPayload`]) — a schema-versioned tagged union
//!   validated against the entry category at append time.
//! - **Evidence and signatures** ([`EvidenceBundle`], [`Signature`]).
//! - **Identifier newtypes** ([`ChainId`], [`SubjectId`], [`FailureModeId`],
//!   [`EntryId`]).

pub mod actor;
pub mod category;
pub mod certification;
pub mod evidence;
pub mod gate;
pub mod ids;
pub mod level;
pub mod payload;
pub mod retest;
pub mod switches;

// Re-exports for convenience.
pub use actor::{Actor, Capability};
pub use category::{DiscrepancyClass, EntryCategory, Severity};
pub use certification::CertificationStatus;
pub use evidence::{EvidenceBundle, Signature};
pub use gate::{GateClass, GateLevel, GateStatus};
pub use ids::{ChainId, EntryId, FailureModeId, SubjectId};
pub use level::{AuthorizationMethod, SafetyLevel, SafetyLevelProvider, TransitionType};
pub use payload::EntryPayload;
pub use retest::{CycleResult, FailureStage};
pub use switches::{KillSwitchKind, KillSwitchScope, KillSwitchState};
