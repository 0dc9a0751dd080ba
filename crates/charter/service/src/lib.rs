#![deny(unsafe_code)]
//! Charter control-plane service boundary.
//!
//! This crate provides:
//! - the async [`ControlPlane`] trait — the logical service boundary over
//!   appends, verification, gate advancement, attestation, threshold
//!   evaluation, safety transitions, and retest closure
//! - [`CharterService`], wiring one shared in-memory ledger through every
//!   engine and enforcing actor capabilities and kill-switch halts ahead of
//!   the writes
//! - aggregated configuration ([`CharterConfig`])
//! - read-only dashboard projections ([`ProjectionBuilder`]) that are never
//!   used to drive writes

pub mod config;
pub mod error;
pub mod projection;
pub mod service;

pub use config::CharterConfig;
pub use error::ServiceError;
pub use projection::{
    ChainIntegrityProjection, DashboardProjection, ProjectionBuilder, SafetyProjection,
};
pub use service::{CharterService, ControlPlane};
