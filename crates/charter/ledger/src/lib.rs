#![deny(unsafe_code)]
//! Charter constitutional ledger: append-only, hash-chained, partitioned
//! into named chains.
//!
//! This crate provides:
//! - append-only reader/writer trait boundaries ([`LedgerReader`],
//!   [`LedgerWriter`]) with an in-memory implementation for runtime use,
//!   tests, and demos
//! - canonical entry serialization and blake3 hashing
//!   ([`canonical::entry_hash`], [`canonical::sentinel_hash`])
//! - optimistic compare-and-append on chain position with a bounded retry
//! - the break-glass redaction path, the only sanctioned mutation of
//!   committed history, always paired with an exception entry
//! - the read-only chain integrity verifier ([`ChainVerifier`])

pub mod canonical;
pub mod entry;
pub mod error;
pub mod store;
pub mod traits;
pub mod verify;

pub use entry::{AppendRequest, EntryHash, EntryRef, LedgerEntry};
pub use error::LedgerError;
pub use store::{InMemoryLedger, LedgerConfig};
pub use traits::{LedgerReader, LedgerWriter};
pub use verify::{ChainStatus, ChainVerifier, IntegrityReport};
