//! Ledger entries and append requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use charter_types::{
    Actor, ChainId, DiscrepancyClass, EntryCategory, EntryId, EntryPayload, Severity, Signature,
};

/// 32-byte blake3 digest linking entries into a chain.
pub type EntryHash = [u8; 32];

/// One committed, immutable row of the constitutional ledger.
///
/// Entries are created once by [`crate::InMemoryLedger::append`] and never
/// change afterwards; the only sanctioned exception is the break-glass
/// redaction path, which swaps the payload for
/// [`EntryPayload::Redacted`] and leaves every hash in place so the
/// intervention stays visible to the verifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_id: EntryId,
    pub timestamp: DateTime<Utc>,
    pub category: EntryCategory,
    pub severity: Severity,
    pub discrepancy_class: DiscrepancyClass,
    pub actor: Actor,
    pub action: String,
    pub target: String,
    pub payload: EntryPayload,
    /// Reference to the mandate under which the actor acted.
    pub authority: String,
    pub previous_hash: EntryHash,
    pub self_hash: EntryHash,
    pub chain_id: ChainId,
    /// 1-based position within the chain; strictly increases by one.
    pub chain_position: u64,
    pub signature: Option<Signature>,
    /// Set only by the break-glass path.
    pub redacted: bool,
}

/// Compact reference to a committed entry, returned from appends.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRef {
    pub entry_id: EntryId,
    pub chain_id: ChainId,
    pub chain_position: u64,
    pub self_hash: EntryHash,
}

impl From<&LedgerEntry> for EntryRef {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            entry_id: entry.entry_id,
            chain_id: entry.chain_id.clone(),
            chain_position: entry.chain_position,
            self_hash: entry.self_hash,
        }
    }
}

/// Everything a writer supplies for one append; ids, hashes, position, and
/// timestamp are computed by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppendRequest {
    pub category: EntryCategory,
    pub severity: Severity,
    pub discrepancy_class: DiscrepancyClass,
    pub actor: Actor,
    pub action: String,
    pub target: String,
    pub payload: EntryPayload,
    pub authority: String,
    pub signature: Option<Signature>,
}

impl AppendRequest {
    pub fn new(
        category: EntryCategory,
        actor: Actor,
        action: impl Into<String>,
        target: impl Into<String>,
        payload: EntryPayload,
    ) -> Self {
        Self {
            category,
            severity: Severity::Info,
            discrepancy_class: DiscrepancyClass::None,
            actor,
            action: action.into(),
            target: target.into(),
            payload,
            authority: String::new(),
            signature: None,
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_discrepancy_class(mut self, class: DiscrepancyClass) -> Self {
        self.discrepancy_class = class;
        self
    }

    pub fn with_authority(mut self, authority: impl Into<String>) -> Self {
        self.authority = authority.into();
        self
    }

    pub fn with_signature(mut self, signature: Signature) -> Self {
        self.signature = Some(signature);
        self
    }
}
