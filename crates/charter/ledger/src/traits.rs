//! Reader/writer boundaries for the constitutional ledger.

use charter_types::{Actor, ChainId, EntryId};

use crate::entry::{AppendRequest, EntryHash, EntryRef, LedgerEntry};
use crate::error::LedgerError;

/// Write boundary: appends and the break-glass exception path.
pub trait LedgerWriter: Send + Sync {
    /// Append one entry to a chain. Hashes, position, id, and timestamp are
    /// computed here; the caller never supplies them.
    fn append(&self, chain: &ChainId, request: AppendRequest) -> Result<EntryRef, LedgerError>;

    /// The single sanctioned mutation path: replace a committed entry's
    /// payload with a redaction marker and record the exception as a new
    /// entry on the same chain, in one critical section.
    ///
    /// Unauthorized attempts are rejected and themselves logged as critical
    /// entries. Returns the reference of the exception entry.
    fn break_glass_redact(
        &self,
        chain: &ChainId,
        position: u64,
        actor: &Actor,
        authority: &str,
        reason: &str,
    ) -> Result<EntryRef, LedgerError>;
}

/// Read boundary: snapshot reads over committed entries; never blocks writers
/// beyond the brief state lock.
pub trait LedgerReader: Send + Sync {
    fn head(&self, chain: &ChainId) -> Result<Option<EntryRef>, LedgerError>;

    fn read_all(&self, chain: &ChainId) -> Result<Vec<LedgerEntry>, LedgerError>;

    /// Inclusive 1-based position range.
    fn read_range(
        &self,
        chain: &ChainId,
        from_position: u64,
        to_position: u64,
    ) -> Result<Vec<LedgerEntry>, LedgerError>;

    fn get_by_hash(&self, hash: EntryHash) -> Result<Option<LedgerEntry>, LedgerError>;

    fn chains(&self) -> Result<Vec<ChainId>, LedgerError>;

    /// All entries with id greater than `cursor`, across every chain,
    /// ordered by id. Threshold evaluation walks this.
    fn entries_since(&self, cursor: EntryId) -> Result<Vec<LedgerEntry>, LedgerError>;
}
