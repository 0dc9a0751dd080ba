//! Canonical entry serialization and hashing.
//!
//! The self hash covers `(category, actor, action, previous_hash, timestamp,
//! payload)` in a fixed line order, with timestamps rendered as UTC RFC 3339
//! at microsecond precision and absent values rendered as explicit `null`
//! markers, so any consumer can recompute the digest byte-for-byte.

use chrono::{DateTime, SecondsFormat, Utc};

use charter_types::{Actor, EntryCategory, EntryPayload};

use crate::entry::{EntryHash, LedgerEntry};
use crate::error::LedgerError;

/// Domain-separation prefix for entry hashing.
pub const HASH_DOMAIN: &[u8] = b"charter-ledger-entry-v1:";

/// The `previous_hash` of the first entry in every chain: the digest of the
/// domain prefix alone, reproducible without any stored state.
pub fn sentinel_hash() -> EntryHash {
    *blake3::hash(HASH_DOMAIN).as_bytes()
}

/// Render the hashed fields in canonical form.
pub fn canonical_bytes(
    category: EntryCategory,
    actor: &Actor,
    action: &str,
    previous_hash: &EntryHash,
    timestamp: &DateTime<Utc>,
    payload: &EntryPayload,
) -> Result<Vec<u8>, LedgerError> {
    let actor_json = serde_json::to_string(actor)
        .map_err(|error| LedgerError::Serialization(error.to_string()))?;
    let payload_json = serde_json::to_string(payload)
        .map_err(|error| LedgerError::Serialization(error.to_string()))?;

    let canonical = format!(
        "category={category}\nactor={actor_json}\naction={action}\nprevious_hash={}\ntimestamp={}\npayload={payload_json}\n",
        hex(previous_hash),
        timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
    );
    Ok(canonical.into_bytes())
}

/// Compute an entry's self hash from its canonical form.
pub fn entry_hash(
    category: EntryCategory,
    actor: &Actor,
    action: &str,
    previous_hash: &EntryHash,
    timestamp: &DateTime<Utc>,
    payload: &EntryPayload,
) -> Result<EntryHash, LedgerError> {
    let canonical = canonical_bytes(category, actor, action, previous_hash, timestamp, payload)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(HASH_DOMAIN);
    hasher.update(&canonical);
    Ok(*hasher.finalize().as_bytes())
}

/// Recompute the self hash of a committed entry from its stored fields.
pub fn recompute_self_hash(entry: &LedgerEntry) -> Result<EntryHash, LedgerError> {
    entry_hash(
        entry.category,
        &entry.actor,
        &entry.action,
        &entry.previous_hash,
        &entry.timestamp,
        &entry.payload,
    )
}

/// Lowercase hex rendering of a hash.
pub fn hex(hash: &EntryHash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}
