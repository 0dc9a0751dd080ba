//! Chain integrity verification.
//!
//! The verifier walks a chain in position order and recomputes every self
//! hash from canonical entry content. It never mutates anything; turning a
//! broken finding into a ledger entry is the caller's obligation.

use serde::{Deserialize, Serialize};
use tracing::warn;

use charter_types::ChainId;

use crate::canonical::{recompute_self_hash, sentinel_hash};
use crate::error::LedgerError;
use crate::traits::LedgerReader;

/// Overall verdict for one chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChainStatus {
    Valid,
    Partial,
    Broken,
}

/// What the verifier found, derived on demand and never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub chain_id: ChainId,
    pub total_entries: u64,
    pub valid_entries: u64,
    pub broken_links: u64,
    pub status: ChainStatus,
    pub first_break_position: Option<u64>,
}

impl IntegrityReport {
    pub fn is_broken(&self) -> bool {
        self.status == ChainStatus::Broken
    }
}

/// Read-only walker over chain entries.
pub struct ChainVerifier;

impl ChainVerifier {
    /// Verify up to `limit` entries of a chain (all of them when `None`).
    ///
    /// An entry is sound iff its recomputed self hash matches the stored one,
    /// its stored `previous_hash` matches the prior entry's recomputed self
    /// hash (the sentinel at position 1), and its position is the successor
    /// of the previous position. Once one entry breaks, custody of everything
    /// after it is lost, so all later entries count as broken links.
    pub fn verify_chain<R: LedgerReader>(
        reader: &R,
        chain: &ChainId,
        limit: Option<usize>,
    ) -> Result<IntegrityReport, LedgerError> {
        let mut entries = reader.read_all(chain)?;
        if let Some(limit) = limit {
            entries.truncate(limit);
        }

        let mut valid_entries = 0u64;
        let mut broken_links = 0u64;
        let mut first_break_position = None;
        let mut expected_previous = sentinel_hash();
        let mut custody_intact = true;

        for (index, entry) in entries.iter().enumerate() {
            let position = (index + 1) as u64;
            let recomputed = recompute_self_hash(entry)?;

            let sound = custody_intact
                && entry.chain_position == position
                && entry.previous_hash == expected_previous
                && entry.self_hash == recomputed;

            if sound {
                valid_entries += 1;
            } else {
                broken_links += 1;
                if first_break_position.is_none() {
                    first_break_position = Some(position);
                }
                custody_intact = false;
            }

            expected_previous = recomputed;
        }

        let status = if broken_links == 0 {
            ChainStatus::Valid
        } else if broken_links < valid_entries {
            ChainStatus::Partial
        } else {
            ChainStatus::Broken
        };

        if status != ChainStatus::Valid {
            warn!(
                chain = %chain,
                broken_links,
                first_break = first_break_position,
                "chain verification found broken links"
            );
        }

        Ok(IntegrityReport {
            chain_id: chain.clone(),
            total_entries: entries.len() as u64,
            valid_entries,
            broken_links,
            status,
            first_break_position,
        })
    }
}
