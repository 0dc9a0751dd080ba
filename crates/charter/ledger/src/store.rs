//! In-memory ledger store with optimistic compare-and-append.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use charter_types::{
    Actor, Capability, ChainId, DiscrepancyClass, EntryCategory, EntryId, EntryPayload, Severity,
};

use crate::canonical::{entry_hash, hex, sentinel_hash};
use crate::entry::{AppendRequest, EntryHash, EntryRef, LedgerEntry};
use crate::error::LedgerError;
use crate::traits::{LedgerReader, LedgerWriter};

/// Store bounds and retry policy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Upper bound on a payload's serialized size.
    pub max_payload_bytes: usize,
    /// How many times an append retries after losing the head race.
    pub append_retry_limit: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 64 * 1024,
            append_retry_limit: 5,
        }
    }
}

#[derive(Default)]
struct LedgerState {
    chains: HashMap<ChainId, Vec<LedgerEntry>>,
    hash_index: HashMap<EntryHash, (ChainId, usize)>,
    next_entry_id: u64,
}

/// In-memory reference implementation of the ledger boundaries.
///
/// Appends are optimistic: the head is snapshotted, the self hash is computed
/// with no lock held, and the commit re-checks the head under the write lock,
/// retrying up to the configured bound if another writer got there first. An
/// append either fully commits or leaves no trace.
pub struct InMemoryLedger {
    config: LedgerConfig,
    inner: RwLock<LedgerState>,
}

impl InMemoryLedger {
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(LedgerState::default()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn validate(&self, chain: &ChainId, request: &AppendRequest) -> Result<(), LedgerError> {
        if request.action.trim().is_empty() {
            return Err(LedgerError::Validation {
                chain: chain.to_string(),
                reason: "action must not be empty".into(),
            });
        }
        if !request.payload.matches_category(request.category) {
            return Err(LedgerError::Validation {
                chain: chain.to_string(),
                reason: format!(
                    "payload schema does not belong to category {}",
                    request.category
                ),
            });
        }
        let payload_len = serde_json::to_vec(&request.payload)
            .map_err(|error| LedgerError::Serialization(error.to_string()))?
            .len();
        if payload_len > self.config.max_payload_bytes {
            return Err(LedgerError::Validation {
                chain: chain.to_string(),
                reason: format!(
                    "payload is {payload_len} bytes, limit is {}",
                    self.config.max_payload_bytes
                ),
            });
        }
        Ok(())
    }

    /// Head snapshot for one chain: next position and the hash to link from.
    fn head_snapshot(state: &LedgerState, chain: &ChainId) -> (u64, EntryHash) {
        match state.chains.get(chain).and_then(|entries| entries.last()) {
            Some(last) => (last.chain_position + 1, last.self_hash),
            None => (1, sentinel_hash()),
        }
    }

    /// Append while already holding the write lock. Used for entries the
    /// store itself must write atomically with another mutation.
    fn append_locked(
        state: &mut LedgerState,
        chain: &ChainId,
        request: AppendRequest,
    ) -> Result<EntryRef, LedgerError> {
        let (position, previous_hash) = Self::head_snapshot(state, chain);
        let timestamp = Utc::now();
        let self_hash = entry_hash(
            request.category,
            &request.actor,
            &request.action,
            &previous_hash,
            &timestamp,
            &request.payload,
        )?;

        let entry = LedgerEntry {
            entry_id: EntryId(state.next_entry_id + 1),
            timestamp,
            category: request.category,
            severity: request.severity,
            discrepancy_class: request.discrepancy_class,
            actor: request.actor,
            action: request.action,
            target: request.target,
            payload: request.payload,
            authority: request.authority,
            previous_hash,
            self_hash,
            chain_id: chain.clone(),
            chain_position: position,
            signature: request.signature,
            redacted: false,
        };

        state.next_entry_id += 1;
        let entries = state.chains.entry(chain.clone()).or_default();
        entries.push(entry.clone());
        state
            .hash_index
            .insert(self_hash, (chain.clone(), entries.len() - 1));

        Ok(EntryRef::from(&entry))
    }

    fn read_state(&self) -> Result<std::sync::RwLockReadGuard<'_, LedgerState>, LedgerError> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write_state(&self) -> Result<std::sync::RwLockWriteGuard<'_, LedgerState>, LedgerError> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned)
    }

    #[cfg(test)]
    pub(crate) fn tamper_payload(&self, chain: &ChainId, position: u64, payload: EntryPayload) {
        let mut state = self.inner.write().unwrap();
        let entries = state.chains.get_mut(chain).unwrap();
        entries[(position - 1) as usize].payload = payload;
    }

    #[cfg(test)]
    pub(crate) fn tamper_previous_hash(&self, chain: &ChainId, position: u64, hash: EntryHash) {
        let mut state = self.inner.write().unwrap();
        let entries = state.chains.get_mut(chain).unwrap();
        entries[(position - 1) as usize].previous_hash = hash;
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

impl LedgerWriter for InMemoryLedger {
    fn append(&self, chain: &ChainId, request: AppendRequest) -> Result<EntryRef, LedgerError> {
        self.validate(chain, &request)?;

        for attempt in 1..=self.config.append_retry_limit {
            // Snapshot the head and do the expensive hashing with no lock held.
            let (position, previous_hash) = {
                let state = self.read_state()?;
                Self::head_snapshot(&state, chain)
            };
            let timestamp = Utc::now();
            let self_hash = entry_hash(
                request.category,
                &request.actor,
                &request.action,
                &previous_hash,
                &timestamp,
                &request.payload,
            )?;

            let mut state = self.write_state()?;
            let (current_position, current_previous) = Self::head_snapshot(&state, chain);
            if current_position != position || current_previous != previous_hash {
                debug!(
                    chain = %chain,
                    attempt,
                    expected_position = position,
                    found_position = current_position,
                    "append lost the head race, retrying"
                );
                continue;
            }

            let entry = LedgerEntry {
                entry_id: EntryId(state.next_entry_id + 1),
                timestamp,
                category: request.category,
                severity: request.severity,
                discrepancy_class: request.discrepancy_class,
                actor: request.actor.clone(),
                action: request.action.clone(),
                target: request.target.clone(),
                payload: request.payload.clone(),
                authority: request.authority.clone(),
                previous_hash,
                self_hash,
                chain_id: chain.clone(),
                chain_position: position,
                signature: request.signature.clone(),
                redacted: false,
            };

            state.next_entry_id += 1;
            let entries = state.chains.entry(chain.clone()).or_default();
            entries.push(entry.clone());
            let entry_index = entries.len() - 1;
            state
                .hash_index
                .insert(self_hash, (chain.clone(), entry_index));

            info!(
                chain = %chain,
                position,
                category = %entry.category,
                actor = %entry.actor,
                "ledger entry committed"
            );
            return Ok(EntryRef::from(&entry));
        }

        Err(LedgerError::AppendConflict {
            chain: chain.to_string(),
            attempts: self.config.append_retry_limit,
        })
    }

    fn break_glass_redact(
        &self,
        chain: &ChainId,
        position: u64,
        actor: &Actor,
        authority: &str,
        reason: &str,
    ) -> Result<EntryRef, LedgerError> {
        if position == 0 {
            return Err(LedgerError::NotFound {
                chain: chain.to_string(),
                position,
            });
        }

        let mut state = self.write_state()?;

        let index = (position - 1) as usize;
        let original_hash = {
            let entries = state
                .chains
                .get(chain)
                .ok_or_else(|| LedgerError::NotFound {
                    chain: chain.to_string(),
                    position,
                })?;
            let entry = entries.get(index).ok_or_else(|| LedgerError::NotFound {
                chain: chain.to_string(),
                position,
            })?;
            entry.self_hash
        };

        let authorized =
            actor.has_capability(Capability::BreakGlass) && !authority.trim().is_empty();
        if !authorized {
            // The rejection itself becomes part of the record.
            let attempt = AppendRequest::new(
                EntryCategory::Sovereignty,
                actor.clone(),
                "mutation.rejected",
                format!("{chain}#{position}"),
                EntryPayload::MutationAttempt {
                    chain_id: chain.clone(),
                    position,
                    detail: format!("break-glass refused: {reason}"),
                },
            )
            .with_severity(Severity::Critical)
            .with_discrepancy_class(DiscrepancyClass::A);
            Self::append_locked(&mut state, chain, attempt)?;

            warn!(chain = %chain, position, actor = %actor, "unauthorized mutation attempt");
            return Err(LedgerError::Unauthorized {
                actor: actor.to_string(),
                operation: "break-glass redaction".into(),
                chain: chain.to_string(),
            });
        }

        {
            let entries = state
                .chains
                .get_mut(chain)
                .ok_or_else(|| LedgerError::NotFound {
                    chain: chain.to_string(),
                    position,
                })?;
            let entry = &mut entries[index];
            entry.payload = EntryPayload::Redacted {
                original_self_hash: hex(&original_hash),
                reason: reason.to_string(),
            };
            entry.redacted = true;
        }

        warn!(chain = %chain, position, actor = %actor, "break-glass redaction applied");

        let exception = AppendRequest::new(
            EntryCategory::Sovereignty,
            actor.clone(),
            "breakglass.redact",
            format!("{chain}#{position}"),
            EntryPayload::BreakGlassException {
                chain_id: chain.clone(),
                position,
                original_self_hash: hex(&original_hash),
                reason: reason.to_string(),
            },
        )
        .with_severity(Severity::Critical)
        .with_authority(authority);

        Self::append_locked(&mut state, chain, exception)
    }
}

impl LedgerReader for InMemoryLedger {
    fn head(&self, chain: &ChainId) -> Result<Option<EntryRef>, LedgerError> {
        let state = self.read_state()?;
        Ok(state
            .chains
            .get(chain)
            .and_then(|entries| entries.last())
            .map(EntryRef::from))
    }

    fn read_all(&self, chain: &ChainId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let state = self.read_state()?;
        Ok(state.chains.get(chain).cloned().unwrap_or_default())
    }

    fn read_range(
        &self,
        chain: &ChainId,
        from_position: u64,
        to_position: u64,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        if from_position == 0 || to_position == 0 || from_position > to_position {
            return Err(LedgerError::Validation {
                chain: chain.to_string(),
                reason: format!("invalid position range {from_position}..={to_position}"),
            });
        }

        let state = self.read_state()?;
        let Some(entries) = state.chains.get(chain) else {
            return Ok(vec![]);
        };

        let start = (from_position - 1) as usize;
        if start >= entries.len() {
            return Ok(vec![]);
        }
        let end_exclusive = to_position.min(entries.len() as u64) as usize;
        Ok(entries[start..end_exclusive].to_vec())
    }

    fn get_by_hash(&self, hash: EntryHash) -> Result<Option<LedgerEntry>, LedgerError> {
        let state = self.read_state()?;
        let Some((chain, index)) = state.hash_index.get(&hash) else {
            return Ok(None);
        };
        Ok(state
            .chains
            .get(chain)
            .and_then(|entries| entries.get(*index))
            .cloned())
    }

    fn chains(&self) -> Result<Vec<ChainId>, LedgerError> {
        let state = self.read_state()?;
        let mut ids: Vec<_> = state.chains.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn entries_since(&self, cursor: EntryId) -> Result<Vec<LedgerEntry>, LedgerError> {
        let state = self.read_state()?;
        let mut entries: Vec<_> = state
            .chains
            .values()
            .flatten()
            .filter(|entry| entry.entry_id > cursor)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.entry_id);
        Ok(entries)
    }
}
