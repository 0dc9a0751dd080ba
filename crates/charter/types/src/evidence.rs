//! Evidence bundles and recorded signatures.

use serde::{Deserialize, Serialize};

/// References to the material backing a gate promotion, attestation, or
/// safety-level transition.
///
/// References are opaque locators (`obj://…`, ticket ids, report hashes);
/// resolution belongs to the collaborators that produced them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceBundle {
    pub references: Vec<String>,
    pub summary: String,
}

impl EvidenceBundle {
    pub fn from_references(references: Vec<String>) -> Self {
        Self {
            references,
            summary: String::new(),
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }
}

/// A signature as recorded on ledger entries and attestations.
///
/// The bytes and key reference are carried verbatim; cryptographic
/// verification happens at the collaborator boundary that produced them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Hex-encoded signature bytes.
    pub value: String,
    /// Reference to the signing key held by the key custodian.
    pub key_ref: String,
}

impl Signature {
    pub fn new(value: impl Into<String>, key_ref: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            key_ref: key_ref.into(),
        }
    }
}
