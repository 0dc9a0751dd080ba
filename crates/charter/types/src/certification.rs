//! Certification lifecycle status vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a certified artifact stands in its N-gate lifecycle.
///
/// Gate numbers map to statuses deterministically: recording gate `n` yields
/// `GateApproved(n)` until the final gate, which yields `FullyCertified`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationStatus {
    Pending,
    GateApproved(u8),
    FullyCertified,
    Suspended,
    Rejected,
}

impl fmt::Display for CertificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CertificationStatus::Pending => f.write_str("PENDING"),
            CertificationStatus::GateApproved(gate) => write!(f, "GATE_{gate}_APPROVED"),
            CertificationStatus::FullyCertified => f.write_str("FULLY_CERTIFIED"),
            CertificationStatus::Suspended => f.write_str("SUSPENDED"),
            CertificationStatus::Rejected => f.write_str("REJECTED"),
        }
    }
}
