//! Aggregated control-plane configuration.

use serde::{Deserialize, Serialize};

use charter_attestation::CertificationConfig;
use charter_escalation::EscalationConfig;
use charter_gates::GateConfig;
use charter_ledger::LedgerConfig;
use charter_retest::RetestConfig;
use charter_types::ChainId;

/// Configuration for the whole control plane, deserializable from one
/// document and defaulting to the documented per-engine thresholds.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CharterConfig {
    pub ledger: LedgerConfig,
    pub gates: GateConfig,
    pub certification: CertificationConfig,
    pub escalation: EscalationConfig,
    pub retest: RetestConfig,
    /// Chain that receives verification findings raised by the facade.
    pub integrity_chain: ChainId,
}

impl Default for CharterConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            gates: GateConfig::default(),
            certification: CertificationConfig::default(),
            escalation: EscalationConfig::default(),
            retest: RetestConfig::default(),
            integrity_chain: ChainId::new("integrity"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_engine() {
        let config = CharterConfig::default();
        assert_eq!(config.escalation.class_b_threshold, 5);
        assert_eq!(config.retest.consecutive_passes, 7);
        assert_eq!(config.certification.gate_count, 6);
        assert_eq!(config.integrity_chain, ChainId::new("integrity"));
    }

    #[test]
    fn partial_documents_fill_in_defaults() {
        let document = r#"{
            "escalation": {
                "class_b_threshold": 3,
                "class_b_window_hours": 24,
                "velocity_threshold": 10,
                "velocity_window_minutes": 30,
                "manual_downgrade_floor": "orange",
                "chain": "safety"
            }
        }"#;
        let config: CharterConfig = serde_json::from_str(document).unwrap();
        assert_eq!(config.escalation.class_b_threshold, 3);
        assert_eq!(config.retest.consecutive_passes, 7);
    }
}
