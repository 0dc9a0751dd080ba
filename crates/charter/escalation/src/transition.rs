//! Safety-level transition records and engine configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use charter_types::{
    Actor, AuthorizationMethod, ChainId, EvidenceBundle, SafetyLevel, TransitionType,
};

/// One row of the safety-level history. Rows are created on each transition
/// and never mutated; only the `is_current` mark moves, atomically, from the
/// old row to the new one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyTransition {
    pub from: SafetyLevel,
    pub to: SafetyLevel,
    /// Derived from the level ordering at transition time.
    pub transition_type: TransitionType,
    pub reason: String,
    pub authorized_by: Actor,
    pub authorization_method: AuthorizationMethod,
    pub evidence: EvidenceBundle,
    pub occurred_at: DateTime<Utc>,
    pub is_current: bool,
}

/// Result of a transition request: the current row afterwards, and whether
/// anything actually moved. A request targeting the level already in force
/// is a legitimate no-op (typically the loser of a race).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub record: SafetyTransition,
    pub transitioned: bool,
}

/// Thresholds and authorization bounds for the escalation engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Class-B discrepancies within the window that trigger one upgrade.
    pub class_b_threshold: usize,
    /// Rolling window for the class-B rule, in hours.
    pub class_b_window_hours: i64,
    /// Operational entries within the window that count as a velocity spike.
    pub velocity_threshold: usize,
    /// Rolling window for the velocity rule, in minutes.
    pub velocity_window_minutes: i64,
    /// Downgrading from at or above this level demands a manual override.
    pub manual_downgrade_floor: SafetyLevel,
    /// Chain that receives safety and kill-switch ledger entries.
    pub chain: ChainId,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            class_b_threshold: 5,
            class_b_window_hours: 7 * 24,
            velocity_threshold: 25,
            velocity_window_minutes: 60,
            manual_downgrade_floor: SafetyLevel::Orange,
            chain: ChainId::new("safety"),
        }
    }
}
