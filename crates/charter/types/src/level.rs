//! The global safety posture and how movements between levels are classified.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered global risk posture. Exactly one level is current at any time.
///
/// The ordering is total: `Green < Yellow < Orange < Red < Black`. Orange and
/// above freezes standard-class gate advancement; Black halts all of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyLevel {
    Green,
    Yellow,
    Orange,
    Red,
    Black,
}

impl SafetyLevel {
    /// The resting posture the platform returns to on reset.
    pub const BASELINE: SafetyLevel = SafetyLevel::Green;

    /// The next level up, or `None` at `Black`.
    pub fn next_more_severe(self) -> Option<SafetyLevel> {
        match self {
            SafetyLevel::Green => Some(SafetyLevel::Yellow),
            SafetyLevel::Yellow => Some(SafetyLevel::Orange),
            SafetyLevel::Orange => Some(SafetyLevel::Red),
            SafetyLevel::Red => Some(SafetyLevel::Black),
            SafetyLevel::Black => None,
        }
    }
}

impl fmt::Display for SafetyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SafetyLevel::Green => "green",
            SafetyLevel::Yellow => "yellow",
            SafetyLevel::Orange => "orange",
            SafetyLevel::Red => "red",
            SafetyLevel::Black => "black",
        };
        f.write_str(name)
    }
}

/// Direction of a safety-level transition.
///
/// Always derived from the level ordering, never asserted independently.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionType {
    Upgrade,
    Downgrade,
    Reset,
}

impl TransitionType {
    /// Classify a movement between two distinct levels.
    ///
    /// Returns `None` when the levels are equal (a no-op, not a transition).
    /// Returning to [`SafetyLevel::BASELINE`] is a reset rather than a plain
    /// downgrade.
    pub fn between(from: SafetyLevel, to: SafetyLevel) -> Option<TransitionType> {
        if from == to {
            None
        } else if to > from {
            Some(TransitionType::Upgrade)
        } else if to == SafetyLevel::BASELINE {
            Some(TransitionType::Reset)
        } else {
            Some(TransitionType::Downgrade)
        }
    }
}

/// How a transition was authorized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthorizationMethod {
    /// Threshold-triggered by the escalation engine.
    Automatic,
    /// Manual override carrying the elevated-authority reference.
    Elevated(String),
}

impl AuthorizationMethod {
    pub fn is_automatic(&self) -> bool {
        matches!(self, AuthorizationMethod::Automatic)
    }
}

/// Read seam for the current safety level.
///
/// The gate engine consumes this instead of depending on the escalation
/// engine directly, the same way adjudication pipelines consume policy
/// through a provider trait.
pub trait SafetyLevelProvider: Send + Sync {
    fn current_level(&self) -> SafetyLevel;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_form_a_total_order() {
        assert!(SafetyLevel::Green < SafetyLevel::Yellow);
        assert!(SafetyLevel::Yellow < SafetyLevel::Orange);
        assert!(SafetyLevel::Orange < SafetyLevel::Red);
        assert!(SafetyLevel::Red < SafetyLevel::Black);
    }

    #[test]
    fn next_more_severe_walks_up() {
        assert_eq!(
            SafetyLevel::Green.next_more_severe(),
            Some(SafetyLevel::Yellow)
        );
        assert_eq!(SafetyLevel::Black.next_more_severe(), None);
    }

    #[test]
    fn transition_type_is_derived_from_ordering() {
        assert_eq!(
            TransitionType::between(SafetyLevel::Yellow, SafetyLevel::Red),
            Some(TransitionType::Upgrade)
        );
        assert_eq!(
            TransitionType::between(SafetyLevel::Red, SafetyLevel::Orange),
            Some(TransitionType::Downgrade)
        );
        assert_eq!(
            TransitionType::between(SafetyLevel::Red, SafetyLevel::Green),
            Some(TransitionType::Reset)
        );
        assert_eq!(
            TransitionType::between(SafetyLevel::Orange, SafetyLevel::Orange),
            None
        );
    }
}
