//! Failure-mode lifecycle stages and retest cycle outcomes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle stage of a tracked failure mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Capture,
    Diagnosis,
    ActionDefinition,
    Retest,
    Closed,
}

impl FailureStage {
    /// The next forward stage, or `None` once closed.
    ///
    /// Closure itself is not a plain stage step: it only happens through the
    /// validator once enough consecutive passing cycles accumulate.
    pub fn next(self) -> Option<FailureStage> {
        match self {
            FailureStage::Capture => Some(FailureStage::Diagnosis),
            FailureStage::Diagnosis => Some(FailureStage::ActionDefinition),
            FailureStage::ActionDefinition => Some(FailureStage::Retest),
            FailureStage::Retest | FailureStage::Closed => None,
        }
    }
}

impl fmt::Display for FailureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureStage::Capture => "capture",
            FailureStage::Diagnosis => "diagnosis",
            FailureStage::ActionDefinition => "action_definition",
            FailureStage::Retest => "retest",
            FailureStage::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Outcome of one observation cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleResult {
    Pass,
    Fail,
    /// A failing cycle observed after the mode had already been closed.
    Regression,
}
