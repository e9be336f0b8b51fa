use serde::{Deserialize, Serialize};

/// Where a sweep is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepPhase {
    Idle,
    Sweeping,
    Finalizing,
    Done,
}

/// A grid point that produced no row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedPoint {
    pub sequence: usize,
    pub tag: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failures: Vec<FailedPoint>,
}

impl SweepSummary {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}
