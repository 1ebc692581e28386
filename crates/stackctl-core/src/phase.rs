use serde::{Deserialize, Serialize};

/// Where a single operation kind currently is in its launch pipeline.
///
/// Operations progress linearly through phases:
/// Idle → Confirming → Submitting → Polling → Idle
///
/// `Confirming` and `Submitting` may also fall back to `Idle` directly
/// (user cancellation, validation or submission error).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationPhase {
    /// Nothing running; a new launch is accepted
    #[default]
    Idle,
    /// Waiting on the user to confirm (or pick a download-reminder option)
    Confirming,
    /// Submit request sent, no task id yet
    Submitting,
    /// Task id received, poller watching it
    Polling,
}

impl OperationPhase {
    /// Returns true while an operation of this kind is outstanding.
    pub fn is_busy(&self) -> bool {
        !matches!(self, OperationPhase::Idle)
    }

    /// Returns a human-readable name for the phase.
    pub fn display_name(&self) -> &'static str {
        match self {
            OperationPhase::Idle => "Idle",
            OperationPhase::Confirming => "Confirming",
            OperationPhase::Submitting => "Submitting",
            OperationPhase::Polling => "Polling",
        }
    }
}
