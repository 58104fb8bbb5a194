//! Run reports: the per-step record a run leaves behind.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plan::StepActor;

/// Status of an executed step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StepStatus {
    /// Step did not run because an earlier step failed.
    Skipped,
    /// Step executed and returned successfully.
    Succeeded,
    /// Step attempted but returned an error.
    Failed,
}

/// Record of one step execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// Step identifier from the plan.
    pub id: String,
    /// Identity that signed the step.
    pub actor: StepActor,
    /// Final status of this step execution.
    pub status: StepStatus,
    /// Step-specific output, such as created ids or read balances.
    pub detail: Value,
    /// Error message when the step failed.
    pub error: Option<String>,
    /// Wall-clock execution time in milliseconds.
    pub duration_ms: u64,
}

/// How a run ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every step succeeded.
    Completed,
    /// A step failed; the named step is where the run stopped.
    Halted { step: String },
}

/// Complete record of one run: every step in plan order plus the overall
/// outcome. Steps after a failure appear as [`StepStatus::Skipped`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished or halted.
    pub finished_at: DateTime<Utc>,
    /// Whether the run completed, and if not, where it stopped.
    pub outcome: RunOutcome,
    /// One report per planned step, in plan order.
    pub steps: Vec<StepReport>,
}

impl RunReport {
    /// Whether every step succeeded.
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    /// The report of the step that halted the run, if any did.
    pub fn failed_step(&self) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.status == StepStatus::Failed)
    }

    /// The report recorded under the given step id.
    pub fn step(&self, id: &str) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.id == id)
    }
}
