use crate::error::BugKind;
use crate::status::OperationStatus;
use crate::trace::ScheduleTrace;

/// Counts of operations in each status at the end of an iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OperationCounts {
    pub enabled: u32,
    pub blocked: u32,
    pub completed: u32,
}

impl OperationCounts {
    pub fn record(&mut self, status: OperationStatus) {
        if status.is_enabled() {
            self.enabled += 1;
        } else if status.is_blocked() {
            self.blocked += 1;
        } else if status.is_completed() {
            self.completed += 1;
        }
    }
}

/// Outcome of a single exploration iteration (§2, §4.6).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum IterationOutcome {
    /// Every operation completed without triggering a bug.
    Success,
    /// A bug was found and recorded onto the trace.
    Bug(BugKind),
    /// The configured scheduling-step bound was exceeded.
    MaxStepsReached,
    /// A previously recorded trace no longer applies under replay.
    ReplayDivergence { step: u64, detail: String },
}

impl IterationOutcome {
    pub fn is_bug(&self) -> bool {
        matches!(self, IterationOutcome::Bug(_))
    }
}

/// Structured report for one iteration (§6 Reports: the in-scope,
/// serde-serializable half of the report; writing it to disk or
/// uploading it is left to the caller).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct IterationReport {
    pub iteration: u32,
    pub outcome: IterationOutcome,
    pub operations: OperationCounts,
    pub uncontrolled_invocations: Vec<String>,
    pub trace: ScheduleTrace,
}

/// Structured report for an entire exploration run across iterations.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct RunReport {
    pub iterations: Vec<IterationReport>,
}

impl RunReport {
    pub fn push(&mut self, report: IterationReport) {
        self.iterations.push(report);
    }

    /// The first iteration, if any, that found a bug.
    pub fn first_bug(&self) -> Option<&IterationReport> {
        self.iterations.iter().find(|report| report.outcome.is_bug())
    }

    pub fn iterations_run(&self) -> usize {
        self.iterations.len()
    }
}
