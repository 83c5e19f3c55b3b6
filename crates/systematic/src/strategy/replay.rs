use systematic_core::{OperationId, ScheduleTrace, TraceEntry};

use super::{SchedulingHint, Strategy};

/// Reproduces a recorded schedule exactly (§3 Replay(trace), §4.6 Replay
/// mode).
///
/// Every call asserts the recorded choice is still valid — an operation
/// id that exists and is enabled, or a value in range — exactly as §4.6
/// specifies; any mismatch is recorded as a replay divergence rather than
/// panicking, so the engine can report it as a normal iteration outcome.
pub struct ReplayStrategy {
    trace: ScheduleTrace,
    cursor: usize,
    divergence: Option<(u64, String)>,
}

impl ReplayStrategy {
    pub fn new(trace: ScheduleTrace) -> Self {
        ReplayStrategy {
            trace,
            cursor: 0,
            divergence: None,
        }
    }

    fn diverge(&mut self, detail: impl Into<String>) {
        if self.divergence.is_none() {
            self.divergence = Some((self.cursor as u64, detail.into()));
        }
    }
}

impl Strategy for ReplayStrategy {
    fn next_operation(
        &mut self,
        enabled: &[OperationId],
        _current: Option<OperationId>,
        _hint: SchedulingHint,
    ) -> OperationId {
        if self.divergence.is_some() {
            return super::smallest_id(enabled);
        }

        match self.trace.entries.get(self.cursor).cloned() {
            Some(TraceEntry::Op { op, .. }) => {
                self.cursor += 1;
                if enabled.contains(&op) {
                    op
                } else {
                    self.diverge(format!("recorded operation {op} is not enabled"));
                    super::smallest_id(enabled)
                }
            }
            other => {
                self.diverge(format!("expected an operation decision, found {other:?}"));
                super::smallest_id(enabled)
            }
        }
    }

    fn next_bool(&mut self) -> bool {
        if self.divergence.is_some() {
            return false;
        }
        match self.trace.entries.get(self.cursor).cloned() {
            Some(TraceEntry::Bool(value)) => {
                self.cursor += 1;
                value
            }
            other => {
                self.diverge(format!("expected a boolean decision, found {other:?}"));
                false
            }
        }
    }

    fn next_int(&mut self, max: u64) -> u64 {
        if self.divergence.is_some() {
            return 0;
        }
        match self.trace.entries.get(self.cursor).cloned() {
            Some(TraceEntry::Int(value)) => {
                self.cursor += 1;
                if max == 0 || value < max {
                    value
                } else {
                    self.diverge(format!("recorded integer {value} is out of range [0, {max})"));
                    0
                }
            }
            other => {
                self.diverge(format!("expected an integer decision, found {other:?}"));
                0
            }
        }
    }

    fn prepare_next_iteration(&mut self, iteration: u32) -> bool {
        self.cursor = 0;
        // A replayed trace describes exactly one execution.
        iteration == 1
    }

    fn take_divergence(&mut self) -> Option<(u64, String)> {
        self.divergence.take()
    }

    fn description(&self) -> String {
        format!("replay({})", self.trace.strategy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use systematic_core::SchedulingPointType;

    fn sample_trace() -> ScheduleTrace {
        let mut trace = ScheduleTrace::new("random", 9);
        trace.push(TraceEntry::Op {
            point: SchedulingPointType::Create,
            op: OperationId::new(0),
        });
        trace.push(TraceEntry::Bool(true));
        trace.push(TraceEntry::Int(2));
        trace
    }

    #[test]
    fn replays_recorded_decisions_verbatim() {
        let mut strategy = ReplayStrategy::new(sample_trace());
        let enabled = [OperationId::new(0), OperationId::new(1)];
        assert_eq!(
            strategy.next_operation(&enabled, None, SchedulingHint::default()),
            OperationId::new(0)
        );
        assert!(strategy.next_bool());
        assert_eq!(strategy.next_int(10), 2);
        assert!(strategy.take_divergence().is_none());
    }

    #[test]
    fn missing_operation_is_reported_as_divergence() {
        let mut strategy = ReplayStrategy::new(sample_trace());
        let enabled = [OperationId::new(5)];
        strategy.next_operation(&enabled, None, SchedulingHint::default());
        assert!(strategy.take_divergence().is_some());
    }
}
