mod dfs;
mod pct;
mod probabilistic;
mod random;
mod replay;
mod rl;

pub use dfs::DfsStrategy;
pub use pct::PctStrategy;
pub use probabilistic::ProbabilisticStrategy;
pub use random::RandomStrategy;
pub use replay::ReplayStrategy;
pub use rl::RlStrategy;

use systematic_core::{OperationId, StrategyKind};

/// Extra context a strategy may consult beyond the enabled set and the
/// currently executing operation; today this only carries the fairness
/// signal FairPCT needs (§3 FairPCT).
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulingHint {
    /// Set once some registered monitor's liveness temperature has
    /// crossed a configured fraction of the bug threshold, asking the
    /// strategy to bias towards breaking potential livelocks.
    pub hot_monitor_critical: bool,
}

/// Stateful chooser consulted at every scheduling point and every
/// non-deterministic choice (§3 Strategy).
pub trait Strategy: Send {
    fn next_operation(
        &mut self,
        enabled: &[OperationId],
        current: Option<OperationId>,
        hint: SchedulingHint,
    ) -> OperationId;

    fn next_bool(&mut self) -> bool;

    /// Returns a value in `[0, max)`. `max` of zero always yields zero.
    fn next_int(&mut self, max: u64) -> u64;

    /// Returns a delay in `[0, max)` real milliseconds, used only by the
    /// Fuzzing policy (§4.2 DelayOperation).
    fn next_delay(&mut self, max: u64) -> u64 {
        self.next_int(max)
    }

    /// Called once at the start of every iteration, including the
    /// first. Returning false stops the exploration driver.
    fn prepare_next_iteration(&mut self, iteration: u32) -> bool {
        let _ = iteration;
        true
    }

    /// Called once an iteration's outcome is known, before the next
    /// call to `prepare_next_iteration`. Only `RlStrategy` uses this.
    fn finish_iteration(&mut self, bug_found: bool, novel_trace: bool) {
        let _ = (bug_found, novel_trace);
    }

    /// If this strategy detected that a replayed trace no longer
    /// applies, returns the step and a description of the mismatch.
    fn take_divergence(&mut self) -> Option<(u64, String)> {
        None
    }

    fn description(&self) -> String;
}

/// Smallest-operation-id tie-break rule used throughout (§4.2 Tie-breaks,
/// and the pinned resolution for `WhenAny` recorded in DESIGN.md).
pub fn smallest_id(enabled: &[OperationId]) -> OperationId {
    *enabled
        .iter()
        .min()
        .expect("next_operation is never called with an empty enabled set")
}

/// Builds the strategy selected by `StrategyKind`, seeded deterministically.
pub fn build(kind: StrategyKind, seed: u64) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::Random => Box::new(RandomStrategy::new(seed)),
        StrategyKind::Probabilistic { priority_bits } => {
            Box::new(ProbabilisticStrategy::new(seed, priority_bits))
        }
        StrategyKind::Pct { priority_changes, fair } => {
            Box::new(PctStrategy::new(seed, priority_changes, fair))
        }
        StrategyKind::Dfs => Box::new(DfsStrategy::new()),
        StrategyKind::Replay { trace } => Box::new(ReplayStrategy::new(trace)),
        StrategyKind::Rl => Box::new(RlStrategy::new(seed)),
    }
}
