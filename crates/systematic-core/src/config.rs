use std::time::Duration;

use crate::trace::ScheduleTrace;

/// Selects which exploration strategy a `Config` wires up (§4.2, §6
/// strategy-selection options).
///
/// `Pct` with `fair: true` is the FairPCT variant from §3: the same
/// priority-change algorithm wrapped with a fairness oracle that forces
/// progress once a monitor has been hot for too long.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyKind {
    Random,
    Probabilistic { priority_bits: u32 },
    Pct { priority_changes: u32, fair: bool },
    Dfs,
    Replay { trace: ScheduleTrace },
    Rl,
}

impl Default for StrategyKind {
    fn default() -> Self {
        StrategyKind::Random
    }
}

/// The scheduling policy under which operations make progress (§4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchedulingPolicy {
    #[default]
    Interleaving,
    Fuzzing,
    None,
}

/// Every tunable enumerated in §6, collected into one plain struct.
///
/// There is no builder type: the teacher crate's own worker configuration
/// is a plain struct with public fields and a `Default` impl, and this
/// mirrors that shape exactly rather than introducing a fluent setter API
/// the teacher does not actually use.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Number of iterations the driver runs before stopping.
    pub testing_iterations: u32,

    /// Abort an iteration once this many scheduling decisions have been made.
    pub max_scheduling_steps: u32,

    /// A monitor's liveness temperature exceeding this raises a liveness bug.
    pub liveness_temperature_threshold: u32,

    /// Start the run in the Fuzzing policy rather than Interleaving.
    pub concurrency_fuzzing_enabled: bool,

    /// Permit the engine to downgrade Interleaving to Fuzzing for the rest
    /// of the run when it observes uncontrolled concurrency, instead of
    /// aborting the iteration outright.
    pub concurrency_fuzzing_fallback_enabled: bool,

    /// Enable the reader/writer race-checking assertions on non-concurrent
    /// generic collections used in a checked region.
    pub is_collection_access_race_checking_enabled: bool,

    /// Skip the automatic replay-to-confirm pass that normally follows a
    /// freshly discovered bug.
    pub no_bug_trace_repro: bool,

    /// Wall-clock window, in Fuzzing or partial-control mode, after which a
    /// lack of any scheduling point is reported as a potential deadlock.
    pub deadlock_timeout: Duration,

    /// Which strategy drives scheduling decisions and non-deterministic
    /// choices.
    pub strategy: StrategyKind,

    /// Allow uncontrolled primitives to be observed without aborting the
    /// iteration (a relaxed variant of the fuzzing fallback).
    pub with_partially_controlled_concurrency_allowed: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            testing_iterations: 1,
            max_scheduling_steps: 10_000,
            liveness_temperature_threshold: 10_000,
            concurrency_fuzzing_enabled: false,
            concurrency_fuzzing_fallback_enabled: false,
            is_collection_access_race_checking_enabled: true,
            no_bug_trace_repro: false,
            deadlock_timeout: Duration::from_millis(5_000),
            strategy: StrategyKind::default(),
            with_partially_controlled_concurrency_allowed: false,
        }
    }
}

impl Config {
    pub fn policy(&self) -> SchedulingPolicy {
        if self.concurrency_fuzzing_enabled {
            SchedulingPolicy::Fuzzing
        } else {
            SchedulingPolicy::Interleaving
        }
    }
}
