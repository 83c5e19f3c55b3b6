use std::future::Future;
use std::sync::Arc;

use systematic_core::{
    Config, IterationOutcome, IterationReport, OperationId, RunReport, SchedulingPolicy,
};

use crate::ambient;
use crate::engine::Engine;
use crate::error::OpResult;
use crate::strategy;

/// Runs `entry` for up to `config.testing_iterations` iterations,
/// installing a fresh [`Engine`] as the ambient runtime for each one
/// (§4.6 Exploration loop).
///
/// The strategy itself is built once, outside the per-iteration engine,
/// and threaded back out after every iteration: DFS's backtracking tree,
/// RL's Q-table, and Replay's trace cursor all need to survive from one
/// iteration's engine to the next even though the engine's operation
/// table, trace, and monitor registry are rebuilt from scratch each time.
pub async fn explore<F, Fut>(config: Config, seed: u64, entry: F) -> RunReport
where
    F: Fn(Arc<Engine>, OperationId) -> Fut,
    Fut: Future<Output = OpResult<()>> + Send + 'static,
{
    let mut strategy = strategy::build(config.strategy.clone(), seed);
    let mut report = RunReport::default();
    let mut seen_traces: Vec<Vec<systematic_core::TraceEntry>> = Vec::new();

    for iteration in 0..config.testing_iterations {
        if !strategy.prepare_next_iteration(iteration) {
            break;
        }

        let engine = Engine::with_strategy(config.clone(), seed, strategy);
        let root = engine.register_root("main");

        let watchdog = (engine.policy() == SchedulingPolicy::Fuzzing)
            .then(|| engine.spawn_deadlock_watchdog());

        let result = ambient::scope(engine.clone(), entry(engine.clone(), root)).await;

        if let Some(handle) = watchdog {
            handle.abort();
        }

        let bug = engine.bug();
        let max_steps = engine.max_steps_reached();
        let operations = engine.operation_counts();
        let uncontrolled_invocations = engine.uncontrolled_invocations();
        let trace = engine.trace_snapshot();

        // By now every spawned operation has either completed or been
        // aborted via `fail`, so this engine is the only owner left and
        // the strategy can be reclaimed for the next iteration.
        strategy = match Arc::try_unwrap(engine) {
            Ok(engine) => engine.into_strategy(),
            Err(_) => {
                tracing::warn!("engine outlived its iteration; strategy state could not be reclaimed");
                strategy::build(config.strategy.clone(), seed)
            }
        };

        let outcome = if let Some(bug) = bug {
            IterationOutcome::Bug(bug)
        } else if max_steps {
            IterationOutcome::MaxStepsReached
        } else if let Some((step, detail)) = strategy.take_divergence() {
            IterationOutcome::ReplayDivergence { step, detail }
        } else {
            debug_assert!(result.is_ok(), "cancellation without a recorded bug or step cap");
            IterationOutcome::Success
        };

        let novel = !seen_traces.iter().any(|seen| seen == &trace.entries);
        if novel {
            seen_traces.push(trace.entries.clone());
        }
        strategy.finish_iteration(outcome.is_bug(), novel);

        let found_bug = outcome.is_bug();
        report.push(IterationReport {
            iteration,
            outcome,
            operations,
            uncontrolled_invocations,
            trace,
        });

        if found_bug {
            break;
        }
    }

    report
}
