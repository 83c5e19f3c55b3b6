use std::sync::Arc;

use systematic::actor::{StateDef, StateMachineDescriptor};
use systematic_core::{BugKind, Config, IterationOutcome, SchedulingPointType};

struct MonitorCtx;

/// A monitor whose only state is hot and has no cold state to settle
/// into. An operation that keeps yielding without ever letting the
/// monitor cool down eventually crosses the liveness threshold.
#[tokio::test]
async fn a_monitor_stuck_in_a_hot_state_forever_is_reported_as_a_liveness_bug() {
    let config = Config {
        liveness_temperature_threshold: 200,
        max_scheduling_steps: 10_000,
        ..Config::default()
    };

    let report = systematic_test::run(config, 1, |engine, root| async move {
        let hot_state = StateDef::<MonitorCtx>::new("CannotGetUserInput").start().hot();
        let descriptor = Arc::new(
            StateMachineDescriptor::build("LivenessMonitor", vec![hot_state])
                .expect("a single start state is a valid descriptor"),
        );
        engine.monitors().lock().register("LivenessMonitor", descriptor, MonitorCtx);

        loop {
            engine.schedule_next_operation(root, SchedulingPointType::Yield).await?;
        }
    })
    .await;

    let first = report
        .first_bug()
        .expect("temperature should cross the configured threshold well before the step cap");
    match &first.outcome {
        IterationOutcome::Bug(BugKind::Liveness { monitor, temperature, .. }) => {
            assert_eq!(monitor, "LivenessMonitor");
            assert!(*temperature >= 200);
        }
        other => panic!("expected a liveness bug, got {other:?}"),
    }
}
