use std::time::Duration;

use systematic::sync::ControlledSemaphore;
use systematic_core::{BugKind, Config, IterationOutcome};

/// A single operation waits on a semaphore with one permit twice in a
/// row; the second wait finds the enabled set empty with itself blocked.
#[tokio::test]
async fn second_wait_on_an_exhausted_semaphore_deadlocks_immediately() {
    let config = Config::default();

    let report = systematic_test::run(config, 1, |engine, root| async move {
        let sem = ControlledSemaphore::new(engine.clone(), 1, 1);
        sem.acquire(root).await?;
        sem.acquire(root).await?;
        engine.complete_operation(root).await;
        Ok(())
    })
    .await;

    assert_eq!(report.iterations_run(), 1);
    let first = report.first_bug().expect("the second wait has nothing left to satisfy it");
    assert!(matches!(first.outcome, IterationOutcome::Bug(BugKind::Deadlock { blocked: 1 })));
}

/// Under Fuzzing, an operation that never reaches another scheduling
/// point has no empty-enabled-set for `advance_past` to catch; the
/// wall-clock watchdog is what notices nothing is progressing.
#[tokio::test]
async fn an_operation_stuck_outside_any_scheduling_point_trips_the_watchdog() {
    let config = Config {
        concurrency_fuzzing_enabled: true,
        deadlock_timeout: Duration::from_millis(10),
        ..Config::default()
    };

    let report = systematic_test::run(config, 1, |engine, root| async move {
        tokio::time::sleep(Duration::from_millis(150)).await;
        engine.complete_operation(root).await;
        Ok(())
    })
    .await;

    let first = report.first_bug().expect("the watchdog should fire before the sleep finishes");
    assert!(matches!(first.outcome, IterationOutcome::Bug(BugKind::PotentialDeadlock(_))));
}
