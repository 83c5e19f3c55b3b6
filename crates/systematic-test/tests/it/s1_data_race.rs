use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use systematic::sync::task;
use systematic_core::{BugKind, Config, StrategyKind};

/// Two tasks race to set a shared value to 3 and 5 respectively after a
/// delay; the program asserts the value is 5 once both have joined.
/// Under enough Random iterations the writer of 3 sometimes runs last.
#[tokio::test]
async fn racing_writers_eventually_produce_the_wrong_final_value() {
    let config = Config {
        testing_iterations: 300,
        strategy: StrategyKind::Random,
        ..Config::default()
    };

    let report = run_scenario(config, 42).await;

    let bug = report.first_bug().expect("Random exploration should find the losing interleaving within 300 iterations");
    assert!(matches!(
        &bug.outcome,
        systematic_core::IterationOutcome::Bug(BugKind::Assertion { message }) if message.contains("instead of 5")
    ));
}

/// Replaying the exact trace that found the bug reproduces it deterministically.
#[tokio::test]
async fn replaying_the_failing_trace_reproduces_the_same_bug() {
    let discover = Config {
        testing_iterations: 300,
        strategy: StrategyKind::Random,
        ..Config::default()
    };

    let report = run_scenario(discover, 42).await;
    let first = report.first_bug().expect("a failing iteration exists within 300 iterations");
    let failing_trace = first.trace.clone();

    let replay = Config {
        testing_iterations: 1,
        strategy: StrategyKind::Replay { trace: failing_trace },
        ..Config::default()
    };
    let replayed = run_scenario(replay, 42).await;
    let replayed_first = replayed.iterations_run();
    assert_eq!(replayed_first, 1);
    assert!(replayed.first_bug().is_some(), "replay should reproduce the same assertion bug");
}

async fn run_scenario(config: Config, seed: u64) -> systematic_core::RunReport {
    systematic_test::run(config, seed, |engine, root| async move {
        let value = Arc::new(AtomicI64::new(0));

        let value_a = value.clone();
        let a = task::start_new(&engine, root, "writer-3", move |op| async move {
            let engine = systematic::ambient::current();
            engine.delay_operation(op, 1).await?;
            value_a.store(3, Ordering::SeqCst);
            systematic::OpResult::Ok(())
        })
        .await?;

        let value_b = value.clone();
        let b = task::start_new(&engine, root, "writer-5", move |op| async move {
            let engine = systematic::ambient::current();
            engine.delay_operation(op, 1).await?;
            value_b.store(5, Ordering::SeqCst);
            systematic::OpResult::Ok(())
        })
        .await?;

        task::when_all(&engine, root, vec![a, b]).await?;

        let observed = value.load(Ordering::SeqCst);
        engine.assert(observed == 5, format!("Value is {observed} instead of 5"))?;
        engine.complete_operation(root).await;
        Ok(())
    })
    .await
}
