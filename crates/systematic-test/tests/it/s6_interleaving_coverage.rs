use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use systematic::sync::task;
use systematic_core::{Config, SchedulingPointType, StrategyKind};

/// Task A records "1" then yields before recording "2", so its own two
/// entries can never swap; task B records "3" in a single step. Under
/// enough interleavings every legal merge of {1,2} and {3} should turn up:
/// 3 before both, 3 between them, and 3 after both.
#[tokio::test]
async fn pct_scheduling_covers_every_legal_interleaving_of_the_two_tasks() {
    let config = Config {
        testing_iterations: 100,
        strategy: StrategyKind::Pct { priority_changes: 2, fair: false },
        ..Config::default()
    };

    let orders: Arc<Mutex<HashSet<String>>> = Arc::new(Mutex::new(HashSet::new()));
    let orders_for_run = orders.clone();

    let report = systematic_test::run(config, 7, move |engine, root| {
        let orders = orders_for_run.clone();
        async move {
            let log = Arc::new(Mutex::new(Vec::<&'static str>::new()));

            let log_a = log.clone();
            let a = task::start_new(&engine, root, "a", move |op| {
                let engine = systematic::ambient::current();
                async move {
                    log_a.lock().unwrap().push("1");
                    engine.schedule_next_operation(op, SchedulingPointType::Yield).await?;
                    log_a.lock().unwrap().push("2");
                    systematic::OpResult::Ok(())
                }
            })
            .await?;

            let log_b = log.clone();
            let b = task::start_new(&engine, root, "b", move |_op| async move {
                log_b.lock().unwrap().push("3");
                systematic::OpResult::Ok(())
            })
            .await?;

            task::when_all(&engine, root, vec![a, b]).await?;

            let order = log.lock().unwrap().join("");
            orders.lock().unwrap().insert(order);

            engine.complete_operation(root).await;
            Ok(())
        }
    })
    .await;

    assert!(report.first_bug().is_none());
    let seen = orders.lock().unwrap().clone();
    let expected: HashSet<String> =
        ["123", "132", "312"].iter().map(|s| s.to_string()).collect();
    assert_eq!(seen, expected);
}
