use systematic::sync::task;
use systematic_core::{BugKind, Config, IterationOutcome};

/// Rust has no exception hierarchy to rethrow through `WhenAny`; the two
/// competing tasks instead resolve to a small fault enum, and the test
/// asserts on which one actually arrived first under the smallest-id
/// tie-break before deliberately failing.
#[derive(Debug, PartialEq, Eq)]
enum Fault {
    InvalidOperation,
    NotSupported,
}

#[tokio::test]
async fn when_any_resolves_to_the_first_faulted_task_then_the_assertion_fires() {
    let report = systematic_test::run(Config::default(), 1, |engine, root| async move {
        let a = task::start_new(&engine, root, "invalid-operation", |_op| async {
            systematic::OpResult::Ok(Fault::InvalidOperation)
        })
        .await?;
        let b = task::start_new(&engine, root, "not-supported", |_op| async {
            systematic::OpResult::Ok(Fault::NotSupported)
        })
        .await?;

        let (_index, fault) = task::when_any(&engine, root, vec![a, b]).await?;
        engine.assert(
            fault == Fault::InvalidOperation || fault == Fault::NotSupported,
            "WhenAny produced neither expected fault",
        )?;

        engine.assert(false, "Reached test assertion")?;
        engine.complete_operation(root).await;
        Ok(())
    })
    .await;

    let first = report.first_bug().expect("the trailing assert(false) always fires");
    assert!(matches!(
        &first.outcome,
        IterationOutcome::Bug(BugKind::Assertion { message }) if message == "Reached test assertion"
    ));
}

#[tokio::test]
async fn when_any_on_an_empty_set_is_an_argument_error() {
    let report = systematic_test::run(Config::default(), 1, |engine, root| async move {
        let empty: Vec<task::ControlledTask<()>> = Vec::new();
        let _ = task::when_any(&engine, root, empty).await?;
        engine.complete_operation(root).await;
        Ok(())
    })
    .await;

    assert!(report.first_bug().is_some(), "an empty WhenAny set must fail rather than hang");
}
