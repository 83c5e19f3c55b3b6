use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use systematic::actor::{StateDef, StateMachineDescriptor};
use systematic_core::Config;

struct Ctx;

/// `Init` inherits from `BaseState`; both declare `OnEntry`. Registering
/// the monitor must run only `Init`'s entry, never `BaseState`'s.
#[tokio::test]
async fn a_derived_start_states_entry_overrides_its_bases_rather_than_chaining() {
    let base_entry_ran = Arc::new(AtomicBool::new(false));
    let init_entry_ran = Arc::new(AtomicBool::new(false));

    let base_entry_ran_for_run = base_entry_ran.clone();
    let init_entry_ran_for_run = init_entry_ran.clone();
    let report = systematic_test::run(Config::default(), 1, move |engine, root| {
        let base_entry_ran = base_entry_ran_for_run.clone();
        let init_entry_ran = init_entry_ran_for_run.clone();
        async move {
            let base_flag = base_entry_ran.clone();
            let base = StateDef::<Ctx>::new("BaseState")
                .on_entry(move |_, _| base_flag.store(true, Ordering::SeqCst));
            let init_flag = init_entry_ran.clone();
            let init = StateDef::<Ctx>::new("Init")
                .start()
                .inherits("BaseState")
                .on_entry(move |_, _| init_flag.store(true, Ordering::SeqCst));
            let descriptor = Arc::new(StateMachineDescriptor::build("M4", vec![base, init]).unwrap());
            engine.monitors().lock().register("M4", descriptor, Ctx);
            engine.complete_operation(root).await;
            Ok(())
        }
    })
    .await;

    assert!(report.first_bug().is_none());
    assert!(init_entry_ran.load(Ordering::SeqCst), "Init's own entry should have run");
    assert!(!base_entry_ran.load(Ordering::SeqCst), "BaseState's entry must not run once Init overrides it");
}
