use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::task::AbortHandle;

use systematic_core::{
    ActorId, BugKind, Config, Event, OperationCounts, OperationId, OperationStatus,
    SchedulingPointType, SchedulingPolicy,
};

use crate::actor::mailbox::{Mailbox, MailboxOverflow};
use crate::ambient;
use crate::error::{Cancelled, OpResult};
use crate::monitor::MonitorRegistry;
use crate::operation::{OperationTable, WakePredicate};
use crate::strategy::{self, Strategy};

/// Shared handle for delivering events to an actor without needing its
/// (generic, non-`Send`-across-iterations) user context (§4.4 Mailbox).
pub struct ActorHandle {
    pub name: String,
    pub mailbox: Mutex<Mailbox>,
    pub halted: Arc<AtomicBool>,
}

/// The controlled runtime for a single exploration iteration (§4.2).
///
/// One `Engine` is built fresh per iteration; it owns the operation table,
/// the chosen strategy, the trace being recorded, and the monitor
/// registry. Scheduling decisions run inline on whichever operation
/// currently holds the baton: `schedule_next_operation` picks the next
/// operation under a brief lock, opens that operation's gate, and parks
/// the caller's own gate unless the caller was the one chosen.
pub struct Engine {
    config: Config,
    table: Mutex<OperationTable>,
    strategy: Mutex<Box<dyn Strategy>>,
    trace: Mutex<systematic_core::ScheduleTrace>,
    monitors: Mutex<MonitorRegistry>,
    policy: Mutex<SchedulingPolicy>,
    cancelled: AtomicBool,
    bug: Mutex<Option<BugKind>>,
    max_steps_reached: AtomicBool,
    steps: AtomicU32,
    abort_handles: Mutex<Vec<AbortHandle>>,
    actors: Mutex<HashMap<ActorId, Arc<ActorHandle>>>,
    next_actor_id: AtomicU64,
    uncontrolled: Mutex<Vec<String>>,
    last_activity: Mutex<Instant>,
    seed: u64,
}

impl Engine {
    /// Builds a fresh engine for one iteration, seeded deterministically
    /// from `config.strategy` and `seed`.
    pub fn new(config: Config, seed: u64) -> Arc<Self> {
        let strategy = strategy::build(config.strategy.clone(), seed);
        Self::with_strategy(config, seed, strategy)
    }

    /// Builds an engine reusing a strategy instance built outside this
    /// iteration. The exploration driver needs this: DFS's backtracking
    /// tree, RL's Q-table, and Replay's trace cursor all have to survive
    /// from one iteration's engine to the next, while everything else
    /// (the operation table, the trace being recorded, the monitor
    /// registry) starts over fresh each time.
    pub fn with_strategy(config: Config, seed: u64, strategy: Box<dyn Strategy>) -> Arc<Self> {
        let policy = config.policy();
        Arc::new(Engine {
            trace: Mutex::new(systematic_core::ScheduleTrace::new(strategy.description(), seed)),
            strategy: Mutex::new(strategy),
            table: Mutex::new(OperationTable::new()),
            monitors: Mutex::new(MonitorRegistry::new()),
            policy: Mutex::new(policy),
            cancelled: AtomicBool::new(false),
            bug: Mutex::new(None),
            max_steps_reached: AtomicBool::new(false),
            steps: AtomicU32::new(0),
            abort_handles: Mutex::new(Vec::new()),
            actors: Mutex::new(HashMap::new()),
            next_actor_id: AtomicU64::new(0),
            uncontrolled: Mutex::new(Vec::new()),
            last_activity: Mutex::new(Instant::now()),
            seed,
            config,
        })
    }

    /// Reclaims the strategy this engine was built with, for the driver
    /// to hand to the next iteration's engine. Only callable once this
    /// is the sole owner (i.e. after every spawned operation has
    /// finished or been aborted).
    pub fn into_strategy(self) -> Box<dyn Strategy> {
        self.strategy.into_inner()
    }

    pub fn prepare_next_iteration(&self, iteration: u32) -> bool {
        self.strategy.lock().prepare_next_iteration(iteration)
    }

    pub fn finish_iteration(&self, bug_found: bool, novel_trace: bool) {
        self.strategy.lock().finish_iteration(bug_found, novel_trace);
    }

    pub fn take_divergence(&self) -> Option<(u64, String)> {
        self.strategy.lock().take_divergence()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn policy(&self) -> SchedulingPolicy {
        *self.policy.lock()
    }

    pub fn set_policy(&self, policy: SchedulingPolicy) {
        *self.policy.lock() = policy;
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn monitors(&self) -> &Mutex<MonitorRegistry> {
        &self.monitors
    }

    fn check_cancelled(&self) -> OpResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Records `bug`, flags the iteration cancelled, and aborts every
    /// outstanding operation task. Every call site that can detect a bug
    /// routes through here so cancellation is observed uniformly.
    fn fail(&self, bug: BugKind) -> OpResult<()> {
        tracing::warn!(%bug, "iteration failed");
        let mut slot = self.bug.lock();
        if slot.is_none() {
            *slot = Some(bug);
        }
        drop(slot);
        self.cancelled.store(true, Ordering::SeqCst);
        for handle in self.abort_handles.lock().iter() {
            handle.abort();
        }
        Err(Cancelled)
    }

    /// Records `bug` and cancels the iteration, for controlled primitives
    /// that detect something other than a plain assertion failure (e.g. a
    /// data race or mailbox overflow).
    pub fn raise(&self, bug: BugKind) -> OpResult<()> {
        self.fail(bug)
    }

    /// The bug recorded for this iteration, if any.
    pub fn bug(&self) -> Option<BugKind> {
        self.bug.lock().clone()
    }

    pub fn max_steps_reached(&self) -> bool {
        self.max_steps_reached.load(Ordering::SeqCst)
    }

    pub fn trace_snapshot(&self) -> systematic_core::ScheduleTrace {
        self.trace.lock().clone()
    }

    pub fn operation_counts(&self) -> OperationCounts {
        self.table.lock().counts()
    }

    pub fn record_uncontrolled(&self, description: impl Into<String>) {
        self.uncontrolled.lock().push(description.into());
    }

    pub fn uncontrolled_invocations(&self) -> Vec<String> {
        self.uncontrolled.lock().clone()
    }

    /// Registers operation 0, the iteration's entry point, and opens its
    /// gate immediately since nothing else has run yet.
    pub fn register_root(self: &Arc<Self>, name: impl Into<String>) -> OperationId {
        let mut table = self.table.lock();
        let id = table.register(name);
        table.gate(id).open();
        id
    }

    /// Registers a new operation as a child of `caller` and emits the
    /// `Create` scheduling point on `caller` so the new operation
    /// participates in interleaving from this point on. `body` starts
    /// parked and only begins executing once the scheduler opens its
    /// gate.
    pub async fn create_operation<F, Fut, T>(
        self: &Arc<Self>,
        caller: OperationId,
        name: impl Into<String>,
        make_body: F,
    ) -> OpResult<(OperationId, tokio::task::JoinHandle<OpResult<T>>)>
    where
        F: FnOnce(OperationId) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = OpResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let id = {
            let mut table = self.table.lock();
            table.register(name)
        };
        let gate = self.table.lock().gate(id);
        let engine = self.clone();
        let handle = tokio::spawn(ambient::scope(engine.clone(), async move {
            gate.park().await;
            let result = make_body(id).await;
            if result.is_ok() {
                engine.complete_operation(id).await;
            }
            result
        }));
        self.abort_handles.lock().push(handle.abort_handle());
        self.schedule_next_operation(caller, SchedulingPointType::Create).await?;
        Ok((id, handle))
    }

    pub fn register_actor(self: &Arc<Self>, name: impl Into<String>, capacity: Option<usize>) -> (ActorId, Arc<ActorHandle>) {
        let id = ActorId(self.next_actor_id.fetch_add(1, Ordering::SeqCst));
        let handle = Arc::new(ActorHandle {
            name: name.into(),
            mailbox: Mutex::new(Mailbox::new(capacity)),
            halted: Arc::new(AtomicBool::new(false)),
        });
        self.actors.lock().insert(id, handle.clone());
        (id, handle)
    }

    pub fn actor_handle(&self, id: ActorId) -> Option<Arc<ActorHandle>> {
        self.actors.lock().get(&id).cloned()
    }

    /// Broadcasts `event` to every registered monitor (§4.5).
    pub fn notify_monitors(&self, event: Event) {
        self.monitors.lock().dispatch_all(&event);
    }

    /// Delivers `event` to `target`'s mailbox and emits a `Send` point on
    /// `sender`. Sending to an unknown or halted actor is a silent no-op,
    /// matching fire-and-forget actor semantics.
    pub async fn send_to_actor(
        self: &Arc<Self>,
        sender: OperationId,
        target: ActorId,
        event: Event,
    ) -> OpResult<()> {
        self.check_cancelled()?;
        let handle = match self.actor_handle(target) {
            Some(handle) if !handle.halted.load(Ordering::SeqCst) => handle,
            _ => {
                tracing::debug!(actor = ?target, "send to unknown or halted actor dropped");
                return self.schedule_next_operation(sender, SchedulingPointType::Send).await;
            }
        };

        let overflow = handle.mailbox.lock().enqueue(event).err();
        if let Some(MailboxOverflow) = overflow {
            let capacity = handle.mailbox.lock().len();
            self.fail(BugKind::MailboxOverflow {
                actor: handle.name.clone(),
                capacity,
            })?;
        }

        self.schedule_next_operation(sender, SchedulingPointType::Send).await
    }

    /// Marks `id` blocked under `status` until `predicate` becomes true,
    /// then runs the same scheduling decision every other point runs
    /// (§3: "An operation transitions to Enabled only via ... a
    /// scheduler-observed precondition").
    pub async fn block_until(
        self: &Arc<Self>,
        id: OperationId,
        status: OperationStatus,
        predicate: WakePredicate,
        point: SchedulingPointType,
    ) -> OpResult<()> {
        self.table.lock().block(id, status, predicate);
        self.schedule_next_operation(id, point).await
    }

    pub fn random_boolean(&self, _current: OperationId) -> OpResult<bool> {
        self.check_cancelled()?;
        let value = self.strategy.lock().next_bool();
        self.trace.lock().push(systematic_core::TraceEntry::Bool(value));
        Ok(value)
    }

    pub fn random_integer(&self, _current: OperationId, max: u64) -> OpResult<u64> {
        self.check_cancelled()?;
        let value = self.strategy.lock().next_int(max);
        self.trace.lock().push(systematic_core::TraceEntry::Int(value));
        Ok(value)
    }

    pub fn assert(&self, condition: bool, message: impl Into<String>) -> OpResult<()> {
        if condition {
            Ok(())
        } else {
            self.fail(BugKind::Assertion { message: message.into() })
        }
    }

    /// Suppresses scheduling-point emission for `id` until a matching
    /// `resume` (§5 Suppress/Resume).
    pub fn suppress(&self, id: OperationId) {
        self.table.lock().get_mut(id).suppress();
    }

    pub fn resume(&self, id: OperationId) {
        self.table.lock().get_mut(id).resume();
    }

    /// Waits out a delay. Under Fuzzing this is a real timer; under
    /// Interleaving/None it becomes an ordinary scheduling point so the
    /// wait participates in interleaving instead of costing wall-clock
    /// time in every test run.
    pub async fn delay_operation(self: &Arc<Self>, current: OperationId, max_millis: u64) -> OpResult<()> {
        self.check_cancelled()?;
        let millis = self.strategy.lock().next_delay(max_millis);
        match self.policy() {
            SchedulingPolicy::Fuzzing => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
                self.check_cancelled()
            }
            _ => self.schedule_next_operation(current, SchedulingPointType::Wait).await,
        }
    }

    /// Marks `id` completed and hands the baton to whatever the strategy
    /// picks next. The caller's task is ending, so unlike
    /// `schedule_next_operation` this never parks `id`'s own gate.
    pub async fn complete_operation(self: &Arc<Self>, id: OperationId) {
        self.table.lock().set_status(id, OperationStatus::Completed);
        let _ = self.advance_past(id, SchedulingPointType::Complete).await;
    }

    /// Whether `id` has reached `Completed`. Used by Task/Thread join
    /// combinators, whose wake predicates need to observe completion
    /// without holding the table lock across an `.await`.
    pub fn is_completed(&self, id: OperationId) -> bool {
        self.table.lock().get(id).status == OperationStatus::Completed
    }

    /// Core scheduling-point handler used by every controlled primitive.
    /// Picks the next operation to run; if it differs from `current`,
    /// opens its gate and parks on `current`'s own gate until the
    /// scheduler hands the baton back.
    pub async fn schedule_next_operation(
        self: &Arc<Self>,
        current: OperationId,
        point: SchedulingPointType,
    ) -> OpResult<()> {
        if self.table.lock().get(current).is_suppressed() {
            return self.check_cancelled();
        }
        let chosen = self.advance_past(current, point).await?;
        if let Some(chosen) = chosen {
            if chosen != current {
                let gate = self.table.lock().gate(current);
                gate.park().await;
            }
        }
        self.check_cancelled()
    }

    /// Shared by `schedule_next_operation` and `complete_operation`:
    /// bumps the step count, re-checks blocked operations, and either
    /// picks and opens the next operation's gate or resolves the
    /// deadlock/completion case. Returns the chosen operation, if any.
    async fn advance_past(
        self: &Arc<Self>,
        current: OperationId,
        point: SchedulingPointType,
    ) -> OpResult<Option<OperationId>> {
        self.check_cancelled()?;
        *self.last_activity.lock() = Instant::now();

        let steps = self.steps.fetch_add(1, Ordering::SeqCst) + 1;
        if steps > self.config.max_scheduling_steps {
            self.max_steps_reached.store(true, Ordering::SeqCst);
            self.cancelled.store(true, Ordering::SeqCst);
            for handle in self.abort_handles.lock().iter() {
                handle.abort();
            }
            return Err(Cancelled);
        }

        let (hint, liveness_bug) = self.monitors.lock().step(&self.config);
        if let Some(bug) = liveness_bug {
            return self.fail(bug).map(|_| None);
        }

        let mut table = self.table.lock();
        table.promote_ready();
        let enabled = table.enabled();

        if enabled.is_empty() {
            if table.any_blocked() {
                let blocked = table.counts().blocked;
                drop(table);
                return self.fail(BugKind::Deadlock { blocked: blocked as usize }).map(|_| None);
            }
            // Every operation has completed; nothing left to schedule.
            return Ok(None);
        }

        let chosen = {
            let mut strategy = self.strategy.lock();
            strategy.next_operation(&enabled, Some(current), hint)
        };
        self.trace.lock().push(systematic_core::TraceEntry::Op { point, op: chosen });

        if chosen != current {
            table.gate(chosen).open();
        }
        drop(table);
        Ok(Some(chosen))
    }

    /// Spawns a watchdog that fails the iteration with
    /// `BugKind::PotentialDeadlock` if no scheduling point is observed
    /// within `config.deadlock_timeout`. Only meaningful under Fuzzing,
    /// where real wall-clock time can elapse between scheduling points;
    /// the driver aborts this task once the iteration ends.
    pub fn spawn_deadlock_watchdog(self: &Arc<Self>) -> AbortHandle {
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(engine.config.deadlock_timeout).await;
                if engine.cancelled.load(Ordering::SeqCst) || engine.table.lock().all_completed() {
                    return;
                }
                let idle = engine.last_activity.lock().elapsed();
                if idle >= engine.config.deadlock_timeout {
                    let _ = engine.fail(BugKind::PotentialDeadlock(engine.config.deadlock_timeout));
                    return;
                }
            }
        });
        handle.abort_handle()
    }

    pub fn all_completed(&self) -> bool {
        self.table.lock().all_completed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use systematic_core::SchedulingPointType;

    #[tokio::test]
    async fn single_operation_runs_to_completion_without_parking() {
        let engine = Engine::new(Config::default(), 1);
        let id = engine.register_root("root");
        engine.schedule_next_operation(id, SchedulingPointType::Yield).await.unwrap();
        engine.complete_operation(id).await;
        assert!(engine.all_completed());
        assert!(engine.bug().is_none());
    }

    #[tokio::test]
    async fn assertion_failure_cancels_the_iteration() {
        let engine = Engine::new(Config::default(), 1);
        let id = engine.register_root("root");
        let err = engine.assert(false, "boom").unwrap_err();
        assert_eq!(err, Cancelled);
        assert!(matches!(engine.bug(), Some(BugKind::Assertion { .. })));
        assert!(engine.schedule_next_operation(id, SchedulingPointType::Yield).await.is_err());
    }

    #[tokio::test]
    async fn two_operations_interleave_and_both_complete() {
        let engine = Engine::new(Config::default(), 7);
        let root = engine.register_root("root");
        let (child, handle) = engine
            .create_operation(root, "child", |_id| async { OpResult::<()>::Ok(()) })
            .await
            .unwrap();
        assert_ne!(root, child);
        engine.complete_operation(root).await;
        handle.await.unwrap().unwrap();
        assert!(engine.all_completed());
    }
}
