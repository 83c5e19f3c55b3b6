use std::future::Future;
use std::sync::Arc;

use systematic_core::{OperationId, OperationStatus, SchedulingPointType};

use crate::engine::Engine;
use crate::error::{Cancelled, OpResult};
use crate::operation::WakePredicate;

/// Handle to a controlled operation spawned with `start_new` (§4.3 Task:
/// StartNew/Await).
pub struct ControlledTask<T> {
    op: OperationId,
    inner: tokio::task::JoinHandle<OpResult<T>>,
}

impl<T> ControlledTask<T> {
    pub fn operation(&self) -> OperationId {
        self.op
    }
}

/// Spawns `make_body` as a new controlled operation, child of `caller`.
pub async fn start_new<F, Fut, T>(
    engine: &Arc<Engine>,
    caller: OperationId,
    name: impl Into<String>,
    make_body: F,
) -> OpResult<ControlledTask<T>>
where
    F: FnOnce(OperationId) -> Fut + Send + 'static,
    Fut: Future<Output = OpResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let (op, inner) = engine.create_operation(caller, name, make_body).await?;
    Ok(ControlledTask { op, inner })
}

/// Blocks `op` until `task` has completed, then returns its result.
pub async fn await_task<T: Send + 'static>(
    engine: &Arc<Engine>,
    op: OperationId,
    task: ControlledTask<T>,
) -> OpResult<T> {
    let ControlledTask { op: child, inner } = task;
    while !engine.is_completed(child) {
        let engine2 = engine.clone();
        let predicate: WakePredicate = Box::new(move || engine2.is_completed(child));
        engine
            .block_until(op, OperationStatus::BlockedOnResource, predicate, SchedulingPointType::Wait)
            .await?;
    }
    inner.await.map_err(|_| Cancelled)?
}

/// Blocks `op` until every task in `tasks` has completed, returning their
/// results in order (§4.3 Task: WhenAll).
pub async fn when_all<T: Send + 'static>(
    engine: &Arc<Engine>,
    op: OperationId,
    tasks: Vec<ControlledTask<T>>,
) -> OpResult<Vec<T>> {
    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(await_task(engine, op, task).await?);
    }
    Ok(results)
}

/// Blocks `op` until at least one task in `tasks` has completed, then
/// returns the result of the lowest-operation-id task that has (§4.3
/// Task: WhenAny; smallest-id tie-break, consistent with the rest of the
/// scheduler).
pub async fn when_any<T: Send + 'static>(
    engine: &Arc<Engine>,
    op: OperationId,
    mut tasks: Vec<ControlledTask<T>>,
) -> OpResult<(usize, T)> {
    if tasks.is_empty() {
        engine.assert(false, "WhenAny was called with an empty task set")?;
    }

    loop {
        let done_index = tasks
            .iter()
            .enumerate()
            .filter(|(_, task)| engine.is_completed(task.op))
            .min_by_key(|(_, task)| task.op)
            .map(|(index, _)| index);

        if let Some(index) = done_index {
            let task = tasks.remove(index);
            let result = task.inner.await.map_err(|_| Cancelled)??;
            return Ok((index, result));
        }

        let engine2 = engine.clone();
        let ops: Vec<OperationId> = tasks.iter().map(|task| task.op).collect();
        let predicate: WakePredicate = Box::new(move || ops.iter().any(|&op| engine2.is_completed(op)));
        engine
            .block_until(op, OperationStatus::BlockedOnResource, predicate, SchedulingPointType::Wait)
            .await?;
    }
}
