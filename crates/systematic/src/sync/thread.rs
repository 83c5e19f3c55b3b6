use std::future::Future;
use std::sync::Arc;

use systematic_core::{OperationId, SchedulingPointType};

use crate::engine::Engine;
use crate::error::OpResult;

use super::task::{self, ControlledTask};

/// Thread-flavored wrapper over the Task combinators (§4.3 Thread), kept
/// as a distinct type since callers reason about OS-thread-like entities
/// separately from async tasks even though both compile down to the same
/// controlled operation underneath.
pub struct ControlledThread<T> {
    task: ControlledTask<T>,
}

impl<T> ControlledThread<T> {
    pub fn operation(&self) -> OperationId {
        self.task.operation()
    }
}

pub async fn start<F, Fut, T>(
    engine: &Arc<Engine>,
    caller: OperationId,
    name: impl Into<String>,
    make_body: F,
) -> OpResult<ControlledThread<T>>
where
    F: FnOnce(OperationId) -> Fut + Send + 'static,
    Fut: Future<Output = OpResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let task = task::start_new(engine, caller, name, make_body).await?;
    Ok(ControlledThread { task })
}

pub async fn join<T: Send + 'static>(
    engine: &Arc<Engine>,
    op: OperationId,
    thread: ControlledThread<T>,
) -> OpResult<T> {
    task::await_task(engine, op, thread.task).await
}

/// Yields the baton at the current point without blocking (§4.3 Thread:
/// Yield).
pub async fn yield_now(engine: &Arc<Engine>, op: OperationId) -> OpResult<()> {
    engine.schedule_next_operation(op, SchedulingPointType::Yield).await
}
