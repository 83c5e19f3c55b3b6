use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use systematic_core::{OperationId, OperationStatus, SchedulingPointType};

use crate::engine::Engine;
use crate::error::OpResult;
use crate::operation::WakePredicate;

/// Mutual-exclusion lock whose acquire/release are themselves controlled
/// scheduling points (§4.3 Mutex).
///
/// The locked flag lives behind an `Arc` so a blocked waiter's wake
/// predicate can observe it without borrowing the mutex itself, the same
/// pattern every blocking primitive in this crate uses.
pub struct ControlledMutex<T> {
    engine: Arc<Engine>,
    locked: Arc<AtomicBool>,
    value: Mutex<T>,
}

impl<T> ControlledMutex<T> {
    pub fn new(engine: Arc<Engine>, value: T) -> Self {
        ControlledMutex {
            engine,
            locked: Arc::new(AtomicBool::new(false)),
            value: Mutex::new(value),
        }
    }

    /// Blocks `op` until the lock is free, then takes it.
    pub async fn lock(&self, op: OperationId) -> OpResult<ControlledMutexGuard<'_, T>> {
        loop {
            if self
                .locked
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                self.engine
                    .schedule_next_operation(op, SchedulingPointType::AcquireLock)
                    .await?;
                return Ok(ControlledMutexGuard { mutex: self });
            }

            let locked = self.locked.clone();
            let predicate: WakePredicate = Box::new(move || !locked.load(Ordering::SeqCst));
            self.engine
                .block_until(op, OperationStatus::BlockedOnResource, predicate, SchedulingPointType::AcquireLock)
                .await?;
        }
    }
}

/// RAII guard returned by `ControlledMutex::lock`.
///
/// Dropping the guard always releases the lock so a forgotten `release`
/// call never deadlocks other waiters; call `release` explicitly when the
/// precise `ReleaseLock` scheduling point matters, since Rust has no
/// async `Drop` to emit it automatically.
pub struct ControlledMutexGuard<'a, T> {
    mutex: &'a ControlledMutex<T>,
}

impl<T> ControlledMutexGuard<'_, T> {
    pub fn get(&self) -> parking_lot::MutexGuard<'_, T> {
        self.mutex.value.lock()
    }

    pub async fn release(self, op: OperationId) -> OpResult<()> {
        let mutex = self.mutex;
        std::mem::forget(self);
        mutex.locked.store(false, Ordering::SeqCst);
        mutex.engine.schedule_next_operation(op, SchedulingPointType::ReleaseLock).await
    }
}

impl<T> Drop for ControlledMutexGuard<'_, T> {
    fn drop(&mut self) {
        self.mutex.locked.store(false, Ordering::SeqCst);
    }
}
