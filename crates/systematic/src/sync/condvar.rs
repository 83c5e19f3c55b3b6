use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use systematic_core::{OperationId, OperationStatus, SchedulingPointType};

use crate::engine::Engine;
use crate::error::OpResult;
use crate::operation::WakePredicate;

use super::mutex::{ControlledMutex, ControlledMutexGuard};

/// Condition variable paired with a `ControlledMutex` (§4.3 Condvar).
///
/// `notify_one` and `notify_all` both just bump a shared generation
/// counter: under cooperative scheduling every blocked waiter re-checks
/// its predicate on the next scheduling decision regardless of how many
/// were "woken", so there is no externally observable difference between
/// the two beyond the one the user's own state makes.
pub struct ControlledCondvar {
    generation: Arc<AtomicU64>,
}

impl ControlledCondvar {
    pub fn new() -> Self {
        ControlledCondvar {
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn notify_one(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    pub fn notify_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Releases `guard`'s lock, blocks until a notification lands, then
    /// reacquires the mutex before returning.
    pub async fn wait<'a, T>(
        &self,
        op: OperationId,
        engine: &Arc<Engine>,
        mutex: &'a ControlledMutex<T>,
        guard: ControlledMutexGuard<'a, T>,
    ) -> OpResult<ControlledMutexGuard<'a, T>> {
        let seen = self.generation.load(Ordering::SeqCst);
        guard.release(op).await?;

        let generation = self.generation.clone();
        let predicate: WakePredicate = Box::new(move || generation.load(Ordering::SeqCst) != seen);
        engine
            .block_until(op, OperationStatus::BlockedOnWait, predicate, SchedulingPointType::SignalWait)
            .await?;

        mutex.lock(op).await
    }
}

impl Default for ControlledCondvar {
    fn default() -> Self {
        Self::new()
    }
}
