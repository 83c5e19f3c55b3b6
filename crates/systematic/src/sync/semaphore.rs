use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use systematic_core::{OperationId, OperationStatus, SchedulingPointType};

use crate::engine::Engine;
use crate::error::OpResult;
use crate::operation::WakePredicate;

/// Counting semaphore whose acquire/release are controlled scheduling
/// points (§4.3 `Semaphore(initial, max)`).
pub struct ControlledSemaphore {
    engine: Arc<Engine>,
    permits: Arc<AtomicU32>,
    max: u32,
}

impl ControlledSemaphore {
    pub fn new(engine: Arc<Engine>, initial: u32, max: u32) -> Self {
        ControlledSemaphore {
            engine,
            permits: Arc::new(AtomicU32::new(initial)),
            max,
        }
    }

    pub async fn acquire(&self, op: OperationId) -> OpResult<()> {
        loop {
            let current = self.permits.load(Ordering::SeqCst);
            if current > 0
                && self
                    .permits
                    .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                    .is_ok()
            {
                return self
                    .engine
                    .schedule_next_operation(op, SchedulingPointType::AcquireLock)
                    .await;
            }

            let permits = self.permits.clone();
            let predicate: WakePredicate = Box::new(move || permits.load(Ordering::SeqCst) > 0);
            self.engine
                .block_until(op, OperationStatus::BlockedOnResource, predicate, SchedulingPointType::AcquireLock)
                .await?;
        }
    }

    /// Non-blocking `Wait(0)`: takes a permit if one is free, otherwise
    /// returns `false` immediately without emitting a scheduling point.
    pub fn try_acquire(&self) -> bool {
        loop {
            let current = self.permits.load(Ordering::SeqCst);
            if current == 0 {
                return false;
            }
            if self
                .permits
                .compare_exchange(current, current - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                return true;
            }
        }
    }

    pub async fn release(&self, op: OperationId) -> OpResult<()> {
        let max = self.max;
        self.permits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| Some((current + 1).min(max)))
            .ok();
        self.engine.schedule_next_operation(op, SchedulingPointType::ReleaseLock).await
    }

    pub fn available_permits(&self) -> u32 {
        self.permits.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use systematic_core::Config;

    #[tokio::test]
    async fn acquire_consumes_a_permit_and_release_restores_it() {
        let engine = Engine::new(Config::default(), 1);
        let op = engine.register_root("root");
        let sem = ControlledSemaphore::new(engine.clone(), 1, 1);

        sem.acquire(op).await.unwrap();
        assert_eq!(sem.available_permits(), 0);
        sem.release(op).await.unwrap();
        assert_eq!(sem.available_permits(), 1);
    }

    #[tokio::test]
    async fn release_never_exceeds_the_configured_maximum() {
        let engine = Engine::new(Config::default(), 1);
        let op = engine.register_root("root");
        let sem = ControlledSemaphore::new(engine.clone(), 1, 1);

        sem.release(op).await.unwrap();
        assert_eq!(sem.available_permits(), 1);
    }

    #[test]
    fn try_acquire_on_an_empty_semaphore_returns_false_synchronously() {
        let engine = Engine::new(Config::default(), 1);
        let sem = ControlledSemaphore::new(engine, 0, 1);

        assert!(!sem.try_acquire());
        assert_eq!(sem.available_permits(), 0);
    }

    #[test]
    fn try_acquire_on_a_free_permit_takes_it() {
        let engine = Engine::new(Config::default(), 1);
        let sem = ControlledSemaphore::new(engine, 1, 1);

        assert!(sem.try_acquire());
        assert_eq!(sem.available_permits(), 0);
    }
}
