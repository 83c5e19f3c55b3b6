use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use systematic_core::{BugKind, DataRaceKind};

use crate::engine::Engine;
use crate::error::OpResult;

/// A collection wrapped with reader/writer race checking (§4.4
/// Collections).
///
/// Real concurrent access never happens at the Rust level under
/// cooperative scheduling; what this catches is two controlled operations
/// touching the same collection across a scheduling point without taking
/// a lock first, which Coyote-style testing models as a race even though
/// nothing actually executes in parallel.
pub struct RaceChecked<T> {
    engine: Arc<Engine>,
    name: String,
    data: RwLock<T>,
    readers: AtomicUsize,
    writers: AtomicUsize,
}

impl<T> RaceChecked<T> {
    pub fn new(engine: Arc<Engine>, name: impl Into<String>, value: T) -> Self {
        RaceChecked {
            engine,
            name: name.into(),
            data: RwLock::new(value),
            readers: AtomicUsize::new(0),
            writers: AtomicUsize::new(0),
        }
    }

    fn checking_enabled(&self) -> bool {
        self.engine.config().is_collection_access_race_checking_enabled
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> OpResult<R> {
        if !self.checking_enabled() {
            return Ok(f(&self.data.read()));
        }
        if self.writers.load(Ordering::SeqCst) > 0 {
            self.engine.raise(BugKind::DataRace {
                collection: self.name.clone(),
                kind: DataRaceKind::ReadWrite,
            })?;
        }
        self.readers.fetch_add(1, Ordering::SeqCst);
        let result = f(&self.data.read());
        self.readers.fetch_sub(1, Ordering::SeqCst);
        Ok(result)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> OpResult<R> {
        if !self.checking_enabled() {
            return Ok(f(&mut self.data.write()));
        }
        if self.writers.load(Ordering::SeqCst) > 0 {
            self.engine.raise(BugKind::DataRace {
                collection: self.name.clone(),
                kind: DataRaceKind::WriteWrite,
            })?;
        } else if self.readers.load(Ordering::SeqCst) > 0 {
            self.engine.raise(BugKind::DataRace {
                collection: self.name.clone(),
                kind: DataRaceKind::ReadWrite,
            })?;
        }
        self.writers.fetch_add(1, Ordering::SeqCst);
        let result = f(&mut self.data.write());
        self.writers.fetch_sub(1, Ordering::SeqCst);
        Ok(result)
    }
}
