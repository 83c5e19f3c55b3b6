use tokio::sync::Notify;

/// Per-operation blocking handle used by the Interleaving policy (§5
/// Scheduling model: "one per-operation blocking handle, e.g. a binary
/// semaphore").
///
/// `tokio::sync::Notify` already stores at most one permit when
/// `notify_one` is called ahead of a waiter, which is exactly the binary
/// semaphore semantics a gate needs: the scheduler opens at most one gate
/// at a time and the corresponding operation is the only task that ever
/// parks on it.
#[derive(Debug, Default)]
pub struct Gate {
    notify: Notify,
}

impl Gate {
    pub fn new() -> Self {
        Gate {
            notify: Notify::new(),
        }
    }

    /// Wake the operation parked on this gate, or arm it so the next
    /// `park` call returns immediately if no one is parked yet.
    pub fn open(&self) {
        self.notify.notify_one();
    }

    /// Suspend the calling task until the gate is opened.
    pub async fn park(&self) {
        self.notify.notified().await;
    }
}
