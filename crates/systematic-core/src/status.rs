/// Lifecycle state of a controlled operation (§3 Controlled operation).
///
/// An operation moves from `None` (registered but not yet started) to
/// `Enabled`, oscillates between `Enabled` and one of the `Blocked*`
/// variants as it acquires and releases resources, and finally reaches
/// `Completed`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum OperationStatus {
    None,
    Enabled,
    BlockedOnWait,
    BlockedOnReceive,
    BlockedOnResource,
    Delayed,
    PausedOnDelay,
    Completed,
}

impl OperationStatus {
    pub fn is_enabled(self) -> bool {
        matches!(self, OperationStatus::Enabled)
    }

    pub fn is_blocked(self) -> bool {
        matches!(
            self,
            OperationStatus::BlockedOnWait
                | OperationStatus::BlockedOnReceive
                | OperationStatus::BlockedOnResource
                | OperationStatus::Delayed
                | OperationStatus::PausedOnDelay
        )
    }

    pub fn is_completed(self) -> bool {
        matches!(self, OperationStatus::Completed)
    }
}
