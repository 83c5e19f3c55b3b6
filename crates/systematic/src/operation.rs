use std::sync::Arc;

use systematic_core::{OperationCounts, OperationId, OperationStatus};

use crate::gate::Gate;

/// Predicate consulted by `OperationTable::promote_ready` to decide
/// whether a blocked operation may become `Enabled` again (§3: "An
/// operation transitions to Enabled only via an explicit wake or a
/// scheduler-observed precondition").
pub type WakePredicate = Box<dyn Fn() -> bool + Send + Sync>;

/// One row of the operation table (§3 Controlled operation).
pub struct OperationRecord {
    pub id: OperationId,
    pub name: String,
    pub status: OperationStatus,
    pub gate: Arc<Gate>,
    wake: Option<WakePredicate>,
    suppress_depth: u32,
}

impl OperationRecord {
    fn new(id: OperationId, name: String) -> Self {
        OperationRecord {
            id,
            name,
            status: OperationStatus::Enabled,
            gate: Arc::new(Gate::new()),
            wake: None,
            suppress_depth: 0,
        }
    }

    /// Whether scheduling-point emission is currently suppressed for this
    /// operation (§5 Suppress/Resume).
    pub fn is_suppressed(&self) -> bool {
        self.suppress_depth > 0
    }

    pub fn suppress(&mut self) {
        self.suppress_depth += 1;
    }

    pub fn resume(&mut self) {
        self.suppress_depth = self.suppress_depth.saturating_sub(1);
    }
}

/// Registry of controlled operations and their states (§4.1).
///
/// Single-writer within an iteration: every call happens from whichever
/// operation currently holds the "executing" role, so no internal
/// locking is needed here. Enumeration walks operations in registration
/// order, which is also their numeric id order since ids are assigned
/// sequentially and never reused within an iteration.
#[derive(Default)]
pub struct OperationTable {
    records: Vec<OperationRecord>,
}

impl OperationTable {
    pub fn new() -> Self {
        OperationTable { records: Vec::new() }
    }

    pub fn register(&mut self, name: impl Into<String>) -> OperationId {
        let id = OperationId::new(self.records.len() as u32);
        self.records.push(OperationRecord::new(id, name.into()));
        id
    }

    pub fn get(&self, id: OperationId) -> &OperationRecord {
        &self.records[id.index()]
    }

    pub fn get_mut(&mut self, id: OperationId) -> &mut OperationRecord {
        &mut self.records[id.index()]
    }

    pub fn gate(&self, id: OperationId) -> Arc<Gate> {
        self.records[id.index()].gate.clone()
    }

    pub fn set_status(&mut self, id: OperationId, status: OperationStatus) {
        self.records[id.index()].status = status;
    }

    /// Mark `id` blocked under `status`, to be promoted back to `Enabled`
    /// once `predicate` returns true.
    pub fn block(&mut self, id: OperationId, status: OperationStatus, predicate: WakePredicate) {
        debug_assert!(status.is_blocked());
        let record = &mut self.records[id.index()];
        record.status = status;
        record.wake = Some(predicate);
    }

    /// Re-evaluate every blocked operation's wake predicate, promoting
    /// those that are now ready to `Enabled`. Returns whether any
    /// operation was promoted.
    pub fn promote_ready(&mut self) -> bool {
        let mut promoted = false;
        for record in &mut self.records {
            if record.status.is_blocked() {
                let ready = record.wake.as_ref().map(|wake| wake()).unwrap_or(false);
                if ready {
                    record.status = OperationStatus::Enabled;
                    record.wake = None;
                    promoted = true;
                }
            }
        }
        promoted
    }

    /// Operations currently `Enabled`, in insertion order.
    pub fn enabled(&self) -> Vec<OperationId> {
        self.records
            .iter()
            .filter(|record| record.status.is_enabled())
            .map(|record| record.id)
            .collect()
    }

    pub fn all_completed(&self) -> bool {
        self.records.iter().all(|record| record.status.is_completed())
    }

    pub fn any_blocked(&self) -> bool {
        self.records.iter().any(|record| record.status.is_blocked())
    }

    pub fn counts(&self) -> OperationCounts {
        let mut counts = OperationCounts::default();
        for record in &self.records {
            counts.record(record.status);
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_assigns_sequential_ids_and_enabled_status() {
        let mut table = OperationTable::new();
        let a = table.register("a");
        let b = table.register("b");
        assert_eq!(a, OperationId::new(0));
        assert_eq!(b, OperationId::new(1));
        assert_eq!(table.enabled(), vec![a, b]);
    }

    #[test]
    fn blocked_operation_is_excluded_until_predicate_is_true() {
        let mut table = OperationTable::new();
        let a = table.register("a");
        let ready = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
        table.block(a, OperationStatus::BlockedOnResource, {
            let ready = ready.clone();
            Box::new(move || ready.load(std::sync::atomic::Ordering::SeqCst))
        });
        assert!(table.enabled().is_empty());
        assert!(table.any_blocked());

        assert!(!table.promote_ready());
        ready.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(table.promote_ready());
        assert_eq!(table.enabled(), vec![a]);
    }

    #[test]
    fn all_completed_is_true_for_an_empty_table() {
        let table = OperationTable::new();
        assert!(table.all_completed());
    }
}
