use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use systematic_core::OperationId;

use super::{SchedulingHint, Strategy};

/// Priority-change-point strategy (§3 PCT/Priority(d, steps)), optionally
/// wrapped with the FairPCT fairness oracle (§3 FairPCT).
///
/// New operations enter at the highest priority, as in the PCT algorithm;
/// at each of `priority_changes` randomly chosen steps, the operation that
/// just ran is demoted to the lowest priority. `next_operation` always
/// picks the highest-priority operation that is currently enabled, unless
/// `fair` is set and the engine reports a critically hot monitor, in
/// which case the strategy round-robins the enabled set instead of
/// honoring priority for that single decision — forcing a different
/// operation to make progress without abandoning the priority order
/// for subsequent steps.
pub struct PctStrategy {
    rng: StdRng,
    priority_changes: u32,
    fair: bool,
    priorities: Vec<OperationId>,
    change_points: Vec<u32>,
    step: u32,
    round_robin_cursor: usize,
}

impl PctStrategy {
    pub fn new(seed: u64, priority_changes: u32, fair: bool) -> Self {
        let mut strategy = PctStrategy {
            rng: StdRng::seed_from_u64(seed),
            priority_changes,
            fair,
            priorities: Vec::new(),
            change_points: Vec::new(),
            step: 0,
            round_robin_cursor: 0,
        };
        strategy.reroll_change_points();
        strategy
    }

    fn reroll_change_points(&mut self) {
        // Change points are chosen within a generous horizon; steps past
        // the horizon simply never see another demotion, which is a
        // harmless, documented simplification of the PCT paper's
        // "estimated step bound" parameter.
        const HORIZON: u32 = 1_000;
        let mut points: Vec<u32> = (0..self.priority_changes)
            .map(|_| self.rng.gen_range(1..HORIZON))
            .collect();
        points.sort_unstable();
        self.change_points = points;
    }

    fn ensure_known(&mut self, enabled: &[OperationId]) {
        for &op in enabled {
            if !self.priorities.contains(&op) {
                // Newly observed operations start at the highest priority.
                self.priorities.insert(0, op);
            }
        }
    }

    fn highest_priority(&self, enabled: &[OperationId]) -> OperationId {
        self.priorities
            .iter()
            .copied()
            .find(|op| enabled.contains(op))
            .unwrap_or_else(|| super::smallest_id(enabled))
    }

    fn demote(&mut self, op: OperationId) {
        self.priorities.retain(|&candidate| candidate != op);
        self.priorities.push(op);
    }
}

impl Strategy for PctStrategy {
    fn next_operation(
        &mut self,
        enabled: &[OperationId],
        _current: Option<OperationId>,
        hint: SchedulingHint,
    ) -> OperationId {
        self.ensure_known(enabled);

        let chosen = if self.fair && hint.hot_monitor_critical {
            let mut sorted: Vec<OperationId> = enabled.to_vec();
            sorted.sort_unstable();
            let pick = sorted[self.round_robin_cursor % sorted.len()];
            self.round_robin_cursor = self.round_robin_cursor.wrapping_add(1);
            pick
        } else {
            self.highest_priority(enabled)
        };

        if self.change_points.contains(&self.step) {
            self.demote(chosen);
        }
        self.step += 1;

        chosen
    }

    fn next_bool(&mut self) -> bool {
        self.rng.gen_bool(0.5)
    }

    fn next_int(&mut self, max: u64) -> u64 {
        if max == 0 {
            0
        } else {
            self.rng.gen_range(0..max)
        }
    }

    fn prepare_next_iteration(&mut self, _iteration: u32) -> bool {
        self.priorities.clear();
        self.step = 0;
        self.round_robin_cursor = 0;
        self.reroll_change_points();
        true
    }

    fn description(&self) -> String {
        if self.fair {
            format!("fair-pct(d={})", self.priority_changes)
        } else {
            format!("pct(d={})", self.priority_changes)
        }
    }
}
