use systematic_core::OperationId;

use super::{SchedulingHint, Strategy};

/// One node of the exhaustive choice tree: how many alternatives were
/// available and which one was taken.
struct Decision {
    domain: usize,
    chosen: usize,
}

/// Exhaustive depth-first exploration of the enabled-set choice tree
/// (§3 DFS, §8 invariant 6).
///
/// Every `next_operation`/`next_bool`/`next_int` call is a node in one
/// shared choice tree. `prepare_next_iteration` backtracks to the
/// deepest decision with an untried alternative and advances it,
/// truncating everything below; when no such decision remains the tree
/// has been fully explored and the driver is told to stop.
pub struct DfsStrategy {
    decisions: Vec<Decision>,
    cursor: usize,
    first_iteration: bool,
}

impl DfsStrategy {
    pub fn new() -> Self {
        DfsStrategy {
            decisions: Vec::new(),
            cursor: 0,
            first_iteration: true,
        }
    }

    fn pick(&mut self, domain: usize) -> usize {
        debug_assert!(domain > 0);
        if self.cursor < self.decisions.len() {
            let decision = &mut self.decisions[self.cursor];
            // The recorded choice may no longer fit if this run's control
            // flow diverged from the run that produced it; clamp rather
            // than panic, which keeps DFS usable on programs whose branch
            // count can vary slightly between iterations.
            if decision.chosen >= domain {
                decision.chosen = domain - 1;
            }
            decision.domain = domain;
            let chosen = decision.chosen;
            self.cursor += 1;
            chosen
        } else {
            self.decisions.push(Decision { domain, chosen: 0 });
            self.cursor += 1;
            0
        }
    }
}

impl Default for DfsStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for DfsStrategy {
    fn next_operation(
        &mut self,
        enabled: &[OperationId],
        _current: Option<OperationId>,
        _hint: SchedulingHint,
    ) -> OperationId {
        let mut sorted = enabled.to_vec();
        sorted.sort_unstable();
        let index = self.pick(sorted.len());
        sorted[index]
    }

    fn next_bool(&mut self) -> bool {
        self.pick(2) == 1
    }

    fn next_int(&mut self, max: u64) -> u64 {
        if max == 0 {
            0
        } else {
            self.pick(max as usize) as u64
        }
    }

    fn prepare_next_iteration(&mut self, _iteration: u32) -> bool {
        self.cursor = 0;
        if self.first_iteration {
            self.first_iteration = false;
            return true;
        }

        while let Some(last) = self.decisions.last_mut() {
            if last.chosen + 1 < last.domain {
                last.chosen += 1;
                return true;
            }
            self.decisions.pop();
        }
        false
    }

    fn description(&self) -> String {
        "dfs".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausts_a_two_choice_binary_tree_in_two_iterations() {
        let mut strategy = DfsStrategy::new();
        let enabled = [OperationId::new(0), OperationId::new(1)];

        assert!(strategy.prepare_next_iteration(1));
        let first = strategy.next_operation(&enabled, None, SchedulingHint::default());

        assert!(strategy.prepare_next_iteration(2));
        let second = strategy.next_operation(&enabled, None, SchedulingHint::default());
        assert_ne!(first, second);

        assert!(!strategy.prepare_next_iteration(3));
    }

    #[test]
    fn explores_every_leaf_of_a_small_tree() {
        let mut strategy = DfsStrategy::new();
        let enabled = [OperationId::new(0), OperationId::new(1)];
        let mut leaves = Vec::new();
        let mut iteration = 0;
        loop {
            iteration += 1;
            if !strategy.prepare_next_iteration(iteration) {
                break;
            }
            let a = strategy.next_operation(&enabled, None, SchedulingHint::default());
            let b = strategy.next_operation(&enabled, None, SchedulingHint::default());
            leaves.push((a, b));
        }
        assert_eq!(leaves.len(), 4);
        leaves.sort();
        leaves.dedup();
        assert_eq!(leaves.len(), 4, "every combination should be distinct");
    }
}
