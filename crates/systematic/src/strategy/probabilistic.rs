use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use systematic_core::OperationId;

use super::{SchedulingHint, Strategy};

/// Random scheduling biased away from the operation that just ran, using
/// an `n`-bit priority (§3 Probabilistic(n)).
///
/// With probability `1 - 2^-n` the strategy switches away from `current`
/// to a different enabled operation, which is the fairness bias the spec
/// calls for ("toward non-just-scheduled ops"); the remaining `2^-n` of
/// the time it lets `current` keep running when it is still enabled.
pub struct ProbabilisticStrategy {
    rng: StdRng,
    priority_bits: u32,
}

impl ProbabilisticStrategy {
    pub fn new(seed: u64, priority_bits: u32) -> Self {
        ProbabilisticStrategy {
            rng: StdRng::seed_from_u64(seed),
            priority_bits,
        }
    }

    fn stay_probability(&self) -> f64 {
        1.0 / (1u64 << self.priority_bits.min(32)) as f64
    }
}

impl Strategy for ProbabilisticStrategy {
    fn next_operation(
        &mut self,
        enabled: &[OperationId],
        current: Option<OperationId>,
        _hint: SchedulingHint,
    ) -> OperationId {
        if enabled.len() == 1 {
            return enabled[0];
        }

        if let Some(current) = current {
            if enabled.contains(&current) && self.rng.gen_bool(self.stay_probability()) {
                return current;
            }
        }

        let others: Vec<OperationId> = enabled
            .iter()
            .copied()
            .filter(|&op| Some(op) != current)
            .collect();
        let pool = if others.is_empty() { enabled } else { &others };
        pool[self.rng.gen_range(0..pool.len())]
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

    fn description(&self) -> String {
        format!("probabilistic({})", self.priority_bits)
    }
}
