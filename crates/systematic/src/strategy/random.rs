use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use systematic_core::OperationId;

use super::{SchedulingHint, Strategy};

/// Uniform-random strategy (§3 Random).
pub struct RandomStrategy {
    rng: StdRng,
}

impl RandomStrategy {
    pub fn new(seed: u64) -> Self {
        RandomStrategy {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Strategy for RandomStrategy {
    fn next_operation(
        &mut self,
        enabled: &[OperationId],
        _current: Option<OperationId>,
        _hint: SchedulingHint,
    ) -> OperationId {
        let index = self.rng.gen_range(0..enabled.len());
        enabled[index]
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
        "random".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_yields_same_sequence() {
        let enabled = [OperationId::new(0), OperationId::new(1), OperationId::new(2)];
        let mut a = RandomStrategy::new(7);
        let mut b = RandomStrategy::new(7);
        for _ in 0..20 {
            assert_eq!(
                a.next_operation(&enabled, None, SchedulingHint::default()),
                b.next_operation(&enabled, None, SchedulingHint::default())
            );
            assert_eq!(a.next_bool(), b.next_bool());
            assert_eq!(a.next_int(100), b.next_int(100));
        }
    }

    #[test]
    fn next_int_of_zero_is_always_zero() {
        let mut strategy = RandomStrategy::new(1);
        for _ in 0..5 {
            assert_eq!(strategy.next_int(0), 0);
        }
    }
}
