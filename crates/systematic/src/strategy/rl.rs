use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use systematic_core::OperationId;

use super::{SchedulingHint, Strategy};

const LEARNING_RATE: f64 = 0.3;
const EXPLORATION_RATE: f64 = 0.2;
const BUG_REWARD: f64 = 1.0;
const NOVELTY_REWARD: f64 = 0.2;

/// Q-learning over `(state hash, operation id)` pairs (§3 RL).
///
/// The state hash approximates "what the scheduler can currently see"
/// with the sorted enabled set and the step index, which is enough to
/// distinguish recurring decision points across iterations without
/// requiring any knowledge of user program state. Reward is applied once
/// per iteration, in `finish_iteration`, and propagated backwards through
/// that iteration's trajectory with geometric decay — the usual shape of
/// reward assignment for episodic Q-learning.
pub struct RlStrategy {
    rng: StdRng,
    q: HashMap<(u64, u32), f64>,
    trajectory: Vec<(u64, u32)>,
    step: u64,
}

impl RlStrategy {
    pub fn new(seed: u64) -> Self {
        RlStrategy {
            rng: StdRng::seed_from_u64(seed),
            q: HashMap::new(),
            trajectory: Vec::new(),
            step: 0,
        }
    }

    fn state_hash(&self, enabled: &[OperationId]) -> u64 {
        let mut sorted: Vec<u32> = enabled.iter().map(|op| op.0).collect();
        sorted.sort_unstable();
        // FNV-1a, good enough for a non-cryptographic bucketing hash.
        let mut hash: u64 = 0xcbf29ce484222325;
        for word in sorted.iter().chain(std::iter::once(&(self.step as u32))) {
            for byte in word.to_le_bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(0x100000001b3);
            }
        }
        hash
    }
}

impl Strategy for RlStrategy {
    fn next_operation(
        &mut self,
        enabled: &[OperationId],
        _current: Option<OperationId>,
        _hint: SchedulingHint,
    ) -> OperationId {
        let state = self.state_hash(enabled);
        self.step += 1;

        let chosen = if self.rng.gen_bool(EXPLORATION_RATE) {
            enabled[self.rng.gen_range(0..enabled.len())]
        } else {
            enabled
                .iter()
                .copied()
                .max_by(|a, b| {
                    let qa = self.q.get(&(state, a.0)).copied().unwrap_or(0.0);
                    let qb = self.q.get(&(state, b.0)).copied().unwrap_or(0.0);
                    qa.partial_cmp(&qb).unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or_else(|| super::smallest_id(enabled))
        };

        self.trajectory.push((state, chosen.0));
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
        self.trajectory.clear();
        self.step = 0;
        true
    }

    fn finish_iteration(&mut self, bug_found: bool, novel_trace: bool) {
        let mut reward = 0.0;
        if bug_found {
            reward += BUG_REWARD;
        }
        if novel_trace {
            reward += NOVELTY_REWARD;
        }
        if reward == 0.0 {
            return;
        }

        let mut discounted = reward;
        for &(state, action) in self.trajectory.iter().rev() {
            let entry = self.q.entry((state, action)).or_insert(0.0);
            *entry += LEARNING_RATE * (discounted - *entry);
            discounted *= 0.9;
        }
    }

    fn description(&self) -> String {
        "rl".to_owned()
    }
}
