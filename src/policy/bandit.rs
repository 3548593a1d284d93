/*
SPDX-License-Identifier: MIT
*/

//! UCB1 multi-armed bandit policy.
//!
//! Each node is a bandit arm. Selection and reward observation happen
//! together inside one `select` call: the snapshot handed in already carries
//! this iteration's CPU reading for whichever node gets picked, so reward can
//! be computed and folded into the arm's running statistics before `select`
//! returns — there is no separate "report outcome later" step.
//!
//! Arm state lives in a `Mutex<HashMap<..>>`, following the same shape the
//! teacher uses for shared mutable state it must both mutate during normal
//! operation and read back out for a shutdown report (see
//! `scheduler/mod.rs`'s use of interior mutability behind an `Arc`).

use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::{Node, Pod};
use crate::metrics::MetricsSnapshot;

use super::{Policy, PolicyTag};

/// Exploration floor: every arm must be tried at least this many times
/// before UCB scoring kicks in (§4.3 BANDIT POLICY).
const MIN_TRIALS: u64 = 2;

/// Exploration constant in the UCB1 formula `R̄(a) + c·√(ln(N+1)/n(a))`.
const EXPLORATION_CONSTANT: f64 = std::f64::consts::SQRT_2;

#[derive(Debug, Clone, Copy)]
struct ArmStats {
    n: u64,
    cumulative_reward: f64,
}

impl ArmStats {
    fn mean_reward(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.cumulative_reward / self.n as f64
        }
    }
}

/// Read-only view of one arm's accumulated statistics, for decision-log
/// reporting.
#[derive(Debug, Clone)]
pub struct ArmSnapshot {
    pub node: String,
    pub n: u64,
    pub cumulative_reward: f64,
}

impl ArmSnapshot {
    pub fn mean_reward(&self) -> Option<f64> {
        if self.n == 0 {
            None
        } else {
            Some(self.cumulative_reward / self.n as f64)
        }
    }
}

/// Piecewise CPU-utilisation reward used after every bandit pull (§4.3, §8
/// scenario 5):
///
/// * `[30, 70]` — the sweet spot, reward `1.0`.
/// * `< 30` — under-utilised; reward rises linearly from `0.5` at `0%` to
///   `0.8` at `30%`.
/// * `(70, 90]` — crowded; reward falls linearly from `1.0` at `70%` to
///   `0.5` at `90%`.
/// * `> 90` — overloaded, flat reward `0.2`.
pub fn reward_for_cpu(cpu_percent: f64) -> f64 {
    let reward = if (30.0..=70.0).contains(&cpu_percent) {
        1.0
    } else if cpu_percent < 30.0 {
        0.5 + (cpu_percent / 30.0) * 0.3
    } else if cpu_percent <= 90.0 {
        1.0 - ((cpu_percent - 70.0) / 20.0) * 0.5
    } else {
        0.2
    };
    reward.clamp(0.0, 1.0)
}

pub struct Bandit {
    arms: Mutex<HashMap<String, ArmStats>>,
}

impl Bandit {
    pub fn new() -> Self {
        Self {
            arms: Mutex::new(HashMap::new()),
        }
    }

    /// A point-in-time view of every arm this bandit has ever seen, for the
    /// decision log's statistics report (§5 DECISION LOG & STATISTICS).
    pub fn snapshot(&self) -> Vec<ArmSnapshot> {
        let arms = self.arms.lock().unwrap();
        arms.iter()
            .map(|(node, stats)| ArmSnapshot {
                node: node.clone(),
                n: stats.n,
                cumulative_reward: stats.cumulative_reward,
            })
            .collect()
    }
}

impl Policy for Bandit {
    fn tag(&self) -> PolicyTag {
        PolicyTag::Bandit
    }

    fn select(&self, candidates: &[&Node], _pod: &Pod, metrics: &MetricsSnapshot) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }

        let mut arms = self.arms.lock().unwrap();
        for node in candidates {
            arms.entry(node.name.clone()).or_insert(ArmStats {
                n: 0,
                cumulative_reward: 0.0,
            });
        }

        // Exploration floor: the first (lowest input index) under-explored
        // candidate is chosen deterministically, bypassing UCB scoring
        // entirely.
        let under_explored = candidates
            .iter()
            .find(|n| arms[&n.name].n < MIN_TRIALS)
            .copied();

        let chosen = if let Some(node) = under_explored {
            node
        } else {
            let total_trials: u64 = arms.values().map(|a| a.n).sum();
            let ln_term = ((total_trials + 1) as f64).ln();

            let mut best: Option<(&Node, f64)> = None;
            for node in candidates {
                let stats = arms[&node.name];
                let score =
                    stats.mean_reward() + EXPLORATION_CONSTANT * (ln_term / stats.n as f64).sqrt();
                match best {
                    Some((_, best_score)) if score <= best_score => {}
                    _ => best = Some((node, score)),
                }
            }
            best.map(|(node, _)| node).expect("candidates is non-empty")
        };

        let cpu = metrics.node_cpu_percent(&chosen.name);
        let reward = reward_for_cpu(cpu);
        let stats = arms.get_mut(&chosen.name).expect("arm was just ensured");
        stats.n += 1;
        stats.cumulative_reward += reward;

        Some(chosen.name.clone())
    }
}
