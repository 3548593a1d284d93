/*
SPDX-License-Identifier: MIT
*/

//! Append-only decision log and shutdown statistics.
//!
//! Mirrors the teacher's separation of a plain data-holding type from the
//! component that mutates it (see `task.rs`'s `NodeSchedMap`): the log itself
//! is a bare `Vec`, owned exclusively by the scheduling loop, with grouped
//! views computed on demand rather than maintained incrementally.

use std::collections::HashMap;

use crate::policy::bandit::ArmSnapshot;
use crate::policy::PolicyTag;

/// One committed pod→node placement (§3 DATA MODEL). Never mutated after
/// being appended — the orchestrator confirmed the binding before this is
/// constructed.
#[derive(Debug, Clone)]
pub struct PlacementDecision {
    pub pod_name: String,
    pub node: String,
    pub policy: PolicyTag,
    pub observed_cpu_percent: f64,
}

/// Append-only log of every committed placement for the life of the
/// process.
#[derive(Debug, Default)]
pub struct DecisionLog {
    entries: Vec<PlacementDecision>,
}

impl DecisionLog {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn record(&mut self, decision: PlacementDecision) {
        self.entries.push(decision);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PlacementDecision] {
        &self.entries
    }

    /// Count of decisions per policy tag, for the shutdown report (§4.6).
    pub fn counts_per_policy(&self) -> HashMap<PolicyTag, usize> {
        let mut counts = HashMap::new();
        for entry in &self.entries {
            *counts.entry(entry.policy).or_insert(0) += 1;
        }
        counts
    }

    /// Count of decisions per node, for the shutdown report (§4.6).
    pub fn counts_per_node(&self) -> HashMap<String, usize> {
        let mut counts = HashMap::new();
        for entry in &self.entries {
            *counts.entry(entry.node.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Formatted summary of a [`DecisionLog`] plus (if the bandit was ever
/// active) its per-arm statistics, emitted once on graceful shutdown.
pub struct ShutdownReport {
    pub total_decisions: usize,
    pub per_policy: Vec<(PolicyTag, usize, f64)>,
    pub bandit_arms: Vec<ArmSnapshot>,
}

impl ShutdownReport {
    pub fn build(log: &DecisionLog, bandit_arms: Vec<ArmSnapshot>) -> Self {
        let total_decisions = log.len();
        let counts = log.counts_per_policy();

        let mut per_policy: Vec<(PolicyTag, usize, f64)> = counts
            .into_iter()
            .map(|(tag, count)| {
                let pct = if total_decisions == 0 {
                    0.0
                } else {
                    count as f64 / total_decisions as f64 * 100.0
                };
                (tag, count, pct)
            })
            .collect();
        per_policy.sort_by_key(|(_, count, _)| std::cmp::Reverse(*count));

        Self {
            total_decisions,
            per_policy,
            bandit_arms,
        }
    }
}
