/*
SPDX-License-Identifier: MIT
*/

//! Placement policies: pure functions from `(candidates, pod, metrics) →
//! chosen node`.
//!
//! Mirrors the teacher's `GlobalScheduler` algorithm dispatch
//! (`scheduler/mod.rs::schedule`) but represents each algorithm as its own
//! small type implementing one shared [`Policy`] trait instead of a single
//! `match` over a string — the per-policy state a couple of these algorithms
//! need (the round-robin counter, the bandit's arm table) is then owned by
//! that type rather than living as scattered mutable fields or (as in the
//! original system) a static.

pub mod bandit;
pub mod first_available;
pub mod least_cpu;
pub mod priority;
pub mod round_robin;

use std::fmt;
use std::str::FromStr;

use crate::domain::{Node, Pod};
use crate::metrics::MetricsSnapshot;

pub use bandit::Bandit;
pub use first_available::FirstAvailable;
pub use least_cpu::LeastCpu;
pub use priority::Priority;
pub use round_robin::RoundRobin;

/// Process-lifetime identifier for a placement policy (§3 DATA MODEL).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyTag {
    FirstAvailable,
    RoundRobin,
    LeastCpu,
    Priority,
    Bandit,
}

impl fmt::Display for PolicyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PolicyTag::FirstAvailable => "first-available",
            PolicyTag::RoundRobin => "round-robin",
            PolicyTag::LeastCpu => "least-cpu",
            PolicyTag::Priority => "priority",
            PolicyTag::Bandit => "bandit",
        };
        f.write_str(s)
    }
}

/// Parse error for [`PolicyTag::from_str`] — the input did not match any of
/// the `FIXED_STRATEGY` vocabulary (§6 EXTERNAL INTERFACES).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPolicyTag(pub String);

impl fmt::Display for UnknownPolicyTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown fixed strategy '{}' (valid: FCFS, BALANCED, LEAST_LOADED, PRIORITY, BANDIT)",
            self.0
        )
    }
}
impl std::error::Error for UnknownPolicyTag {}

impl FromStr for PolicyTag {
    type Err = UnknownPolicyTag;

    /// Parses the `FIXED_STRATEGY` environment vocabulary, not the
    /// hyphenated log tag produced by [`Display`](fmt::Display) — the two
    /// are intentionally distinct strings (§6 table vs. §3 `PolicyTag`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "FCFS" => Ok(PolicyTag::FirstAvailable),
            "BALANCED" => Ok(PolicyTag::RoundRobin),
            "LEAST_LOADED" => Ok(PolicyTag::LeastCpu),
            "PRIORITY" => Ok(PolicyTag::Priority),
            "BANDIT" => Ok(PolicyTag::Bandit),
            _ => Err(UnknownPolicyTag(s.to_string())),
        }
    }
}

/// A placement policy: given a non-empty-checked candidate list, a pod, and a
/// metrics snapshot, choose one candidate.
///
/// `candidates` is pre-filtered by the loop (§4.1 candidate filtering rules)
/// — a policy never needs to consult readiness or taints itself. An empty
/// slice is the only case in which `select` returns `None` ("no suitable
/// node", §4.3).
pub trait Policy: Send + Sync {
    fn tag(&self) -> PolicyTag;

    fn select(&self, candidates: &[&Node], pod: &Pod, metrics: &MetricsSnapshot) -> Option<String>;
}

/// All five policy instances, constructed once and held for the lifetime of
/// the scheduling loop so that per-policy state (the round-robin counter,
/// the bandit's arm table) survives adaptive policy switches — switching
/// only changes which instance is *active*, never re-creates one (see the
/// teacher's design-note guidance on replacing a static counter with one
/// owned by a long-lived instance).
pub struct PolicySet {
    first_available: FirstAvailable,
    round_robin: RoundRobin,
    least_cpu: LeastCpu,
    priority: Priority,
    bandit: Bandit,
}

impl PolicySet {
    pub fn new() -> Self {
        Self {
            first_available: FirstAvailable,
            round_robin: RoundRobin::new(),
            least_cpu: LeastCpu,
            priority: Priority::new(),
            bandit: Bandit::new(),
        }
    }

    pub fn get(&self, tag: PolicyTag) -> &dyn Policy {
        match tag {
            PolicyTag::FirstAvailable => &self.first_available,
            PolicyTag::RoundRobin => &self.round_robin,
            PolicyTag::LeastCpu => &self.least_cpu,
            PolicyTag::Priority => &self.priority,
            PolicyTag::Bandit => &self.bandit,
        }
    }

    pub fn bandit(&self) -> &Bandit {
        &self.bandit
    }
}

impl Default for PolicySet {
    fn default() -> Self {
        Self::new()
    }
}
