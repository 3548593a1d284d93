/*
SPDX-License-Identifier: MIT
*/

//! Priority policy: defers to least-cpu placement for high-priority pods and
//! to first-available placement otherwise.

use crate::domain::{pod_priority, Node, Pod};
use crate::metrics::MetricsSnapshot;

use super::{first_available::FirstAvailable, least_cpu::LeastCpu, Policy, PolicyTag};

/// Pods with a `priority` label of `5` or above get the load-aware
/// least-cpu treatment; everything else is placed on the first candidate,
/// matching the cheaper first-available path for routine pods.
const HIGH_PRIORITY_THRESHOLD: i64 = 5;

pub struct Priority {
    least_cpu: LeastCpu,
    first_available: FirstAvailable,
}

impl Priority {
    pub fn new() -> Self {
        Self {
            least_cpu: LeastCpu,
            first_available: FirstAvailable,
        }
    }
}

impl Policy for Priority {
    fn tag(&self) -> PolicyTag {
        PolicyTag::Priority
    }

    fn select(&self, candidates: &[&Node], pod: &Pod, metrics: &MetricsSnapshot) -> Option<String> {
        if pod_priority(pod) >= HIGH_PRIORITY_THRESHOLD {
            self.least_cpu.select(candidates, pod, metrics)
        } else {
            self.first_available.select(candidates, pod, metrics)
        }
    }
}
