/*
SPDX-License-Identifier: MIT
*/

//! Least-CPU policy: pick the candidate with the lowest observed CPU usage.

use crate::domain::{Node, Pod};
use crate::metrics::MetricsSnapshot;

use super::{Policy, PolicyTag};

pub struct LeastCpu;

impl Policy for LeastCpu {
    fn tag(&self) -> PolicyTag {
        PolicyTag::LeastCpu
    }

    fn select(&self, candidates: &[&Node], _pod: &Pod, metrics: &MetricsSnapshot) -> Option<String> {
        // `Iterator::min_by` returns the *last* minimal element on ties;
        // §4.3 requires input order to break ties, so the minimum is tracked
        // by hand instead.
        let mut best: Option<(&Node, f64)> = None;
        for node in candidates {
            let cpu = metrics.node_cpu_percent(&node.name);
            match best {
                Some((_, best_cpu)) if cpu >= best_cpu => {}
                _ => best = Some((node, cpu)),
            }
        }
        best.map(|(node, _)| node.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn node(name: &str) -> Node {
        Node {
            name: name.to_string(),
            ready: true,
            taints: vec![],
            allocatable_millicpu: 1000,
        }
    }

    #[test]
    fn picks_node_with_lowest_cpu() {
        let n1 = node("a");
        let n2 = node("b");
        let n3 = node("c");
        let candidates = vec![&n1, &n2, &n3];
        let mut map = HashMap::new();
        map.insert("a".to_string(), 60.0);
        map.insert("b".to_string(), 20.0);
        map.insert("c".to_string(), 45.0);
        let metrics = MetricsSnapshot::new(map, true);

        let chosen = LeastCpu.select(&candidates, &Pod::default(), &metrics);
        assert_eq!(chosen.as_deref(), Some("b"));
    }

    #[test]
    fn ties_break_by_input_order() {
        let n1 = node("a");
        let n2 = node("b");
        let candidates = vec![&n1, &n2];
        let mut map = HashMap::new();
        map.insert("a".to_string(), 30.0);
        map.insert("b".to_string(), 30.0);
        let metrics = MetricsSnapshot::new(map, true);

        let chosen = LeastCpu.select(&candidates, &Pod::default(), &metrics);
        assert_eq!(chosen.as_deref(), Some("a"));
    }
}
