/*
SPDX-License-Identifier: MIT
*/

//! Core cluster data structures used by the scheduling loop.
//!
//! Mirrors the pattern in the teacher codebase's `task.rs`: the orchestrator
//! hands us wire types (`k8s_openapi::api::core::v1::{Node, Pod}`), which we
//! immediately convert into a smaller, typed working copy. Only the fields the
//! scheduler actually reads make it across that boundary — everything else
//! (pod volumes, container specs, node addresses, ...) is dropped on the way
//! in.

use std::collections::HashMap;

use k8s_openapi::api::core::v1::{Node as K8sNode, Pod as K8sPod};

/// The effect of a node taint that influences scheduling eligibility.
///
/// Only `NoSchedule` and `NoExecute` disqualify a node as a candidate (see
/// [`candidate`](crate::orchestrator::candidate_nodes)); `PreferNoSchedule` is
/// carried through for completeness but never filters a node out — this
/// scheduler has no soft-affinity scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaintEffect {
    NoSchedule,
    PreferNoSchedule,
    NoExecute,
    /// An effect string the orchestrator sent that we don't recognise.
    /// Treated the same as `PreferNoSchedule` — never disqualifying.
    Unknown,
}

impl TaintEffect {
    pub fn from_str(effect: &str) -> Self {
        match effect {
            "NoSchedule" => TaintEffect::NoSchedule,
            "PreferNoSchedule" => TaintEffect::PreferNoSchedule,
            "NoExecute" => TaintEffect::NoExecute,
            _ => TaintEffect::Unknown,
        }
    }

    /// Whether a taint with this effect disqualifies a node as a candidate.
    pub fn disqualifies(self) -> bool {
        matches!(self, TaintEffect::NoSchedule | TaintEffect::NoExecute)
    }
}

#[derive(Debug, Clone)]
pub struct Taint {
    pub key: String,
    pub effect: TaintEffect,
}

/// A cluster node as seen by the scheduler for the duration of one loop
/// iteration.
///
/// Immutable within an iteration (§3 DATA MODEL): the loop re-fetches a fresh
/// `Vec<Node>` from the orchestrator on every pass rather than mutating these
/// in place.
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub ready: bool,
    pub taints: Vec<Taint>,
    /// Allocatable CPU, in millicores (e.g. `4000` = 4 full cores).
    pub allocatable_millicpu: u64,
}

impl Node {
    /// A node is untainted against scheduling iff none of its taints carry a
    /// disqualifying effect.
    pub fn is_untainted(&self) -> bool {
        !self.taints.iter().any(|t| t.effect.disqualifies())
    }
}

/// Build a [`Node`] from the orchestrator's wire representation.
///
/// Returns `None` for nodes with no status or no `Ready` condition reported
/// yet — such a node cannot be a scheduling candidate regardless, so callers
/// may simply filter out `None`s.
pub fn node_from_k8s(node: &K8sNode) -> Option<Node> {
    let name = node.metadata.name.clone()?;
    let status = node.status.as_ref()?;

    let ready = status
        .conditions
        .as_ref()
        .map(|conds| {
            conds
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
        .unwrap_or(false);

    let taints = node
        .spec
        .as_ref()
        .and_then(|spec| spec.taints.as_ref())
        .map(|taints| {
            taints
                .iter()
                .map(|t| Taint {
                    key: t.key.clone(),
                    effect: TaintEffect::from_str(&t.effect),
                })
                .collect()
        })
        .unwrap_or_default();

    let allocatable_millicpu = status
        .allocatable
        .as_ref()
        .and_then(|a| a.get("cpu"))
        .and_then(|q| crate::metrics::quantity::parse_cpu_millicores(&q.0).ok())
        .unwrap_or(0);

    Some(Node {
        name,
        ready,
        taints,
        allocatable_millicpu,
    })
}

/// A pod observed pending placement by this scheduler.
///
/// Only pods with `scheduler_name == "adaptive-scheduler"` (the claim
/// protocol, §6 EXTERNAL INTERFACES) and no `target_node` are ever handed to a
/// policy.
#[derive(Debug, Clone, Default)]
pub struct Pod {
    pub name: String,
    pub namespace: String,
    pub scheduler_name: Option<String>,
    pub target_node: Option<String>,
    pub labels: HashMap<String, String>,
}

impl Pod {
    pub fn is_pending_for(&self, scheduler_name: &str) -> bool {
        self.scheduler_name.as_deref() == Some(scheduler_name) && self.target_node.is_none()
    }
}

/// Build a [`Pod`] from the orchestrator's wire representation.
pub fn pod_from_k8s(pod: &K8sPod) -> Option<Pod> {
    let name = pod.metadata.name.clone()?;
    let namespace = pod.metadata.namespace.clone().unwrap_or_default();
    let labels = pod.metadata.labels.clone().unwrap_or_default();
    let spec = pod.spec.as_ref();

    Some(Pod {
        name,
        namespace,
        scheduler_name: spec.and_then(|s| s.scheduler_name.clone()),
        target_node: spec.and_then(|s| s.node_name.clone()),
        labels,
    })
}

/// Read a pod's integer `priority` label.
///
/// Defaults to `1` when the label is absent or fails to parse as an integer —
/// this mirrors the teacher's design-note guidance to replace reflective,
/// string-keyed label lookups with an explicit, always-defaulting accessor
/// rather than propagating an error for a cosmetic metadata field.
pub fn pod_priority(pod: &Pod) -> i64 {
    pod.labels
        .get("priority")
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untainted_node_with_no_taints() {
        let node = Node {
            name: "n1".into(),
            ready: true,
            taints: vec![],
            allocatable_millicpu: 4000,
        };
        assert!(node.is_untainted());
    }

    #[test]
    fn no_schedule_taint_disqualifies() {
        let node = Node {
            name: "n1".into(),
            ready: true,
            taints: vec![Taint {
                key: "dedicated".into(),
                effect: TaintEffect::NoSchedule,
            }],
            allocatable_millicpu: 4000,
        };
        assert!(!node.is_untainted());
    }

    #[test]
    fn prefer_no_schedule_does_not_disqualify() {
        let node = Node {
            name: "n1".into(),
            ready: true,
            taints: vec![Taint {
                key: "soft".into(),
                effect: TaintEffect::PreferNoSchedule,
            }],
            allocatable_millicpu: 4000,
        };
        assert!(node.is_untainted());
    }

    #[test]
    fn pod_priority_defaults_to_one_when_absent() {
        let pod = Pod::default();
        assert_eq!(pod_priority(&pod), 1);
    }

    #[test]
    fn pod_priority_defaults_to_one_when_unparseable() {
        let mut pod = Pod::default();
        pod.labels.insert("priority".into(), "urgent".into());
        assert_eq!(pod_priority(&pod), 1);
    }

    #[test]
    fn pod_priority_parses_valid_integer() {
        let mut pod = Pod::default();
        pod.labels.insert("priority".into(), "7".into());
        assert_eq!(pod_priority(&pod), 7);
    }

    #[test]
    fn pod_is_pending_requires_matching_scheduler_and_no_target() {
        let mut pod = Pod {
            scheduler_name: Some("adaptive-scheduler".into()),
            ..Default::default()
        };
        assert!(pod.is_pending_for("adaptive-scheduler"));

        pod.target_node = Some("node01".into());
        assert!(!pod.is_pending_for("adaptive-scheduler"));

        pod.target_node = None;
        pod.scheduler_name = Some("other-scheduler".into());
        assert!(!pod.is_pending_for("adaptive-scheduler"));
    }
}
