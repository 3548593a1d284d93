/*
SPDX-License-Identifier: MIT
*/

//! Thin capability layer over the cluster orchestrator's API.
//!
//! [`OrchestratorClient`] is the seam: [`KubeOrchestratorClient`] is the only
//! production implementation, backed by `kube`. Tests exercise the loop
//! against an in-memory fake implementing the same trait instead of a live
//! cluster.

pub mod error;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{
    Binding as K8sBinding, Node as K8sNode, ObjectReference, Pod as K8sPod,
};
use kube::api::{Api, ListParams, PostParams};
use kube::core::ObjectMeta;

pub use error::OrchestratorError;

use crate::domain::{node_from_k8s, pod_from_k8s, Node, Pod};

/// Seam between the scheduling loop and the cluster orchestrator.
#[async_trait]
pub trait OrchestratorClient: Send + Sync {
    /// All nodes currently known to the orchestrator.
    async fn list_nodes(&self) -> Result<Vec<Node>, OrchestratorError>;

    /// Pods claimed by `scheduler_name` and matching `component_label` that
    /// have no target node assigned yet.
    async fn list_pending_pods(
        &self,
        scheduler_name: &str,
        component_label: &str,
    ) -> Result<Vec<Pod>, OrchestratorError>;

    /// Attempt to commit `pod`'s placement onto `node`.
    async fn bind(&self, pod: &Pod, node: &str) -> Result<(), OrchestratorError>;
}

/// A node is a scheduling candidate iff it reports `Ready=True` and carries
/// no `NoSchedule`/`NoExecute` taint (§4.1). This filtering is the loop's
/// responsibility, not the client's, so it is exposed as a free function the
/// loop and policies can both exercise directly in tests.
pub fn candidate_nodes(nodes: &[Node]) -> Vec<&Node> {
    nodes.iter().filter(|n| n.ready && n.is_untainted()).collect()
}

/// [`OrchestratorClient`] backed by the cluster's native API via `kube`.
pub struct KubeOrchestratorClient {
    client: kube::Client,
}

impl KubeOrchestratorClient {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn nodes_api(&self) -> Api<K8sNode> {
        Api::all(self.client.clone())
    }

    fn pods_api(&self, namespace: &str) -> Api<K8sPod> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn all_pods_api(&self) -> Api<K8sPod> {
        Api::all(self.client.clone())
    }
}

fn to_orchestrator_error(err: kube::Error) -> OrchestratorError {
    match err {
        kube::Error::Api(resp) => OrchestratorError::from_status(resp.code, resp.message),
        other => OrchestratorError::Transient(other.to_string()),
    }
}

#[async_trait]
impl OrchestratorClient for KubeOrchestratorClient {
    async fn list_nodes(&self) -> Result<Vec<Node>, OrchestratorError> {
        let list = self
            .nodes_api()
            .list(&ListParams::default())
            .await
            .map_err(to_orchestrator_error)?;
        Ok(list.items.iter().filter_map(node_from_k8s).collect())
    }

    async fn list_pending_pods(
        &self,
        scheduler_name: &str,
        component_label: &str,
    ) -> Result<Vec<Pod>, OrchestratorError> {
        let lp = ListParams::default().labels(component_label);
        let list = self
            .all_pods_api()
            .list(&lp)
            .await
            .map_err(to_orchestrator_error)?;
        Ok(list
            .items
            .iter()
            .filter_map(pod_from_k8s)
            .filter(|p| p.is_pending_for(scheduler_name))
            .collect())
    }

    async fn bind(&self, pod: &Pod, node: &str) -> Result<(), OrchestratorError> {
        let binding = K8sBinding {
            metadata: ObjectMeta {
                name: Some(pod.name.clone()),
                namespace: Some(pod.namespace.clone()),
                ..Default::default()
            },
            target: ObjectReference {
                kind: Some("Node".to_string()),
                api_version: Some("v1".to_string()),
                name: Some(node.to_string()),
                ..Default::default()
            },
        };

        let data = serde_json::to_vec(&binding)
            .map_err(|e| OrchestratorError::Transient(e.to_string()))?;

        self.pods_api(&pod.namespace)
            .create_subresource::<K8sBinding>("binding", &pod.name, &PostParams::default(), data)
            .await
            .map(|_| ())
            .map_err(to_orchestrator_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Taint, TaintEffect};

    fn node(name: &str, ready: bool, taints: Vec<Taint>) -> Node {
        Node {
            name: name.to_string(),
            ready,
            taints,
            allocatable_millicpu: 4000,
        }
    }

    #[test]
    fn candidate_nodes_excludes_not_ready() {
        let nodes = vec![node("n1", false, vec![])];
        assert!(candidate_nodes(&nodes).is_empty());
    }

    #[test]
    fn candidate_nodes_excludes_no_schedule_tainted() {
        let nodes = vec![node(
            "n1",
            true,
            vec![Taint {
                key: "x".into(),
                effect: TaintEffect::NoSchedule,
            }],
        )];
        assert!(candidate_nodes(&nodes).is_empty());
    }

    #[test]
    fn candidate_nodes_includes_ready_untainted() {
        let nodes = vec![node("n1", true, vec![]), node("n2", true, vec![])];
        let candidates = candidate_nodes(&nodes);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn candidate_nodes_preserves_input_order() {
        let nodes = vec![node("c", true, vec![]), node("a", true, vec![]), node("b", true, vec![])];
        let candidates = candidate_nodes(&nodes);
        let names: Vec<&str> = candidates.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
