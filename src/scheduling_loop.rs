/*
SPDX-License-Identifier: MIT
*/

//! The outer scheduling control loop (§4.5).
//!
//! A single control task: discover pending pods, filter candidate nodes,
//! invoke the active placement policy, attempt binding, record the
//! decision, evaluate the adaptive selector, sleep. Mirrors the shape of
//! the teacher's `GlobalScheduler::schedule` as a single entry point that
//! owns all mutable state for one pass, but wrapped in an outer `loop` with
//! its own sleep/backoff/cancellation handling, since the teacher's
//! scheduler is invoked once per gRPC call rather than polling forever.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::adaptive::AdaptiveSelector;
use crate::decisions::{DecisionLog, PlacementDecision, ShutdownReport};
use crate::domain::Pod;
use crate::metrics::MetricsSource;
use crate::orchestrator::{candidate_nodes, OrchestratorClient, OrchestratorError};
use crate::policy::PolicySet;

#[derive(Debug, Error)]
pub enum SchedulerLoopError {
    #[error("orchestrator error: {0}")]
    Orchestrator(#[from] OrchestratorError),
}

/// Tunables that are constants in the source but configuration here (§9
/// design notes, item 2).
#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub scheduler_name: String,
    pub component_label: String,
    pub poll_interval: std::time::Duration,
    pub error_backoff: std::time::Duration,
}

pub struct SchedulingLoop {
    orchestrator: Arc<dyn OrchestratorClient>,
    metrics: Arc<dyn MetricsSource>,
    policies: PolicySet,
    selector: AdaptiveSelector,
    log: DecisionLog,
    config: LoopConfig,
}

impl SchedulingLoop {
    pub fn new(
        orchestrator: Arc<dyn OrchestratorClient>,
        metrics: Arc<dyn MetricsSource>,
        policies: PolicySet,
        selector: AdaptiveSelector,
        config: LoopConfig,
    ) -> Self {
        Self {
            orchestrator,
            metrics,
            policies,
            selector,
            log: DecisionLog::new(),
            config,
        }
    }

    /// Runs until `shutdown` reports `true`. Cancellation is graceful: the
    /// check happens only at the top of an iteration, never mid-bind (§5
    /// Concurrency & Resource Model).
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> ShutdownReport {
        loop {
            if *shutdown.borrow() {
                break;
            }

            let sleep_for = match self.run_iteration().await {
                Ok(()) => self.config.poll_interval,
                Err(err) => {
                    warn!(error = %err, "[ERROR]");
                    self.config.error_backoff
                }
            };

            tokio::select! {
                _ = sleep(sleep_for) => {}
                _ = shutdown.changed() => {}
            }
        }

        let bandit_arms = self.policies.bandit().snapshot();
        ShutdownReport::build(&self.log, bandit_arms)
    }

    async fn run_iteration(&mut self) -> Result<(), SchedulerLoopError> {
        let pending = self
            .orchestrator
            .list_pending_pods(&self.config.scheduler_name, &self.config.component_label)
            .await?;

        let nodes = self.orchestrator.list_nodes().await?;
        let candidates = candidate_nodes(&nodes);
        let metrics = self.metrics.snapshot(&nodes).await;

        if !pending.is_empty() {
            if candidates.is_empty() {
                warn!(pending = pending.len(), "no nodes");
            } else {
                for pod in pending {
                    self.place_one(&pod, &candidates, &metrics).await;
                }
            }
        }

        self.selector.evaluate(metrics.cluster_cpu_percent(), Instant::now());
        Ok(())
    }

    async fn place_one(
        &mut self,
        pod: &Pod,
        candidates: &[&crate::domain::Node],
        metrics: &crate::metrics::MetricsSnapshot,
    ) {
        let active = self.selector.active_policy();
        let Some(node) = self.policies.get(active).select(candidates, pod, metrics) else {
            // Only possible if `candidates` were empty, already handled by
            // the caller; defensive rather than reachable.
            return;
        };

        match self.orchestrator.bind(pod, &node).await {
            Ok(()) => {
                let observed_cpu_percent = metrics.node_cpu_percent(&node);
                info!(
                    pod = %pod.name,
                    policy = %active,
                    node = %node,
                    observed_cpu_percent,
                    "[SCHEDULING]"
                );
                self.log.record(PlacementDecision {
                    pod_name: pod.name.clone(),
                    node,
                    policy: active,
                    observed_cpu_percent,
                });
            }
            Err(OrchestratorError::Conflict) => {
                debug!(pod = %pod.name, "bind conflict, pod already claimed — dropping silently");
            }
            Err(err) => {
                warn!(pod = %pod.name, node = %node, error = %err, "[ERROR]");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::{AdaptiveConfig, SelectorMode};
    use crate::domain::Node;
    use crate::metrics::MetricsSnapshot;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeOrchestrator {
        nodes: Vec<Node>,
        pending: Mutex<Vec<Pod>>,
        binds: Mutex<Vec<(String, String)>>,
        bind_result: fn(&str) -> Result<(), OrchestratorError>,
    }

    #[async_trait]
    impl OrchestratorClient for FakeOrchestrator {
        async fn list_nodes(&self) -> Result<Vec<Node>, OrchestratorError> {
            Ok(self.nodes.clone())
        }

        async fn list_pending_pods(
            &self,
            _scheduler_name: &str,
            _component_label: &str,
        ) -> Result<Vec<Pod>, OrchestratorError> {
            Ok(std::mem::take(&mut *self.pending.lock().unwrap()))
        }

        async fn bind(&self, pod: &Pod, node: &str) -> Result<(), OrchestratorError> {
            self.binds.lock().unwrap().push((pod.name.clone(), node.to_string()));
            (self.bind_result)(node)
        }
    }

    struct FakeMetrics {
        cluster_cpu: f64,
    }

    #[async_trait]
    impl MetricsSource for FakeMetrics {
        async fn snapshot(&self, nodes: &[Node]) -> MetricsSnapshot {
            let per_node = nodes
                .iter()
                .map(|n| (n.name.clone(), self.cluster_cpu))
                .collect();
            MetricsSnapshot::new(per_node, true)
        }

        fn metrics_available(&self) -> bool {
            true
        }
    }

    fn node(name: &str) -> Node {
        Node {
            name: name.to_string(),
            ready: true,
            taints: vec![],
            allocatable_millicpu: 1000,
        }
    }

    fn pod(name: &str) -> Pod {
        Pod {
            name: name.to_string(),
            namespace: "default".to_string(),
            scheduler_name: Some("adaptive-scheduler".to_string()),
            target_node: None,
            labels: Default::default(),
        }
    }

    #[tokio::test]
    async fn scenario_first_available_under_low_load_binds_all_to_first_node() {
        let orchestrator = Arc::new(FakeOrchestrator {
            nodes: vec![node("n1"), node("n2"), node("n3")],
            pending: Mutex::new(vec![pod("p1"), pod("p2"), pod("p3")]),
            binds: Mutex::new(Vec::new()),
            bind_result: |_| Ok(()),
        });
        let metrics = Arc::new(FakeMetrics { cluster_cpu: 10.0 });
        let selector = AdaptiveSelector::new(
            SelectorMode::Adaptive(AdaptiveConfig::default()),
            Instant::now(),
        );
        let config = LoopConfig {
            scheduler_name: "adaptive-scheduler".to_string(),
            component_label: "component=taskmanager".to_string(),
            poll_interval: std::time::Duration::from_millis(1),
            error_backoff: std::time::Duration::from_millis(1),
        };
        let mut sched = SchedulingLoop::new(
            orchestrator.clone(),
            metrics,
            PolicySet::new(),
            selector,
            config,
        );

        sched.run_iteration().await.unwrap();

        let binds = orchestrator.binds.lock().unwrap();
        assert_eq!(binds.len(), 3);
        assert!(binds.iter().all(|(_, node)| node == "n1"));
        assert_eq!(sched.selector.active_policy().to_string(), "first-available");
    }

    #[tokio::test]
    async fn binding_conflict_is_not_recorded_and_loop_continues() {
        let orchestrator = Arc::new(FakeOrchestrator {
            nodes: vec![node("n1")],
            pending: Mutex::new(vec![pod("p1"), pod("p2")]),
            binds: Mutex::new(Vec::new()),
            bind_result: |_| Err(OrchestratorError::Conflict),
        });
        let metrics = Arc::new(FakeMetrics { cluster_cpu: 10.0 });
        let selector = AdaptiveSelector::new(
            SelectorMode::Adaptive(AdaptiveConfig::default()),
            Instant::now(),
        );
        let config = LoopConfig {
            scheduler_name: "adaptive-scheduler".to_string(),
            component_label: "component=taskmanager".to_string(),
            poll_interval: std::time::Duration::from_millis(1),
            error_backoff: std::time::Duration::from_millis(1),
        };
        let mut sched = SchedulingLoop::new(orchestrator, metrics, PolicySet::new(), selector, config);

        sched.run_iteration().await.unwrap();
        assert_eq!(sched.log.len(), 0);
    }

    #[tokio::test]
    async fn no_candidate_nodes_skips_placement_without_error() {
        let orchestrator = Arc::new(FakeOrchestrator {
            nodes: vec![],
            pending: Mutex::new(vec![pod("p1")]),
            binds: Mutex::new(Vec::new()),
            bind_result: |_| Ok(()),
        });
        let metrics = Arc::new(FakeMetrics { cluster_cpu: 10.0 });
        let selector = AdaptiveSelector::new(
            SelectorMode::Adaptive(AdaptiveConfig::default()),
            Instant::now(),
        );
        let config = LoopConfig {
            scheduler_name: "adaptive-scheduler".to_string(),
            component_label: "component=taskmanager".to_string(),
            poll_interval: std::time::Duration::from_millis(1),
            error_backoff: std::time::Duration::from_millis(1),
        };
        let mut sched = SchedulingLoop::new(
            orchestrator.clone(),
            metrics,
            PolicySet::new(),
            selector,
            config,
        );

        sched.run_iteration().await.unwrap();
        assert_eq!(orchestrator.binds.lock().unwrap().len(), 0);
        assert_eq!(sched.log.len(), 0);
    }
}
