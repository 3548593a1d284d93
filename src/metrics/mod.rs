/*
SPDX-License-Identifier: MIT
*/

//! Per-node CPU utilisation ingestion, TTL cache, and estimator fallback.
//!
//! Mirrors the teacher's approach to external state: a small trait as the
//! seam ([`MetricsSource`]) with one production implementation
//! ([`KubeMetricsSource`]) backed by the cluster's `metrics.k8s.io`
//! aggregated API, plus plain structs that unit tests can construct directly
//! without a live cluster.

pub mod quantity;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod as K8sPod;
use kube::api::{Api, DynamicObject, ListParams};
use kube::discovery::ApiResource;
use tracing::{debug, warn};

use crate::domain::Node;
use quantity::{parse_cpu_millicores, QuantityError};

/// Default cache TTL (§4.2 METRICS SOURCE): 5 seconds.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// A read-only view over the currently cached per-node CPU percentages,
/// handed to placement policies for one pending-pod pass.
///
/// Building this once per iteration (rather than letting every policy call
/// back into the live, TTL-gated cache) keeps [`crate::policy::Policy::select`]
/// a pure, synchronous function, matching §4.3's "pure functions from
/// (candidates, pod, metrics snapshot) → chosen node" contract.
#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    per_node_cpu_percent: HashMap<String, f64>,
    available: bool,
}

impl MetricsSnapshot {
    pub fn new(per_node_cpu_percent: HashMap<String, f64>, available: bool) -> Self {
        Self {
            per_node_cpu_percent,
            available,
        }
    }

    /// CPU usage for `node`, as a percentage of its allocatable CPU, in
    /// `[0, 100]`. Nodes never observed are reported as `0.0` — they have not
    /// yet run anything.
    pub fn node_cpu_percent(&self, node: &str) -> f64 {
        self.per_node_cpu_percent.get(node).copied().unwrap_or(0.0)
    }

    /// Arithmetic mean of per-node percentages. Returns `50` (the spec's
    /// neutral default) when no nodes are known.
    pub fn cluster_cpu_percent(&self) -> f64 {
        if self.per_node_cpu_percent.is_empty() {
            return 50.0;
        }
        let sum: f64 = self.per_node_cpu_percent.values().sum();
        sum / self.per_node_cpu_percent.len() as f64
    }

    pub fn metrics_available(&self) -> bool {
        self.available
    }
}

/// Seam between the scheduling loop and whatever system supplies per-node CPU
/// utilisation. The production implementation talks to the cluster's
/// `metrics.k8s.io` API; tests supply a fixed or scripted fake.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Refresh the cache for `nodes`, respecting the TTL, and return a
    /// snapshot usable by this iteration's placement decisions.
    async fn snapshot(&self, nodes: &[Node]) -> MetricsSnapshot;

    /// `true` once the metrics endpoint has been confirmed reachable at least
    /// once; latched to `false` forever after the first complete endpoint
    /// failure (§4.2 estimator mode).
    fn metrics_available(&self) -> bool;
}

struct CacheEntry {
    cpu_percent: f64,
    fetched_at: Instant,
}

/// [`MetricsSource`] backed by the cluster's `metrics.k8s.io/v1beta1`
/// `NodeMetrics` resource.
pub struct KubeMetricsSource {
    client: kube::Client,
    ttl: Duration,
    cache: RwLock<HashMap<String, CacheEntry>>,
    /// Per-node pod counts, used only by the estimator once metrics are
    /// latched unavailable.
    pod_counts: RwLock<HashMap<String, u64>>,
    available: AtomicBool,
    /// Sticky once set to `false`: a single complete endpoint failure latches
    /// estimator mode for the remainder of the process (§4.2).
    probed: AtomicBool,
}

impl KubeMetricsSource {
    pub fn new(client: kube::Client, ttl: Duration) -> Self {
        Self {
            client,
            ttl,
            cache: RwLock::new(HashMap::new()),
            pod_counts: RwLock::new(HashMap::new()),
            available: AtomicBool::new(true),
            probed: AtomicBool::new(false),
        }
    }

    fn node_metrics_api(&self) -> Api<DynamicObject> {
        let resource = ApiResource {
            group: "metrics.k8s.io".to_string(),
            version: "v1beta1".to_string(),
            api_version: "metrics.k8s.io/v1beta1".to_string(),
            kind: "NodeMetrics".to_string(),
            plural: "nodes".to_string(),
        };
        Api::all_with(self.client.clone(), &resource)
    }

    /// Record how many pods each node currently carries, for the estimator.
    pub fn observe_pod_counts(&self, counts: HashMap<String, u64>) {
        *self.pod_counts.write().unwrap() = counts;
    }

    /// Best-effort refresh of per-node pod counts, used only to feed the
    /// estimator once live metrics are unreachable — a failure here just
    /// leaves the previous counts (or zero) in place rather than compounding
    /// the outage.
    async fn refresh_pod_counts(&self) {
        let api: Api<K8sPod> = Api::all(self.client.clone());
        match api.list(&ListParams::default()).await {
            Ok(list) => {
                let mut counts = HashMap::new();
                for pod in list.items {
                    if let Some(node) = pod.spec.as_ref().and_then(|s| s.node_name.clone()) {
                        *counts.entry(node).or_insert(0u64) += 1;
                    }
                }
                self.observe_pod_counts(counts);
            }
            Err(err) => {
                debug!(error = %err, "failed to refresh pod counts for estimator");
            }
        }
    }

    fn estimate(&self, node: &str) -> f64 {
        let count = self
            .pod_counts
            .read()
            .unwrap()
            .get(node)
            .copied()
            .unwrap_or(0) as f64;
        (15.0 + 8.0 * count).clamp(0.0, 90.0)
    }

    fn cache_is_fresh(&self, entry: &CacheEntry) -> bool {
        entry.fetched_at.elapsed() < self.ttl
    }

    /// Fetch live usage for every known node. On complete failure, latches
    /// estimator mode and returns `None`; on partial failure, nodes missing
    /// from the result fall back to the estimator individually (§4.2 failure
    /// semantics).
    async fn fetch_live(&self) -> Option<HashMap<String, f64>> {
        let api = self.node_metrics_api();
        match api.list(&ListParams::default()).await {
            Ok(list) => {
                let mut out = HashMap::new();
                for item in list.items {
                    let Some(name) = item.metadata.name.clone() else {
                        continue;
                    };
                    let Some(usage) = item.data.get("usage") else {
                        continue;
                    };
                    let Some(cpu_raw) = usage.get("cpu").and_then(|v| v.as_str()) else {
                        continue;
                    };
                    match parse_cpu_millicores(cpu_raw) {
                        Ok(millicores) => {
                            out.insert(name, millicores as f64);
                        }
                        Err(err) => {
                            warn!(node = %name, raw = cpu_raw, error = %err, "failed to parse node CPU quantity, defaulting to 0");
                        }
                    }
                }
                self.probed.store(true, Ordering::SeqCst);
                Some(out)
            }
            Err(err) => {
                self.probed.store(true, Ordering::SeqCst);
                // Latch on the first occurrence of a complete endpoint
                // failure, whenever it happens — not only if it is literally
                // the first call ever made. `swap` reports whether we were
                // previously available, so this logs and latches exactly
                // once regardless of how many successful calls preceded it.
                if self.available.swap(false, Ordering::SeqCst) {
                    warn!(error = %err, "metrics endpoint unavailable — entering estimator mode for the remainder of the process");
                } else {
                    debug!(error = %err, "transient metrics listing failure");
                }
                self.refresh_pod_counts().await;
                None
            }
        }
    }
}

#[async_trait]
impl MetricsSource for KubeMetricsSource {
    async fn snapshot(&self, nodes: &[Node]) -> MetricsSnapshot {
        // Cheap path: everything requested is already cached and fresh.
        {
            let cache = self.cache.read().unwrap();
            let all_fresh = nodes.iter().all(|n| {
                cache
                    .get(&n.name)
                    .map(|e| self.cache_is_fresh(e))
                    .unwrap_or(false)
            });
            if all_fresh && !nodes.is_empty() {
                let per_node = nodes
                    .iter()
                    .map(|n| (n.name.clone(), cache[&n.name].cpu_percent))
                    .collect();
                return MetricsSnapshot::new(per_node, self.metrics_available());
            }
        }

        let live = if self.metrics_available() || !self.probed.load(Ordering::SeqCst) {
            self.fetch_live().await
        } else {
            None
        };

        let mut cache = self.cache.write().unwrap();
        let now = Instant::now();
        let mut per_node = HashMap::with_capacity(nodes.len());

        for node in nodes {
            let usage_millicores = live.as_ref().and_then(|m| m.get(&node.name)).copied();

            let cpu_percent = match usage_millicores {
                Some(millicores) if node.allocatable_millicpu > 0 => {
                    (millicores / node.allocatable_millicpu as f64 * 100.0).clamp(0.0, 100.0)
                }
                Some(_) => 0.0,
                None => self.estimate(&node.name),
            };

            cache.insert(
                node.name.clone(),
                CacheEntry {
                    cpu_percent,
                    fetched_at: now,
                },
            );
            per_node.insert(node.name.clone(), cpu_percent);
        }

        MetricsSnapshot::new(per_node, self.metrics_available())
    }

    fn metrics_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_cluster_cpu_is_mean_of_nodes() {
        let mut m = HashMap::new();
        m.insert("n1".to_string(), 20.0);
        m.insert("n2".to_string(), 60.0);
        let snap = MetricsSnapshot::new(m, true);
        assert!((snap.cluster_cpu_percent() - 40.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_cluster_cpu_defaults_to_50_when_empty() {
        let snap = MetricsSnapshot::new(HashMap::new(), true);
        assert_eq!(snap.cluster_cpu_percent(), 50.0);
    }

    #[test]
    fn snapshot_unknown_node_reports_zero() {
        let snap = MetricsSnapshot::new(HashMap::new(), true);
        assert_eq!(snap.node_cpu_percent("ghost"), 0.0);
    }

    #[test]
    fn quantity_error_display_mentions_raw_string() {
        let err = QuantityError::UnknownSuffix("5Q".to_string());
        assert!(err.to_string().contains("5Q"));
    }
}
