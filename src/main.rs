/*
SPDX-License-Identifier: MIT
*/

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use adaptive_scheduler::adaptive::{AdaptiveSelector, SelectorMode};
use adaptive_scheduler::config::{Cli, ResolvedConfig};
use adaptive_scheduler::metrics::{KubeMetricsSource, MetricsSource};
use adaptive_scheduler::orchestrator::{KubeOrchestratorClient, OrchestratorClient};
use adaptive_scheduler::policy::PolicySet;
use adaptive_scheduler::scheduling_loop::{LoopConfig, SchedulingLoop};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match ResolvedConfig::try_from(cli) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "[ERROR] invalid configuration at startup");
            return ExitCode::from(1);
        }
    };

    let kube_config = match build_kube_config(config.cluster_call_timeout).await {
        Ok(kube_config) => kube_config,
        Err(err) => {
            error!(error = %err, "[ERROR] unable to load cluster credentials");
            return ExitCode::from(1);
        }
    };

    let client = match kube::Client::try_from(kube_config) {
        Ok(client) => client,
        Err(err) => {
            error!(error = %err, "[ERROR] unable to construct cluster client");
            return ExitCode::from(1);
        }
    };

    let orchestrator: Arc<dyn OrchestratorClient> = Arc::new(KubeOrchestratorClient::new(client.clone()));
    let metrics: Arc<dyn MetricsSource> = Arc::new(KubeMetricsSource::new(client, config.metrics_cache_ttl));

    let selector_mode = match config.fixed_strategy {
        Some(tag) => SelectorMode::Fixed(tag),
        None => SelectorMode::Adaptive(config.adaptive),
    };
    let selector = AdaptiveSelector::new(selector_mode, std::time::Instant::now());

    let loop_config = LoopConfig {
        scheduler_name: config.scheduler_name.clone(),
        component_label: config.component_label.clone(),
        poll_interval: config.poll_interval,
        error_backoff: config.error_backoff,
    };

    let scheduling_loop = SchedulingLoop::new(orchestrator, metrics, PolicySet::new(), selector, loop_config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received, finishing the in-flight iteration");
            let _ = shutdown_tx.send(true);
        }
    });

    info!(
        scheduler_name = %config.scheduler_name,
        poll_interval_secs = config.poll_interval.as_secs(),
        "adaptive-scheduler starting"
    );

    let report = scheduling_loop.run(shutdown_rx).await;

    info!(total_decisions = report.total_decisions, "[SHUTDOWN]");
    for (policy, count, pct) in &report.per_policy {
        info!(policy = %policy, count, percent = pct, "[SHUTDOWN] per-policy");
    }
    for arm in &report.bandit_arms {
        info!(
            node = %arm.node,
            n = arm.n,
            cumulative_reward = arm.cumulative_reward,
            mean_reward = arm.mean_reward().unwrap_or(0.0),
            "[SHUTDOWN] bandit arm"
        );
    }

    ExitCode::from(0)
}

/// Loads cluster credentials the way `kube::Config::infer` does (in-cluster
/// service account, falling back to a local kubeconfig), with the
/// configured bounded timeout applied to every resulting HTTP call —
/// satisfying §5's "every orchestrator or metrics call has a bounded
/// timeout" without threading a timeout through each call site.
async fn build_kube_config(call_timeout: std::time::Duration) -> anyhow::Result<kube::Config> {
    let mut config = kube::Config::infer().await?;
    config.connect_timeout = Some(call_timeout);
    config.read_timeout = Some(call_timeout);
    Ok(config)
}
