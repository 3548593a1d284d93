/*
SPDX-License-Identifier: MIT
*/

//! CLI/environment configuration.
//!
//! The teacher loads configuration from a YAML file via `NodeConfigManager`
//! (see `config/mod.rs` in the original tree); this system's external
//! configuration surface is the flat environment-variable table in §6
//! EXTERNAL INTERFACES, so `clap`'s derive API with the `env` feature is
//! the better fit — each field's `env(...)` attribute doubles as
//! self-documentation of the variable it reads, with CLI flags available
//! for local runs and tests. Kept as a single flat struct rather than the
//! teacher's nested-and-defaulted YAML shape because there's no nested
//! structure here to mirror.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

use crate::adaptive::AdaptiveConfig;
use crate::policy::{PolicyTag, UnknownPolicyTag};

#[derive(Debug, Parser, Clone)]
#[command(
    name = "adaptive-scheduler",
    about = "Adaptive workload scheduler for a container-orchestrated cluster"
)]
pub struct Cli {
    /// Lower boundary of the CPU policy cascade, percent.
    #[arg(long, env = "CPU_LOW_THRESHOLD", default_value_t = 40.0)]
    pub cpu_low_threshold: f64,

    /// Upper boundary of the CPU policy cascade, percent.
    #[arg(long, env = "CPU_HIGH_THRESHOLD", default_value_t = 80.0)]
    pub cpu_high_threshold: f64,

    /// Minimum seconds between two policy switches.
    #[arg(long, env = "STRATEGY_COOLDOWN", default_value_t = 30)]
    pub strategy_cooldown_secs: u64,

    /// Pin one policy for the process lifetime; one of FCFS, BALANCED,
    /// LEAST_LOADED, PRIORITY, BANDIT. Unset means adaptive mode.
    #[arg(long, env = "FIXED_STRATEGY")]
    pub fixed_strategy: Option<String>,

    /// The `scheduler-name` claim this process schedules for (§6).
    #[arg(long, env = "SCHEDULER_NAME", default_value = "adaptive-scheduler")]
    pub scheduler_name: String,

    /// The label selector identifying schedulable workload pods (§6).
    #[arg(long, env = "COMPONENT_LABEL", default_value = "component=taskmanager")]
    pub component_label: String,

    /// Seconds between loop iterations on a clean pass.
    #[arg(long, env = "POLL_INTERVAL_SECS", default_value_t = 2)]
    pub poll_interval_secs: u64,

    /// Seconds to wait before retrying after an iteration raised an error.
    #[arg(long, env = "ERROR_BACKOFF_SECS", default_value_t = 5)]
    pub error_backoff_secs: u64,

    /// TTL of the per-node CPU metrics cache, seconds.
    #[arg(long, env = "METRICS_CACHE_TTL_SECS", default_value_t = 5)]
    pub metrics_cache_ttl_secs: u64,

    /// Bounded timeout applied to every orchestrator/metrics network call,
    /// seconds (§5 Concurrency & Resource Model).
    #[arg(long, env = "CLUSTER_CALL_TIMEOUT_SECS", default_value_t = 5)]
    pub cluster_call_timeout_secs: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid FIXED_STRATEGY: {0}")]
    InvalidFixedStrategy(#[from] UnknownPolicyTag),
}

/// Configuration with environment strings already parsed into typed values,
/// ready to build the loop's components.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub adaptive: AdaptiveConfig,
    pub fixed_strategy: Option<PolicyTag>,
    pub scheduler_name: String,
    pub component_label: String,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub metrics_cache_ttl: Duration,
    pub cluster_call_timeout: Duration,
}

impl TryFrom<Cli> for ResolvedConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let fixed_strategy = cli
            .fixed_strategy
            .as_deref()
            .map(str::parse::<PolicyTag>)
            .transpose()?;

        Ok(ResolvedConfig {
            adaptive: AdaptiveConfig {
                lo: cli.cpu_low_threshold,
                hi: cli.cpu_high_threshold,
                cooldown: Duration::from_secs(cli.strategy_cooldown_secs),
            },
            fixed_strategy,
            scheduler_name: cli.scheduler_name,
            component_label: cli.component_label,
            poll_interval: Duration::from_secs(cli.poll_interval_secs),
            error_backoff: Duration::from_secs(cli.error_backoff_secs),
            metrics_cache_ttl: Duration::from_secs(cli.metrics_cache_ttl_secs),
            cluster_call_timeout: Duration::from_secs(cli.cluster_call_timeout_secs),
        })
    }
}
