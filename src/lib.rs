/*
SPDX-License-Identifier: MIT
*/

//! Adaptive workload scheduler — custom scheduler for a container-orchestrated
//! cluster's stream-processing workers.
//!
//! Module layout:
//!
//! ```text
//! lib.rs
//! ├── config/         – CLI + environment configuration
//! ├── orchestrator/    – cluster API client: list nodes/pods, bind
//! ├── metrics/         – per-node CPU ingestion, TTL cache, estimator fallback
//! ├── policy/          – placement policies (first-available .. bandit)
//! ├── adaptive/        – meta-policy that switches among placement policies
//! ├── decisions.rs      – append-only placement decision log + statistics
//! └── scheduling_loop.rs – the outer control loop
//! ```

pub mod adaptive;
pub mod config;
pub mod decisions;
pub mod domain;
pub mod metrics;
pub mod orchestrator;
pub mod policy;
pub mod scheduling_loop;
