/*
SPDX-License-Identifier: MIT
*/

//! Adaptive policy selector: a meta-policy over the five placement policies,
//! switching on cluster-mean CPU under a cooldown.
//!
//! Grounded on the teacher's `NodeConfigManager` pattern of a small owned
//! struct mutated only by its single caller (`scheduler/mod.rs`'s
//! `GlobalScheduler`) — here `AdaptiveSelector` is likewise mutated only by
//! the scheduling loop, with no internal locking required.

use std::time::{Duration, Instant};

use tracing::info;

use crate::policy::PolicyTag;

/// One completed policy switch, for the decision log's statistics report
/// (§4.4, §5).
#[derive(Debug, Clone)]
pub struct SwitchEvent {
    pub from: PolicyTag,
    pub to: PolicyTag,
    pub cluster_cpu_percent: f64,
}

/// Threshold-cascade boundaries and cooldown, mirroring the `CPU_LOW_THRESHOLD`
/// / `CPU_HIGH_THRESHOLD` / `STRATEGY_COOLDOWN` configuration (§6).
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveConfig {
    pub lo: f64,
    pub hi: f64,
    pub cooldown: Duration,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            lo: 40.0,
            hi: 80.0,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Maps cluster-mean CPU to the policy the cascade names for that band.
///
/// The component design's threshold formula (§4.4) is taken as authoritative
/// over the illustrative worked trajectory in the testable-properties
/// section: the two disagree on which policy occupies the middle band, and
/// the formula is the one place the spec states the rule structurally rather
/// than by example. See `DESIGN.md` for the recorded resolution.
fn policy_for_cluster_cpu(cpu: f64, config: &AdaptiveConfig) -> PolicyTag {
    if cpu > config.hi {
        PolicyTag::Bandit
    } else if cpu > config.lo {
        PolicyTag::LeastCpu
    } else {
        PolicyTag::FirstAvailable
    }
}

/// Either the adaptive cascade above, or a single policy pinned for the
/// process lifetime (`FIXED_STRATEGY`, §6).
pub enum SelectorMode {
    Adaptive(AdaptiveConfig),
    Fixed(PolicyTag),
}

pub struct AdaptiveSelector {
    mode: SelectorMode,
    active: PolicyTag,
    last_switch: Instant,
    /// `false` until the first [`evaluate`](Self::evaluate) call in adaptive
    /// mode. That first call adopts whatever the cascade maps the observed
    /// CPU to unconditionally — there is no prior policy to debounce
    /// against, so it is not a cooldown-gated "switch" and is not appended
    /// to the switch log.
    initialized: bool,
    switch_log: Vec<SwitchEvent>,
}

impl AdaptiveSelector {
    pub fn new(mode: SelectorMode, now: Instant) -> Self {
        let active = match &mode {
            // Placeholder until the first `evaluate` call settles it;
            // irrelevant in fixed mode, where `active` never changes.
            SelectorMode::Adaptive(_) => PolicyTag::FirstAvailable,
            SelectorMode::Fixed(tag) => *tag,
        };
        Self {
            mode,
            active,
            last_switch: now,
            initialized: false,
            switch_log: Vec::new(),
        }
    }

    pub fn active_policy(&self) -> PolicyTag {
        self.active
    }

    pub fn switch_log(&self) -> &[SwitchEvent] {
        &self.switch_log
    }

    /// Evaluate the cascade once per loop iteration (§4.4 step 1-3). A
    /// no-op in fixed-policy mode.
    pub fn evaluate(&mut self, cluster_cpu_percent: f64, now: Instant) {
        let config = match &self.mode {
            SelectorMode::Fixed(_) => return,
            SelectorMode::Adaptive(config) => *config,
        };

        if !self.initialized {
            self.active = policy_for_cluster_cpu(cluster_cpu_percent, &config);
            self.last_switch = now;
            self.initialized = true;
            return;
        }

        if now.duration_since(self.last_switch) < config.cooldown {
            return;
        }

        let mapped = policy_for_cluster_cpu(cluster_cpu_percent, &config);
        if mapped != self.active {
            info!(
                from = %self.active,
                to = %mapped,
                cluster_cpu_percent,
                "[STRATEGY SWITCH]"
            );
            self.switch_log.push(SwitchEvent {
                from: self.active,
                to: mapped,
                cluster_cpu_percent,
            });
            self.active = mapped;
            self.last_switch = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_mode_never_switches() {
        let now = Instant::now();
        let mut selector = AdaptiveSelector::new(SelectorMode::Fixed(PolicyTag::Bandit), now);
        selector.evaluate(95.0, now + Duration::from_secs(60));
        assert_eq!(selector.active_policy(), PolicyTag::Bandit);
        assert!(selector.switch_log().is_empty());
    }

    #[test]
    fn cooldown_blocks_switch_within_window() {
        let now = Instant::now();
        let config = AdaptiveConfig::default();
        let mut selector = AdaptiveSelector::new(SelectorMode::Adaptive(config), now);

        // First evaluation unconditionally adopts the mapped policy and is
        // not itself a logged switch.
        selector.evaluate(25.0, now);
        assert_eq!(selector.active_policy(), PolicyTag::FirstAvailable);
        assert!(selector.switch_log().is_empty());

        // A second reading inside the cooldown window must not move the
        // active policy, however different the observed CPU.
        selector.evaluate(95.0, now + Duration::from_secs(5));
        assert_eq!(selector.active_policy(), PolicyTag::FirstAvailable);
        assert!(selector.switch_log().is_empty());
    }

    #[test]
    fn scenario_switch_at_boundary_trajectory() {
        // §8 scenario 2, corrected for the §4.4-authoritative cascade (see
        // DESIGN.md): 25 -> first-available, 45 -> least-cpu, 75 -> least-cpu
        // (unchanged), 85 -> bandit, samples 31s apart with a 30s cooldown.
        let config = AdaptiveConfig::default();
        let t0 = Instant::now();
        let mut selector = AdaptiveSelector::new(SelectorMode::Adaptive(config), t0);

        selector.evaluate(25.0, t0);
        assert_eq!(selector.active_policy(), PolicyTag::FirstAvailable);

        selector.evaluate(45.0, t0 + Duration::from_secs(31));
        assert_eq!(selector.active_policy(), PolicyTag::LeastCpu);

        selector.evaluate(75.0, t0 + Duration::from_secs(62));
        assert_eq!(selector.active_policy(), PolicyTag::LeastCpu);

        selector.evaluate(85.0, t0 + Duration::from_secs(93));
        assert_eq!(selector.active_policy(), PolicyTag::Bandit);

        assert_eq!(selector.switch_log().len(), 2);
    }

    #[test]
    fn rapid_readings_only_switch_at_the_cooldown_boundary() {
        let config = AdaptiveConfig {
            lo: 40.0,
            hi: 80.0,
            cooldown: Duration::from_secs(30),
        };
        let t0 = Instant::now();
        let mut selector = AdaptiveSelector::new(SelectorMode::Adaptive(config), t0);
        selector.evaluate(10.0, t0); // init, no log entry
        assert_eq!(selector.active_policy(), PolicyTag::FirstAvailable);

        // Readings alternate low/high every second; the cascade should only
        // register a switch once 30s have actually elapsed, at offset 30
        // (where the alternating pattern lands on a high reading).
        for offset in 1..=40u64 {
            let cpu = if offset % 2 == 0 { 90.0 } else { 10.0 };
            selector.evaluate(cpu, t0 + Duration::from_secs(offset));
        }

        let log = selector.switch_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].from, PolicyTag::FirstAvailable);
        assert_eq!(log[0].to, PolicyTag::Bandit);
        assert_eq!(selector.active_policy(), PolicyTag::Bandit);
    }
}
