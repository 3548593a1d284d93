/*
SPDX-License-Identifier: MIT
*/

//! Round-robin policy.
//!
//! The teacher's design notes call out replacing a C-style static mutable
//! counter with a value owned by the component that uses it; here that
//! component is this struct, held inside [`super::PolicySet`] for the
//! lifetime of the process rather than reset per invocation or per policy
//! switch.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::{Node, Pod};
use crate::metrics::MetricsSnapshot;

use super::{Policy, PolicyTag};

pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }
}

impl Policy for RoundRobin {
    fn tag(&self) -> PolicyTag {
        PolicyTag::RoundRobin
    }

    fn select(&self, candidates: &[&Node], _pod: &Pod, _metrics: &MetricsSnapshot) -> Option<String> {
        if candidates.is_empty() {
            return None;
        }
        let idx = self.counter.fetch_add(1, Ordering::SeqCst) % candidates.len();
        Some(candidates[idx].name.clone())
    }
}
