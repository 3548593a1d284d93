/*
SPDX-License-Identifier: MIT
*/

//! First-available policy: the simplest possible placement rule.

use crate::domain::{Node, Pod};
use crate::metrics::MetricsSnapshot;

use super::{Policy, PolicyTag};

/// Chooses the first candidate in input order, ignoring load entirely.
pub struct FirstAvailable;

impl Policy for FirstAvailable {
    fn tag(&self) -> PolicyTag {
        PolicyTag::FirstAvailable
    }

    fn select(&self, candidates: &[&Node], _pod: &Pod, _metrics: &MetricsSnapshot) -> Option<String> {
        candidates.first().map(|n| n.name.clone())
    }
}
