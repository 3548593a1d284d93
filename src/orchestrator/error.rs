/*
SPDX-License-Identifier: MIT
*/

//! Structured error type for orchestrator calls.
//!
//! Mirrors the teacher's split between a low-level reason enum and a
//! `thiserror`-derived top-level type (see `scheduler/error.rs`): every
//! binding attempt resolves to exactly one of the three outcomes named in
//! §4.1, so the loop can match on it directly instead of inspecting a raw
//! HTTP status.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The pod was no longer pending by the time the bind was attempted —
    /// benign, per §7: another actor (or a prior iteration) already placed
    /// it.
    #[error("pod is no longer pending — bind conflict")]
    Conflict,

    /// The orchestrator rejected the call for lack of privilege.
    #[error("bind forbidden by the orchestrator (status {status})")]
    Forbidden { status: u16 },

    /// Any other failure: network error, timeout, 5xx, malformed response.
    #[error("transient orchestrator error: {0}")]
    Transient(String),
}

impl OrchestratorError {
    /// Classify a raw HTTP status code from a failed bind call into the
    /// taxonomy above.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            409 => OrchestratorError::Conflict,
            401 | 403 => OrchestratorError::Forbidden { status },
            _ => OrchestratorError::Transient(body.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_409_is_conflict() {
        assert!(matches!(
            OrchestratorError::from_status(409, "conflict"),
            OrchestratorError::Conflict
        ));
    }

    #[test]
    fn status_403_is_forbidden() {
        assert!(matches!(
            OrchestratorError::from_status(403, "nope"),
            OrchestratorError::Forbidden { status: 403 }
        ));
    }

    #[test]
    fn other_status_is_transient() {
        assert!(matches!(
            OrchestratorError::from_status(503, "unavailable"),
            OrchestratorError::Transient(_)
        ));
    }
}
