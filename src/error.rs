//! Typed failures with meaning to callers.
//!
//! Orchestrator entry points return `anyhow::Result`; these types are
//! attached to the chain so callers can `downcast_ref` and distinguish a
//! missing stage from a refused transition without string matching.

use thiserror::Error;

/// Failures surfaced from orchestrator entry points.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A referenced stage id does not exist in the store.
    #[error("stage not found: {0}")]
    StageNotFound(String),

    /// A transition attempt that violates the state machine or the
    /// dependency rules. The reason is renderable to a user as-is.
    #[error("cannot transition stage '{stage_id}': {reason}")]
    PreconditionFailed { stage_id: String, reason: String },
}

/// A dependency cycle discovered during validation or ordering.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("circular dependency detected: {}", .path.join(" -> "))]
pub struct CycleError {
    /// The offending path; the first node is repeated at the end.
    pub path: Vec<String>,
}
