//! Workflow errors
//!
//! Only infrastructure faults surface here. Rejected candidates and an
//! exhausted budget are ordinary results, not errors.

use thiserror::Error;

use crate::state::WorkflowPhase;

/// Why a workflow run could not finish
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The model could not be reached; no attempt can proceed without it
    #[error("generation unavailable: {0}")]
    GenerationUnavailable(String),

    /// The validation infrastructure itself broke
    #[error("sandbox failure: {0}")]
    Sandbox(#[from] crucible_sandbox::SandboxError),

    /// A phase transition outside the workflow graph was attempted
    #[error("illegal phase transition: {from:?} -> {to:?}")]
    IllegalTransition {
        from: WorkflowPhase,
        to: WorkflowPhase,
    },
}
