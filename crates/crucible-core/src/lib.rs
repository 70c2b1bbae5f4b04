//! Workflow orchestration.
//!
//! Drives a request through retrieval, generation, validation and
//! correction until a candidate passes or the attempt budget runs out.
//! The loop is structurally bounded: each iteration consumes exactly
//! one attempt, whether the model produced a candidate or not.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod state;
pub mod telemetry;
pub mod workflow;

pub use config::WorkflowConfig;
pub use error::WorkflowError;
pub use state::{
    AttemptOutcome, AttemptRecord, RunStatus, WorkflowPhase, WorkflowResult, WorkflowState,
};
pub use workflow::Workflow;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
