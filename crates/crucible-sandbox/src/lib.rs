//! Validation pipeline for candidate solutions.
//!
//! A candidate passes through an ordered chain of stages: a static
//! syntax check, an import policy check, and finally execution in an
//! isolated subprocess. The chain short-circuits on the first failing
//! stage, so untrusted code is never executed unless it already parses
//! and touches only permitted modules.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod backend;
pub mod error;
pub mod policy;
pub mod pool;
pub mod stage;
pub mod static_check;
pub mod validator;

pub use backend::{ExecutionBackend, ExecutionOutput, ResourceLimits, SubprocessBackend};
pub use error::SandboxError;
pub use policy::{default_allow_list, DependencyCheck};
pub use pool::SlotPool;
pub use stage::{StageOutcome, ValidationStage};
pub use static_check::StaticCheck;
pub use validator::{IsolatedExecution, Validator};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
