//! Sandbox infrastructure errors
//!
//! These describe faults in the validation machinery itself. A rejected
//! candidate is never an error here; rejections are verdicts.

use thiserror::Error;

/// Faults in the validation infrastructure
#[derive(Debug, Error)]
pub enum SandboxError {
    /// The language grammar could not be loaded into the parser
    #[error("grammar unavailable: {0}")]
    Grammar(String),

    /// The execution workspace could not be prepared
    #[error("workspace setup failed: {0}")]
    Workspace(std::io::Error),

    /// The interpreter subprocess could not be spawned or awaited
    #[error("subprocess failure: {0}")]
    Subprocess(std::io::Error),

    /// The execution slot pool was shut down while a validation was pending
    #[error("execution slot pool closed")]
    PoolClosed,
}
