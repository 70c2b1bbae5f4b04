//! Workflow configuration

use std::collections::BTreeSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunable knobs for one workflow instance.
///
/// Every field has a sane default; builders adjust individual knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Attempt budget, including the first generation
    pub max_attempts: u32,
    /// Deadline for the index lookup
    pub retrieval_timeout: Duration,
    /// Passages requested from the index
    pub top_k: usize,
    /// Deadline for one model call
    pub generation_timeout: Duration,
    /// Deadline for one isolated execution
    pub execution_timeout: Duration,
    /// Address-space ceiling for the interpreter, in bytes
    pub execution_memory_limit: u64,
    /// Captured bytes retained per output stream
    pub max_output_bytes: usize,
    /// Module roots a candidate may import
    pub dependency_allow_list: BTreeSet<String>,
    /// Concurrent isolated executions across the workflow
    pub max_sandbox_slots: usize,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retrieval_timeout: Duration::from_secs(5),
            top_k: 4,
            generation_timeout: Duration::from_secs(60),
            execution_timeout: Duration::from_secs(30),
            execution_memory_limit: 256 * 1024 * 1024,
            max_output_bytes: 10_000,
            dependency_allow_list: crucible_sandbox::default_allow_list(),
            max_sandbox_slots: 4,
        }
    }
}

impl WorkflowConfig {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the attempt budget. Clamped to at least one attempt.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    #[must_use]
    pub fn with_retrieval_timeout(mut self, timeout: Duration) -> Self {
        self.retrieval_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.execution_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_execution_memory_limit(mut self, limit: u64) -> Self {
        self.execution_memory_limit = limit;
        self
    }

    /// Extend the import allow-list with additional module roots.
    #[must_use]
    pub fn with_allowed_modules<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependency_allow_list
            .extend(modules.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_max_sandbox_slots(mut self, slots: usize) -> Self {
        self.max_sandbox_slots = slots.max(1);
        self
    }
}
