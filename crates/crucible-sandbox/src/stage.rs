//! Stage contract for the validation chain

use async_trait::async_trait;
use crucible_solution::{CandidateSolution, ValidationVerdict};

use crate::error::SandboxError;

/// Outcome of a single stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome {
    /// The candidate cleared this stage
    Pass,
    /// The candidate was rejected with the given verdict
    Fail(ValidationVerdict),
}

impl StageOutcome {
    /// True if the stage passed
    #[inline]
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

/// One step in the validation chain.
///
/// Stages run in a fixed order and the chain stops at the first
/// `Fail`. Returning `Err` means the stage infrastructure itself broke,
/// not that the candidate was rejected.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ValidationStage: Send + Sync {
    /// Stable stage name for logs
    fn name(&self) -> &'static str;

    /// Evaluate the candidate
    async fn evaluate(&self, solution: &CandidateSolution) -> Result<StageOutcome, SandboxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pass_predicate() {
        assert!(StageOutcome::Pass.is_pass());
        assert!(!StageOutcome::Fail(ValidationVerdict::Timeout).is_pass());
    }
}
