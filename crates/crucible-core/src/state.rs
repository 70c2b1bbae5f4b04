//! Workflow phases and run records

use std::time::Duration;

use crucible_retrieval::ContextOrigin;
use crucible_solution::{CandidateSolution, ValidationVerdict};
use serde::{Deserialize, Serialize};

use crate::error::WorkflowError;

/// Phase of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowPhase {
    /// Looking up context in the index
    Retrieving,
    /// Waiting on the model for a candidate
    Generating,
    /// Running the candidate through the validation chain
    Validating,
    /// Folding the last failure into the next prompt
    Correcting,
    /// A candidate passed every stage
    Succeeded,
    /// The attempt budget ran out without a passing candidate
    Exhausted,
}

impl WorkflowPhase {
    /// True for phases the run never leaves.
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted)
    }
}

/// Phases reachable from `from` in one step.
#[must_use]
pub fn allowed_transitions(from: WorkflowPhase) -> Vec<WorkflowPhase> {
    use WorkflowPhase::{
        Correcting, Exhausted, Generating, Retrieving, Succeeded, Validating,
    };
    match from {
        Retrieving => vec![Generating],
        // A malformed response skips validation and consumes the attempt.
        Generating => vec![Validating, Correcting, Exhausted],
        Validating => vec![Succeeded, Correcting, Exhausted],
        Correcting => vec![Generating],
        Succeeded | Exhausted => vec![],
    }
}

/// Reject transitions outside the workflow graph.
pub fn validate_transition(
    from: WorkflowPhase,
    to: WorkflowPhase,
) -> Result<(), WorkflowError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(WorkflowError::IllegalTransition { from, to })
    }
}

/// Mutable record of one in-flight run
///
/// Owns the current phase and the attempt history. Discarded once the
/// run's result has been assembled; it reaches a terminal phase exactly
/// once and never leaves it.
#[derive(Debug)]
pub struct WorkflowState {
    phase: WorkflowPhase,
    history: Vec<AttemptRecord>,
}

impl Default for WorkflowState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowState {
    /// Fresh run record, starting in retrieval.
    #[must_use]
    pub fn new() -> Self {
        Self {
            phase: WorkflowPhase::Retrieving,
            history: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    /// Move to the next phase, rejecting moves outside the graph.
    pub fn advance(&mut self, to: WorkflowPhase) -> Result<(), WorkflowError> {
        validate_transition(self.phase, to)?;
        self.phase = to;
        Ok(())
    }

    /// Append one attempt to the history.
    pub fn record(&mut self, record: AttemptRecord) {
        self.history.push(record);
    }

    #[inline]
    #[must_use]
    pub fn history(&self) -> &[AttemptRecord] {
        &self.history
    }

    /// Attempts consumed so far.
    #[inline]
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.history.len() as u32
    }

    /// Consume the record, yielding the full history.
    #[must_use]
    pub fn into_history(self) -> Vec<AttemptRecord> {
        self.history
    }
}

/// What one attempt produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptOutcome {
    /// A candidate was parsed and judged
    Validated {
        solution: CandidateSolution,
        verdict: ValidationVerdict,
    },
    /// The model answered but no candidate could be parsed
    Malformed { detail: String },
}

/// One entry in the run history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    /// One-based attempt number
    pub attempt: u32,
    /// What the attempt produced
    pub outcome: AttemptOutcome,
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// A candidate passed every validation stage
    Succeeded,
    /// Every attempt in the budget was consumed without a pass
    Exhausted,
}

/// Complete account of one workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    /// How the run ended
    pub status: RunStatus,
    /// The passing candidate, or the last judged one on exhaustion
    pub final_solution: Option<CandidateSolution>,
    /// Verdict on `final_solution`, absent when the last attempt parsed nothing
    pub final_verdict: Option<ValidationVerdict>,
    /// Every attempt, in order
    pub history: Vec<AttemptRecord>,
    /// Where the prompt context came from
    pub context_origin: ContextOrigin,
    /// Wall-clock time for the whole run
    pub elapsed: Duration,
}

impl WorkflowResult {
    /// True when a candidate passed.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Attempts consumed by the run.
    #[inline]
    #[must_use]
    pub fn attempts_used(&self) -> u32 {
        self.history.len() as u32
    }
}
