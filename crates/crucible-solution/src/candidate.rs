//! Candidate solutions
//!
//! One generated attempt at satisfying a request, prior to validation.
//! Candidates are superseded by later attempts, never mutated.

use crate::verdict::ValidationVerdict;
use serde::{Deserialize, Serialize};

/// A generated code solution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSolution {
    /// Generation attempt number (1-based, strictly increasing per run)
    pub attempt: u32,
    /// The complete code body
    pub code: String,
    /// Declared import statements
    pub imports: Vec<String>,
    /// Natural-language explanation of the approach
    pub explanation: String,
    /// Assumptions made about unclear requirements
    pub assumptions: Option<String>,
}

impl CandidateSolution {
    /// Create new candidate
    #[inline]
    #[must_use]
    pub fn new(attempt: u32, code: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            attempt,
            code: code.into(),
            imports: Vec::new(),
            explanation: explanation.into(),
            assumptions: None,
        }
    }

    /// With declared imports
    #[inline]
    #[must_use]
    pub fn with_imports(mut self, imports: Vec<String>) -> Self {
        self.imports = imports;
        self
    }

    /// With assumptions
    #[inline]
    #[must_use]
    pub fn with_assumptions(mut self, assumptions: impl Into<String>) -> Self {
        self.assumptions = Some(assumptions.into());
        self
    }

    /// Whether the candidate has a non-empty code body
    #[inline]
    #[must_use]
    pub fn has_code(&self) -> bool {
        !self.code.trim().is_empty()
    }
}

/// The most recent failure, carried forward into the next generation call
///
/// Only the latest failure is fed back; the full history stays on the
/// workflow state for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriorFailure {
    /// A candidate was produced but failed validation
    Rejected {
        /// The failed candidate
        solution: CandidateSolution,
        /// Its verdict
        verdict: ValidationVerdict,
    },
    /// The model response could not be parsed into a candidate
    Unparseable {
        /// What was wrong with the response
        detail: String,
    },
}

impl PriorFailure {
    /// One-line summary of the failure
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Rejected { verdict, .. } => verdict.summary(),
            Self::Unparseable { detail } => format!("previous response was unparseable: {detail}"),
        }
    }
}
