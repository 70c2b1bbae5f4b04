//! Validation verdicts
//!
//! The classified outcome of validating one candidate solution. Every
//! candidate gets exactly one verdict; there is no silent pass.

use serde::{Deserialize, Serialize};

/// Classified outcome of validating a candidate solution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationVerdict {
    /// Candidate parsed, satisfied policy, and executed cleanly
    Passed,
    /// Candidate failed to parse
    SyntaxError {
        /// Parser diagnostic (line/column where available)
        detail: String,
    },
    /// Candidate raised a fault during isolated execution
    RuntimeError {
        /// Short fault description
        detail: String,
        /// Captured traceback
        traceback: String,
    },
    /// Candidate referenced a module or pattern outside policy
    PolicyViolation {
        /// The violated rule
        rule: String,
    },
    /// Candidate exceeded the execution timeout
    Timeout,
}

impl ValidationVerdict {
    /// Whether this verdict is a pass
    #[inline]
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Short stable name for the verdict kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::SyntaxError { .. } => "syntax_error",
            Self::RuntimeError { .. } => "runtime_error",
            Self::PolicyViolation { .. } => "policy_violation",
            Self::Timeout => "timeout",
        }
    }

    /// One-line summary suitable for feeding back into generation
    #[must_use]
    pub fn summary(&self) -> String {
        match self {
            Self::Passed => "passed".to_string(),
            Self::SyntaxError { detail } => format!("syntax error: {detail}"),
            Self::RuntimeError { detail, .. } => format!("runtime error: {detail}"),
            Self::PolicyViolation { rule } => format!("policy violation: {rule}"),
            Self::Timeout => "execution timed out".to_string(),
        }
    }
}

impl std::fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.summary())
    }
}
