//! Crucible foundation types
//!
//! Shared vocabulary for the whole workspace:
//! - Requests and their target language
//! - Candidate solutions produced by the generator
//! - Validation verdicts produced by the sandbox
//! - The prior-failure payload carried by the correction loop

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod candidate;
pub mod request;
pub mod verdict;

pub use candidate::{CandidateSolution, PriorFailure};
pub use request::{Request, RequestId, TargetLanguage};
pub use verdict::ValidationVerdict;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
