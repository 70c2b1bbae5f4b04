//! Crucible solution generator
//!
//! Thin boundary to the external language-model capability:
//! - `CompletionModel` is the only contact surface with the model
//! - `SolutionGenerator` assembles the prompt (request + retrieved context
//!   + most recent failure) and parses the response into a
//!   `CandidateSolution`
//! - Parsing degrades from structured JSON to fenced-code extraction; a
//!   response with no usable code body is `Malformed` and consumes an
//!   attempt rather than aborting the run

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod generator;
pub mod model;
mod parse;
pub mod prompt;

pub use generator::{GenerateError, SolutionGenerator};
pub use model::{CompletionModel, ModelError, PromptPayload};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
