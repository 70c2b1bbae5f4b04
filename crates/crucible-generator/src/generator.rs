//! Solution generation
//!
//! Drives one generation attempt: prompt assembly, the model call under
//! a deadline, and response parsing. Infrastructure faults and malformed
//! responses are distinct failures because the workflow treats them
//! differently: an unavailable model ends the run, a malformed response
//! consumes an attempt.

use std::sync::Arc;
use std::time::Duration;

use crucible_retrieval::RetrievedContext;
use crucible_solution::{CandidateSolution, PriorFailure, Request};
use tracing::{debug, warn};

use crate::model::CompletionModel;
use crate::{parse, prompt};

/// Why a generation attempt produced no candidate
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The model could not be reached or did not answer in time
    #[error("generation unavailable: {0}")]
    Unavailable(String),
    /// The model answered but no candidate could be parsed from it
    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Produces candidate solutions from a completion model.
pub struct SolutionGenerator {
    model: Arc<dyn CompletionModel>,
    timeout: Duration,
}

impl SolutionGenerator {
    /// Create a generator backed by the given model with a per-call deadline.
    pub fn new(model: Arc<dyn CompletionModel>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    /// Run one generation attempt.
    ///
    /// The prompt carries the retrieved context and, on correction
    /// attempts, a summary of the prior failure so the model can revise
    /// rather than restart.
    pub async fn generate(
        &self,
        request: &Request,
        context: &RetrievedContext,
        attempt: u32,
        prior: Option<&PriorFailure>,
    ) -> Result<CandidateSolution, GenerateError> {
        let payload = prompt::build_payload(request, context, prior);
        debug!(request_id = %request.id, attempt, corrective = prior.is_some(), "calling model");

        let raw = match tokio::time::timeout(self.timeout, self.model.complete(payload)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                warn!(request_id = %request.id, attempt, error = %err, "model call failed");
                return Err(GenerateError::Unavailable(err.to_string()));
            }
            Err(_) => {
                warn!(request_id = %request.id, attempt, "model call timed out");
                return Err(GenerateError::Unavailable(format!(
                    "model did not answer within {:?}",
                    self.timeout
                )));
            }
        };

        match parse::parse_response(&raw, &request.description, attempt) {
            Ok(solution) => {
                debug!(
                    request_id = %request.id,
                    attempt,
                    imports = solution.imports.len(),
                    "candidate parsed"
                );
                Ok(solution)
            }
            Err(err) => {
                warn!(request_id = %request.id, attempt, error = %err, "unparseable response");
                Err(GenerateError::Malformed(err.to_string()))
            }
        }
    }
}
