//! The retrieve/generate/validate/correct loop
//!
//! One `Workflow` owns the three components and drives a request
//! through them. Termination is structural: the loop iterates once per
//! attempt in the budget and nothing inside it can add iterations.

use std::sync::Arc;
use std::time::Instant;

use crucible_generator::{CompletionModel, GenerateError, SolutionGenerator};
use crucible_retrieval::{ContextRetriever, VectorIndex};
use crucible_sandbox::{
    DependencyCheck, ExecutionBackend, ResourceLimits, SlotPool, Validator,
};
use crucible_solution::{PriorFailure, Request};
use tracing::{debug, info, warn};

use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::state::{
    AttemptOutcome, AttemptRecord, RunStatus, WorkflowPhase, WorkflowResult, WorkflowState,
};

/// Drives requests through the correction loop.
pub struct Workflow {
    retriever: ContextRetriever,
    generator: SolutionGenerator,
    validator: Validator,
    config: WorkflowConfig,
}

impl Workflow {
    /// Assemble a workflow from pre-built components.
    #[must_use]
    pub fn new(
        retriever: ContextRetriever,
        generator: SolutionGenerator,
        validator: Validator,
        config: WorkflowConfig,
    ) -> Self {
        Self {
            retriever,
            generator,
            validator,
            config,
        }
    }

    /// Wire the standard components from the configuration.
    #[must_use]
    pub fn assemble(
        index: Arc<dyn VectorIndex>,
        model: Arc<dyn CompletionModel>,
        backend: Arc<dyn ExecutionBackend>,
        config: WorkflowConfig,
    ) -> Self {
        let retriever = ContextRetriever::new(index, config.retrieval_timeout, config.top_k);
        let generator = SolutionGenerator::new(model, config.generation_timeout);
        let validator = Validator::standard(
            backend,
            DependencyCheck::from_allow_list(config.dependency_allow_list.clone()),
            SlotPool::new(config.max_sandbox_slots),
            ResourceLimits {
                timeout: config.execution_timeout,
                memory_bytes: config.execution_memory_limit,
                max_output_bytes: config.max_output_bytes,
            },
        );
        Self::new(retriever, generator, validator, config)
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &WorkflowConfig {
        &self.config
    }

    /// Run one request to a terminal status.
    ///
    /// Retrieval failures degrade to an empty context and the run
    /// continues. An unreachable model ends the run with an error;
    /// everything else, including an exhausted budget, is an ordinary
    /// result.
    pub async fn run(&self, request: &Request) -> Result<WorkflowResult, WorkflowError> {
        let started = Instant::now();
        let mut state = WorkflowState::new();
        info!(request_id = %request.id, max_attempts = self.config.max_attempts, "run started");

        let context = self.retriever.retrieve(request).await;
        let context_origin = context.origin;
        debug!(request_id = %request.id, origin = ?context_origin, passages = context.len(), "context ready");

        let mut prior: Option<PriorFailure> = None;

        for attempt in 1..=self.config.max_attempts {
            state.advance(WorkflowPhase::Generating)?;

            match self
                .generator
                .generate(request, &context, attempt, prior.as_ref())
                .await
            {
                Ok(solution) => {
                    state.advance(WorkflowPhase::Validating)?;
                    let verdict = self.validator.validate(&solution).await?;
                    state.record(AttemptRecord {
                        attempt,
                        outcome: AttemptOutcome::Validated {
                            solution: solution.clone(),
                            verdict: verdict.clone(),
                        },
                    });

                    if verdict.is_passed() {
                        state.advance(WorkflowPhase::Succeeded)?;
                        info!(request_id = %request.id, attempt, "run succeeded");
                        return Ok(WorkflowResult {
                            status: RunStatus::Succeeded,
                            final_solution: Some(solution),
                            final_verdict: Some(verdict),
                            history: state.into_history(),
                            context_origin,
                            elapsed: started.elapsed(),
                        });
                    }

                    debug!(request_id = %request.id, attempt, verdict = verdict.kind(), "attempt rejected");
                    prior = Some(PriorFailure::Rejected { solution, verdict });
                }
                Err(GenerateError::Unavailable(detail)) => {
                    warn!(request_id = %request.id, attempt, detail, "model unavailable, run aborted");
                    return Err(WorkflowError::GenerationUnavailable(detail));
                }
                Err(GenerateError::Malformed(detail)) => {
                    debug!(request_id = %request.id, attempt, "response unparseable, attempt consumed");
                    state.record(AttemptRecord {
                        attempt,
                        outcome: AttemptOutcome::Malformed {
                            detail: detail.clone(),
                        },
                    });
                    prior = Some(PriorFailure::Unparseable { detail });
                }
            }

            if attempt < self.config.max_attempts {
                state.advance(WorkflowPhase::Correcting)?;
            }
        }

        state.advance(WorkflowPhase::Exhausted)?;
        info!(
            request_id = %request.id,
            attempts = state.attempts(),
            "run exhausted without a passing candidate"
        );

        let (final_solution, final_verdict) = match state.history().last() {
            Some(AttemptRecord {
                outcome: AttemptOutcome::Validated { solution, verdict },
                ..
            }) => (Some(solution.clone()), Some(verdict.clone())),
            _ => (None, None),
        };

        Ok(WorkflowResult {
            status: RunStatus::Exhausted,
            final_solution,
            final_verdict,
            history: state.into_history(),
            context_origin,
            elapsed: started.elapsed(),
        })
    }
}
