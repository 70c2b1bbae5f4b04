//! Stage chain driver
//!
//! Runs the stages in their fixed order and stops at the first
//! rejection. The execution stage sits last and is the only one that
//! needs a slot from the pool.

use std::sync::Arc;

use async_trait::async_trait;
use crucible_solution::{CandidateSolution, ValidationVerdict};
use tracing::{debug, info};

use crate::backend::{ExecutionBackend, ExecutionOutput, ResourceLimits, SubprocessBackend};
use crate::error::SandboxError;
use crate::policy::DependencyCheck;
use crate::pool::SlotPool;
use crate::stage::{StageOutcome, ValidationStage};
use crate::static_check::StaticCheck;

/// Final stage: run the candidate under the configured limits.
pub struct IsolatedExecution {
    backend: Arc<dyn ExecutionBackend>,
    slots: SlotPool,
    limits: ResourceLimits,
}

impl IsolatedExecution {
    pub fn new(backend: Arc<dyn ExecutionBackend>, slots: SlotPool, limits: ResourceLimits) -> Self {
        Self {
            backend,
            slots,
            limits,
        }
    }
}

/// Map what the interpreter did to a verdict.
fn verdict_from_output(output: &ExecutionOutput) -> StageOutcome {
    if output.timed_out {
        return StageOutcome::Fail(ValidationVerdict::Timeout);
    }
    if output.succeeded() {
        return StageOutcome::Pass;
    }
    let detail = output
        .stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map_or_else(
            || match output.exit_code {
                Some(code) => format!("process exited with status {code}"),
                None => "process terminated by signal".to_string(),
            },
            ToString::to_string,
        );
    StageOutcome::Fail(ValidationVerdict::RuntimeError {
        detail,
        traceback: output.stderr.clone(),
    })
}

#[async_trait]
impl ValidationStage for IsolatedExecution {
    fn name(&self) -> &'static str {
        "isolated_execution"
    }

    async fn evaluate(&self, solution: &CandidateSolution) -> Result<StageOutcome, SandboxError> {
        // Held for the whole run; returned on every exit path by drop.
        let _slot = self.slots.acquire().await?;
        // The deadline binds here as well as inside the backend, so a
        // stalled backend cannot hold the slot past the budget.
        let run = self.backend.run(&solution.code, &self.limits);
        match tokio::time::timeout(self.limits.timeout, run).await {
            Ok(output) => Ok(verdict_from_output(&output?)),
            Err(_) => Ok(StageOutcome::Fail(ValidationVerdict::Timeout)),
        }
    }
}

/// Ordered, short-circuiting validation chain
pub struct Validator {
    stages: Vec<Box<dyn ValidationStage>>,
}

impl Validator {
    /// Chain with caller-supplied stages, run in the given order.
    #[must_use]
    pub fn new(stages: Vec<Box<dyn ValidationStage>>) -> Self {
        Self { stages }
    }

    /// Standard chain: syntax, import policy, then isolated execution.
    #[must_use]
    pub fn standard(
        backend: Arc<dyn ExecutionBackend>,
        policy: DependencyCheck,
        slots: SlotPool,
        limits: ResourceLimits,
    ) -> Self {
        Self::new(vec![
            Box::new(StaticCheck::new()),
            Box::new(policy),
            Box::new(IsolatedExecution::new(backend, slots, limits)),
        ])
    }

    /// Standard chain over a local `python3` with default limits.
    #[must_use]
    pub fn with_defaults(max_slots: usize) -> Self {
        Self::standard(
            Arc::new(SubprocessBackend::default()),
            DependencyCheck::new(),
            SlotPool::new(max_slots),
            ResourceLimits::default(),
        )
    }

    /// Validate one candidate, stopping at the first rejection.
    pub async fn validate(
        &self,
        solution: &CandidateSolution,
    ) -> Result<ValidationVerdict, SandboxError> {
        for stage in &self.stages {
            debug!(stage = stage.name(), attempt = solution.attempt, "running stage");
            match stage.evaluate(solution).await? {
                StageOutcome::Pass => {}
                StageOutcome::Fail(verdict) => {
                    info!(
                        stage = stage.name(),
                        attempt = solution.attempt,
                        verdict = verdict.kind(),
                        "candidate rejected"
                    );
                    return Ok(verdict);
                }
            }
        }
        info!(attempt = solution.attempt, "candidate passed all stages");
        Ok(ValidationVerdict::Passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::MockValidationStage;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn candidate(code: &str) -> CandidateSolution {
        CandidateSolution::new(1, code, "test")
    }

    fn passing_stage(name: &'static str) -> MockValidationStage {
        let mut stage = MockValidationStage::new();
        stage.expect_name().return_const(name);
        stage
            .expect_evaluate()
            .times(1)
            .returning(|_| Ok(StageOutcome::Pass));
        stage
    }

    #[tokio::test]
    async fn all_stages_passing_yields_passed() {
        let validator = Validator::new(vec![
            Box::new(passing_stage("first")),
            Box::new(passing_stage("second")),
        ]);
        let verdict = validator
            .validate(&candidate("x = 1"))
            .await
            .expect("no infrastructure fault");
        assert_eq!(verdict, ValidationVerdict::Passed);
    }

    #[tokio::test]
    async fn chain_short_circuits_on_first_rejection() {
        let mut rejecting = MockValidationStage::new();
        rejecting.expect_name().return_const("rejecting");
        rejecting.expect_evaluate().times(1).returning(|_| {
            Ok(StageOutcome::Fail(ValidationVerdict::PolicyViolation {
                rule: "no".into(),
            }))
        });

        let mut unreachable = MockValidationStage::new();
        unreachable.expect_name().return_const("unreachable");
        unreachable.expect_evaluate().times(0);

        let validator = Validator::new(vec![Box::new(rejecting), Box::new(unreachable)]);
        let verdict = validator
            .validate(&candidate("x = 1"))
            .await
            .expect("no infrastructure fault");
        assert!(matches!(verdict, ValidationVerdict::PolicyViolation { .. }));
    }

    #[tokio::test]
    async fn stage_faults_propagate() {
        let mut broken = MockValidationStage::new();
        broken.expect_name().return_const("broken");
        broken
            .expect_evaluate()
            .times(1)
            .returning(|_| Err(SandboxError::PoolClosed));

        let validator = Validator::new(vec![Box::new(broken)]);
        let err = validator
            .validate(&candidate("x = 1"))
            .await
            .expect_err("stage reported a fault");
        assert!(matches!(err, SandboxError::PoolClosed));
    }

    struct FixedBackend {
        output: ExecutionOutput,
    }

    #[async_trait]
    impl ExecutionBackend for FixedBackend {
        async fn run(
            &self,
            _code: &str,
            _limits: &ResourceLimits,
        ) -> Result<ExecutionOutput, SandboxError> {
            Ok(self.output.clone())
        }
    }

    fn output(exit_code: Option<i32>, stderr: &str, timed_out: bool) -> ExecutionOutput {
        ExecutionOutput {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
            elapsed: Duration::from_millis(5),
            timed_out,
        }
    }

    async fn execute(out: ExecutionOutput) -> StageOutcome {
        let stage = IsolatedExecution::new(
            Arc::new(FixedBackend { output: out }),
            SlotPool::new(1),
            ResourceLimits::default(),
        );
        stage
            .evaluate(&candidate("x = 1"))
            .await
            .expect("backend is infallible here")
    }

    #[tokio::test]
    async fn clean_exit_passes_execution() {
        assert_eq!(execute(output(Some(0), "", false)).await, StageOutcome::Pass);
    }

    #[tokio::test]
    async fn nonzero_exit_maps_to_runtime_error_with_last_stderr_line() {
        let stderr = "Traceback (most recent call last):\n  File \"solution.py\", line 1\nZeroDivisionError: division by zero\n";
        let outcome = execute(output(Some(1), stderr, false)).await;
        let StageOutcome::Fail(ValidationVerdict::RuntimeError { detail, traceback }) = outcome
        else {
            panic!("expected a runtime rejection");
        };
        assert_eq!(detail, "ZeroDivisionError: division by zero");
        assert!(traceback.contains("Traceback"));
    }

    #[tokio::test]
    async fn deadline_maps_to_timeout() {
        let outcome = execute(output(None, "", true)).await;
        assert_eq!(outcome, StageOutcome::Fail(ValidationVerdict::Timeout));
    }

    struct StalledTestBackend;

    #[async_trait]
    impl ExecutionBackend for StalledTestBackend {
        async fn run(
            &self,
            _code: &str,
            _limits: &ResourceLimits,
        ) -> Result<ExecutionOutput, SandboxError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(output(Some(0), "", false))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_backend_is_cut_off_at_the_deadline() {
        let stage = IsolatedExecution::new(
            Arc::new(StalledTestBackend),
            SlotPool::new(1),
            ResourceLimits {
                timeout: Duration::from_millis(100),
                ..ResourceLimits::default()
            },
        );
        let outcome = stage
            .evaluate(&candidate("while True: pass"))
            .await
            .expect("deadline is not a fault");
        assert_eq!(outcome, StageOutcome::Fail(ValidationVerdict::Timeout));
        assert_eq!(stage.slots.available(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_execution_releases_its_slot() {
        // Dropping the in-flight future mid-run must hand the slot back;
        // the permit is owned, so cancellation is enough.
        let pool = SlotPool::new(1);
        let stage = IsolatedExecution::new(
            Arc::new(StalledTestBackend),
            pool.clone(),
            ResourceLimits {
                timeout: Duration::from_secs(3600),
                ..ResourceLimits::default()
            },
        );

        let running = tokio::spawn(async move {
            stage.evaluate(&candidate("while True: pass")).await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(pool.available(), 0, "slot held while the run is live");

        running.abort();
        let join = running.await;
        assert!(join.expect_err("task was aborted").is_cancelled());
        assert_eq!(pool.available(), 1, "slot returned after cancellation");
    }

    #[tokio::test]
    async fn signal_death_without_stderr_is_still_a_runtime_error() {
        let outcome = execute(output(None, "", false)).await;
        let StageOutcome::Fail(ValidationVerdict::RuntimeError { detail, .. }) = outcome else {
            panic!("expected a runtime rejection");
        };
        assert!(detail.contains("signal"), "detail: {detail}");
    }
}
