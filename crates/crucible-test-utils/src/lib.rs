//! Testing utilities for the Crucible workspace
//!
//! Scripted components for exercising the workflow without a real
//! model, index or interpreter.

#![allow(missing_docs)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use crucible_generator::{CompletionModel, ModelError, PromptPayload};
use crucible_retrieval::{IndexError, Passage, VectorIndex};
use crucible_sandbox::{ExecutionBackend, ExecutionOutput, ResourceLimits, SandboxError};
use crucible_solution::CandidateSolution;
use parking_lot::Mutex;

/// Model that replays a fixed sequence of responses, then repeats the
/// last one. Records every payload it was given.
pub struct ScriptedModel {
    responses: Vec<String>,
    calls: Mutex<Vec<PromptPayload>>,
}

impl ScriptedModel {
    pub fn new<I, S>(responses: I) -> Arc<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::new(Self {
            responses: responses.into_iter().map(Into::into).collect(),
            calls: Mutex::new(Vec::new()),
        })
    }

    /// One response repeated for every call.
    pub fn repeating(response: impl Into<String>) -> Arc<Self> {
        Self::new([response.into()])
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn payloads(&self) -> Vec<PromptPayload> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, payload: PromptPayload) -> Result<String, ModelError> {
        let mut calls = self.calls.lock();
        let index = calls.len().min(self.responses.len().saturating_sub(1));
        calls.push(payload);
        self.responses
            .get(index)
            .cloned()
            .ok_or_else(|| ModelError::Failed("no scripted response".into()))
    }
}

/// Model that always fails, as if the service were down.
pub struct UnavailableModel;

#[async_trait]
impl CompletionModel for UnavailableModel {
    async fn complete(&self, _payload: PromptPayload) -> Result<String, ModelError> {
        Err(ModelError::Failed("service unavailable".into()))
    }
}

/// Index that serves a fixed set of passages for every query.
pub struct StaticIndex {
    passages: Vec<Passage>,
}

impl StaticIndex {
    pub fn new(passages: Vec<Passage>) -> Arc<Self> {
        Arc::new(Self { passages })
    }

    pub fn empty() -> Arc<Self> {
        Self::new(Vec::new())
    }
}

#[async_trait]
impl VectorIndex for StaticIndex {
    async fn search(&self, _query: &str, top_k: usize) -> Result<Vec<Passage>, IndexError> {
        if self.passages.is_empty() {
            return Err(IndexError::Empty);
        }
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }
}

/// Index that is always down.
pub struct UnavailableIndex;

#[async_trait]
impl VectorIndex for UnavailableIndex {
    async fn search(&self, _query: &str, _top_k: usize) -> Result<Vec<Passage>, IndexError> {
        Err(IndexError::Unavailable("index offline".into()))
    }
}

/// Backend that replays scripted outputs and counts executions.
pub struct RecordingBackend {
    outputs: Vec<ExecutionOutput>,
    executed: Mutex<Vec<String>>,
}

impl RecordingBackend {
    /// Replays the given outputs in order, repeating the last.
    pub fn new(outputs: Vec<ExecutionOutput>) -> Arc<Self> {
        Arc::new(Self {
            outputs,
            executed: Mutex::new(Vec::new()),
        })
    }

    /// Every execution exits cleanly.
    pub fn always_passing() -> Arc<Self> {
        Self::new(vec![clean_exit()])
    }

    /// Every execution dies with the given stderr.
    pub fn always_crashing(stderr: impl Into<String>) -> Arc<Self> {
        Self::new(vec![ExecutionOutput {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: stderr.into(),
            elapsed: Duration::from_millis(5),
            timed_out: false,
        }])
    }

    pub fn execution_count(&self) -> usize {
        self.executed.lock().len()
    }

    pub fn executed_code(&self) -> Vec<String> {
        self.executed.lock().clone()
    }
}

#[async_trait]
impl ExecutionBackend for RecordingBackend {
    async fn run(
        &self,
        code: &str,
        _limits: &ResourceLimits,
    ) -> Result<ExecutionOutput, SandboxError> {
        let mut executed = self.executed.lock();
        let index = executed.len().min(self.outputs.len().saturating_sub(1));
        executed.push(code.to_string());
        self.outputs
            .get(index)
            .cloned()
            .ok_or(SandboxError::PoolClosed)
    }
}

/// Backend that never finishes within any realistic deadline.
pub struct StalledBackend;

#[async_trait]
impl ExecutionBackend for StalledBackend {
    async fn run(
        &self,
        _code: &str,
        _limits: &ResourceLimits,
    ) -> Result<ExecutionOutput, SandboxError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(clean_exit())
    }
}

/// A clean interpreter exit with no output.
pub fn clean_exit() -> ExecutionOutput {
    ExecutionOutput {
        exit_code: Some(0),
        stdout: String::new(),
        stderr: String::new(),
        elapsed: Duration::from_millis(5),
        timed_out: false,
    }
}

/// A structured model response carrying the given code.
pub fn json_response(code: &str) -> String {
    serde_json::json!({
        "code": code,
        "explanation": "scripted",
        "imports": []
    })
    .to_string()
}

/// Sample documentation passages for retrieval fixtures.
pub fn sample_passages() -> Vec<Passage> {
    vec![
        Passage::new("sorted(iterable) returns a new sorted list.", "stdlib/sorted", 0.91),
        Passage::new("list.append(x) adds an item to the end.", "stdlib/list", 0.78),
    ]
}

/// A candidate with the given code and a throwaway explanation.
pub fn sample_candidate(attempt: u32, code: &str) -> CandidateSolution {
    CandidateSolution::new(attempt, code, "sample candidate")
}
