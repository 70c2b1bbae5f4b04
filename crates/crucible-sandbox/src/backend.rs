//! Isolated execution backend
//!
//! Runs candidate code in a freshly spawned interpreter with a cleared
//! environment, a temporary working directory, an address-space ceiling
//! and a wall-clock deadline. The child is killed when its handle is
//! dropped, so a cancelled validation cannot leak a running process.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::SandboxError;

/// Ceilings applied to one isolated execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Wall-clock deadline for the interpreter
    pub timeout: Duration,
    /// Address-space ceiling in bytes
    pub memory_bytes: u64,
    /// Captured bytes retained per stream
    pub max_output_bytes: usize,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            memory_bytes: 256 * 1024 * 1024,
            max_output_bytes: 10_000,
        }
    }
}

/// What one isolated execution produced
#[derive(Debug, Clone)]
pub struct ExecutionOutput {
    /// Exit code, when the process exited on its own
    pub exit_code: Option<i32>,
    /// Captured standard output, truncated to the limit
    pub stdout: String,
    /// Captured standard error, truncated to the limit
    pub stderr: String,
    /// Wall-clock time spent
    pub elapsed: Duration,
    /// True when the deadline fired before the process exited
    pub timed_out: bool,
}

impl ExecutionOutput {
    /// True when the process exited cleanly within the deadline.
    #[inline]
    #[must_use]
    pub fn succeeded(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Runs code under the configured limits.
#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    async fn run(&self, code: &str, limits: &ResourceLimits)
        -> Result<ExecutionOutput, SandboxError>;
}

/// Python subprocess backend
#[derive(Debug, Clone)]
pub struct SubprocessBackend {
    interpreter: String,
}

impl Default for SubprocessBackend {
    fn default() -> Self {
        Self::new("python3")
    }
}

impl SubprocessBackend {
    /// Backend using the given interpreter binary.
    #[must_use]
    pub fn new(interpreter: impl Into<String>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }
}

/// Bootstrap that applies the address-space ceiling inside the child
/// before the candidate file runs. RLIMIT_AS is set from within the
/// interpreter so the parent needs no privileged process control.
fn build_shim(memory_bytes: u64) -> String {
    format!(
        "import resource, runpy, sys\n\
         resource.setrlimit(resource.RLIMIT_AS, ({memory_bytes}, {memory_bytes}))\n\
         runpy.run_path(sys.argv[1], run_name='__main__')"
    )
}

fn truncate_stream(bytes: &[u8], max_bytes: usize) -> String {
    if bytes.len() <= max_bytes {
        return String::from_utf8_lossy(bytes).into_owned();
    }
    let mut text = String::from_utf8_lossy(&bytes[..max_bytes]).into_owned();
    // Drop a trailing replacement char from a split multi-byte sequence.
    if text.ends_with('\u{FFFD}') {
        text.pop();
    }
    text.push_str("\n... [output truncated]");
    text
}

#[async_trait]
impl ExecutionBackend for SubprocessBackend {
    async fn run(
        &self,
        code: &str,
        limits: &ResourceLimits,
    ) -> Result<ExecutionOutput, SandboxError> {
        let workspace = tempfile::tempdir().map_err(SandboxError::Workspace)?;
        let entry = workspace.path().join("solution.py");
        tokio::fs::write(&entry, code)
            .await
            .map_err(SandboxError::Workspace)?;

        let mut cmd = Command::new(&self.interpreter);
        cmd.arg("-I")
            .arg("-c")
            .arg(build_shim(limits.memory_bytes))
            .arg(&entry)
            .current_dir(workspace.path())
            .env_clear()
            .env("PATH", "/usr/local/bin:/usr/bin:/bin")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let started = Instant::now();
        let child = cmd.spawn().map_err(SandboxError::Subprocess)?;

        match tokio::time::timeout(limits.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let result = ExecutionOutput {
                    exit_code: output.status.code(),
                    stdout: truncate_stream(&output.stdout, limits.max_output_bytes),
                    stderr: truncate_stream(&output.stderr, limits.max_output_bytes),
                    elapsed: started.elapsed(),
                    timed_out: false,
                };
                debug!(
                    exit_code = ?result.exit_code,
                    elapsed_ms = result.elapsed.as_millis() as u64,
                    "execution finished"
                );
                Ok(result)
            }
            Ok(Err(e)) => Err(SandboxError::Subprocess(e)),
            // Dropping the wait future drops the child handle, which
            // kills the interpreter via kill_on_drop.
            Err(_) => {
                debug!(timeout_ms = limits.timeout.as_millis() as u64, "execution timed out");
                Ok(ExecutionOutput {
                    exit_code: None,
                    stdout: String::new(),
                    stderr: String::new(),
                    elapsed: started.elapsed(),
                    timed_out: true,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_limits() {
        let limits = ResourceLimits::default();
        assert_eq!(limits.timeout, Duration::from_secs(30));
        assert_eq!(limits.memory_bytes, 256 * 1024 * 1024);
        assert_eq!(limits.max_output_bytes, 10_000);
    }

    #[test]
    fn shim_applies_the_memory_ceiling() {
        let shim = build_shim(1024);
        assert!(shim.contains("RLIMIT_AS, (1024, 1024)"));
        assert!(shim.contains("runpy.run_path"));
    }

    #[test]
    fn short_streams_are_kept_verbatim() {
        assert_eq!(truncate_stream(b"hello\n", 100), "hello\n");
    }

    #[test]
    fn long_streams_are_truncated_with_a_marker() {
        let text = truncate_stream(&[b'a'; 50], 10);
        assert!(text.starts_with("aaaaaaaaaa"));
        assert!(text.ends_with("[output truncated]"));
    }

    #[test]
    fn truncation_never_ends_on_a_split_character() {
        // Multi-byte character straddling the cut point.
        let bytes = "abcd\u{00e9}".as_bytes();
        let text = truncate_stream(bytes, 5);
        assert!(!text.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn missing_interpreter_is_an_infrastructure_error() {
        let backend = SubprocessBackend::new("definitely-not-an-interpreter");
        let err = backend
            .run("print(1)", &ResourceLimits::default())
            .await
            .expect_err("binary does not exist");
        assert!(matches!(err, SandboxError::Subprocess(_)));
    }

    #[test]
    fn success_requires_a_clean_exit() {
        let mut output = ExecutionOutput {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            elapsed: Duration::from_millis(1),
            timed_out: false,
        };
        assert!(output.succeeded());
        output.exit_code = Some(1);
        assert!(!output.succeeded());
        output.exit_code = Some(0);
        output.timed_out = true;
        assert!(!output.succeeded());
    }
}
