//! Import and call policy
//!
//! Scans the candidate for module imports and known-dangerous call
//! forms. Modules must appear on the allow-list, and a short list of
//! call patterns is rejected outright. This is a cheap textual gate in
//! front of the interpreter, not a Python security boundary; the
//! subprocess limits below it are what actually contain the code.

use std::collections::BTreeSet;

use async_trait::async_trait;
use crucible_solution::{CandidateSolution, ValidationVerdict};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::SandboxError;
use crate::stage::{StageOutcome, ValidationStage};

static IMPORT_STMT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:from\s+([A-Za-z_][\w.]*)|import\s+([A-Za-z_][\w.,\s]*?))\s*(?:import\s|as\s|$)")
        .expect("valid regex")
});

/// Modules a candidate may import without any configuration: the usual
/// stdlib helpers plus the common data-science stack.
const DEFAULT_ALLOWED: &[&str] = &[
    "abc",
    "beautifulsoup4",
    "bisect",
    "calendar",
    "collections",
    "copy",
    "csv",
    "dataclasses",
    "datetime",
    "decimal",
    "enum",
    "fractions",
    "functools",
    "hashlib",
    "heapq",
    "hmac",
    "itertools",
    "json",
    "math",
    "matplotlib",
    "numpy",
    "operator",
    "pandas",
    "plotly",
    "pprint",
    "random",
    "re",
    "reprlib",
    "scipy",
    "seaborn",
    "secrets",
    "sklearn",
    "statistics",
    "statsmodels",
    "string",
    "textwrap",
    "time",
    "typing",
    "unicodedata",
    "uuid",
];

/// Modules that are rejected even if someone puts them on the allow-list.
const DENIED_MODULES: &[&str] = &[
    "ctypes",
    "importlib",
    "multiprocessing",
    "os",
    "pathlib",
    "pickle",
    "shutil",
    "signal",
    "socket",
    "subprocess",
    "sys",
    "threading",
];

/// Call forms that sidestep the import scan entirely.
const DENIED_CALLS: &[&str] = &["eval(", "exec(", "__import__", "compile(", "open("];

/// The default stdlib allow-list as an owned set.
#[must_use]
pub fn default_allow_list() -> BTreeSet<String> {
    DEFAULT_ALLOWED.iter().map(|m| (*m).to_string()).collect()
}

/// Allow-list gate over imports and dangerous call forms
#[derive(Debug, Clone)]
pub struct DependencyCheck {
    allowed: BTreeSet<String>,
}

impl Default for DependencyCheck {
    fn default() -> Self {
        Self::new()
    }
}

impl DependencyCheck {
    /// Policy with the default stdlib allow-list.
    #[must_use]
    pub fn new() -> Self {
        Self::from_allow_list(default_allow_list())
    }

    /// Policy with a caller-supplied allow-list. The denied module and
    /// call sets still apply on top of it.
    #[must_use]
    pub fn from_allow_list(allowed: BTreeSet<String>) -> Self {
        Self { allowed }
    }

    /// Extend the allow-list with additional module roots.
    #[must_use]
    pub fn with_allowed<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed.extend(modules.into_iter().map(Into::into));
        self
    }

    /// Number of allow-listed module roots.
    #[inline]
    #[must_use]
    pub fn allowed_len(&self) -> usize {
        self.allowed.len()
    }

    fn check(&self, solution: &CandidateSolution) -> StageOutcome {
        // Declared imports and imports written into the body are one set;
        // a module declared but never mentioned in the code still counts.
        for module in declared_roots(&solution.imports)
            .into_iter()
            .chain(import_roots(&solution.code))
        {
            if DENIED_MODULES.contains(&module.as_str()) {
                return violation(format!("import of '{module}' is not permitted"));
            }
            if !self.allowed.contains(&module) {
                return violation(format!("module '{module}' is outside the allow-list"));
            }
        }
        for pattern in DENIED_CALLS {
            if solution.code.contains(pattern) {
                let name = pattern.trim_end_matches('(');
                return violation(format!("use of '{name}' is not permitted"));
            }
        }
        StageOutcome::Pass
    }
}

fn violation(rule: String) -> StageOutcome {
    StageOutcome::Fail(ValidationVerdict::PolicyViolation { rule })
}

/// Root module names referenced by import statements, in source order.
fn import_roots(code: &str) -> Vec<String> {
    let mut roots = Vec::new();
    for captures in IMPORT_STMT.captures_iter(code) {
        if let Some(from_module) = captures.get(1) {
            push_root(&mut roots, from_module.as_str());
        } else if let Some(list) = captures.get(2) {
            for entry in list.as_str().split(',') {
                let module = entry.split_whitespace().next().unwrap_or("");
                push_root(&mut roots, module);
            }
        }
    }
    roots
}

/// Root modules from the declared import list. Entries may be full
/// statements ("from os.path import join") or bare names ("socket").
fn declared_roots(imports: &[String]) -> Vec<String> {
    let mut roots = Vec::new();
    for entry in imports {
        let statement = import_roots(entry);
        if statement.is_empty() {
            push_root(&mut roots, entry.trim());
        } else {
            for module in statement {
                push_root(&mut roots, &module);
            }
        }
    }
    roots
}

fn push_root(roots: &mut Vec<String>, module: &str) {
    let root = module.split('.').next().unwrap_or("").trim();
    if !root.is_empty() && !roots.iter().any(|r| r == root) {
        roots.push(root.to_string());
    }
}

#[async_trait]
impl ValidationStage for DependencyCheck {
    fn name(&self) -> &'static str {
        "dependency_check"
    }

    async fn evaluate(&self, solution: &CandidateSolution) -> Result<StageOutcome, SandboxError> {
        let outcome = self.check(solution);
        debug!(passed = outcome.is_pass(), "dependency check complete");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidate(code: &str) -> CandidateSolution {
        CandidateSolution::new(1, code, "test")
    }

    async fn check(code: &str) -> StageOutcome {
        DependencyCheck::new()
            .evaluate(&candidate(code))
            .await
            .expect("policy check is infallible")
    }

    #[tokio::test]
    async fn allowed_imports_pass() {
        let outcome = check("import math\nfrom collections import Counter\n\nprint(math.pi)").await;
        assert_eq!(outcome, StageOutcome::Pass);
    }

    #[tokio::test]
    async fn denied_module_names_the_rule() {
        let StageOutcome::Fail(ValidationVerdict::PolicyViolation { rule }) =
            check("import os\nos.listdir('.')").await
        else {
            panic!("expected a policy violation");
        };
        assert!(rule.contains("'os'"), "rule: {rule}");
    }

    #[tokio::test]
    async fn unknown_module_is_outside_allow_list() {
        let StageOutcome::Fail(ValidationVerdict::PolicyViolation { rule }) =
            check("import requests").await
        else {
            panic!("expected a policy violation");
        };
        assert!(rule.contains("allow-list"), "rule: {rule}");
    }

    #[tokio::test]
    async fn from_import_uses_the_root_module() {
        let outcome = check("from os.path import join").await;
        assert!(matches!(
            outcome,
            StageOutcome::Fail(ValidationVerdict::PolicyViolation { .. })
        ));
    }

    #[tokio::test]
    async fn dangerous_calls_are_rejected_without_imports() {
        let StageOutcome::Fail(ValidationVerdict::PolicyViolation { rule }) =
            check("x = eval('1 + 1')").await
        else {
            panic!("expected a policy violation");
        };
        assert!(rule.contains("'eval'"), "rule: {rule}");
    }

    #[tokio::test]
    async fn open_is_rejected() {
        let outcome = check("data = open('secrets.txt').read()").await;
        assert!(matches!(
            outcome,
            StageOutcome::Fail(ValidationVerdict::PolicyViolation { .. })
        ));
    }

    #[tokio::test]
    async fn extended_allow_list_admits_extra_modules() {
        let policy = DependencyCheck::new().with_allowed(["torch"]);
        let outcome = policy
            .evaluate(&candidate("import torch"))
            .await
            .expect("policy check is infallible");
        assert_eq!(outcome, StageOutcome::Pass);
    }

    #[tokio::test]
    async fn data_science_stack_is_allowed_by_default() {
        let outcome =
            check("import numpy\nimport pandas as pd\nfrom scipy import stats").await;
        assert_eq!(outcome, StageOutcome::Pass);
    }

    #[tokio::test]
    async fn declared_imports_are_checked_without_body_mentions() {
        // A denied module declared in the imports field must fail the
        // gate even when the code body never names it.
        let solution =
            candidate("x = 1").with_imports(vec!["import socket".to_string()]);
        let StageOutcome::Fail(ValidationVerdict::PolicyViolation { rule }) = DependencyCheck::new()
            .evaluate(&solution)
            .await
            .expect("policy check is infallible")
        else {
            panic!("expected a policy violation");
        };
        assert!(rule.contains("'socket'"), "rule: {rule}");
    }

    #[tokio::test]
    async fn bare_declared_module_names_are_checked() {
        let solution = candidate("x = 1").with_imports(vec!["requests".to_string()]);
        let StageOutcome::Fail(ValidationVerdict::PolicyViolation { rule }) = DependencyCheck::new()
            .evaluate(&solution)
            .await
            .expect("policy check is infallible")
        else {
            panic!("expected a policy violation");
        };
        assert!(rule.contains("allow-list"), "rule: {rule}");
    }

    #[tokio::test]
    async fn allowed_declared_imports_pass() {
        let solution = candidate("print(math.pi)")
            .with_imports(vec!["import math".to_string(), "json".to_string()]);
        let outcome = DependencyCheck::new()
            .evaluate(&solution)
            .await
            .expect("policy check is infallible");
        assert_eq!(outcome, StageOutcome::Pass);
    }

    #[test]
    fn import_roots_dedupe_and_split() {
        let roots = import_roots("import math, json\nimport math\nfrom decimal import Decimal");
        assert_eq!(roots, vec!["math", "json", "decimal"]);
    }
}
