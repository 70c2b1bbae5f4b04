//! Static syntax check
//!
//! Parses the candidate with the tree-sitter Python grammar and rejects
//! it on the first ERROR or MISSING node. This runs before anything
//! else so code that cannot parse never reaches the policy check or the
//! interpreter.

use async_trait::async_trait;
use crucible_solution::{CandidateSolution, ValidationVerdict};
use tracing::debug;
use tree_sitter::{Node, Parser};

use crate::error::SandboxError;
use crate::stage::{StageOutcome, ValidationStage};

/// Syntax gate backed by the tree-sitter Python grammar
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticCheck;

impl StaticCheck {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn parse(code: &str) -> Result<StageOutcome, SandboxError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| SandboxError::Grammar(e.to_string()))?;

        let Some(tree) = parser.parse(code, None) else {
            return Err(SandboxError::Grammar("parser returned no tree".into()));
        };

        let root = tree.root_node();
        if !root.has_error() {
            return Ok(StageOutcome::Pass);
        }

        let detail = first_defect(root, code)
            .unwrap_or_else(|| "invalid syntax".to_string());
        Ok(StageOutcome::Fail(ValidationVerdict::SyntaxError { detail }))
    }
}

/// Depth-first search for the first ERROR or MISSING node.
fn first_defect(node: Node<'_>, code: &str) -> Option<String> {
    if node.is_error() || node.is_missing() {
        return Some(describe(node, code));
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(Node::has_error)
        .find_map(|child| first_defect(child, code))
}

fn describe(node: Node<'_>, code: &str) -> String {
    let pos = node.start_position();
    let line = pos.row + 1;
    let column = pos.column + 1;
    if node.is_missing() {
        return format!("line {line}, column {column}: missing {}", node.kind());
    }
    let fragment = node
        .utf8_text(code.as_bytes())
        .unwrap_or("")
        .lines()
        .next()
        .unwrap_or("")
        .trim();
    if fragment.is_empty() {
        format!("line {line}, column {column}: invalid syntax")
    } else {
        format!("line {line}, column {column}: invalid syntax near '{fragment}'")
    }
}

#[async_trait]
impl ValidationStage for StaticCheck {
    fn name(&self) -> &'static str {
        "static_check"
    }

    async fn evaluate(&self, solution: &CandidateSolution) -> Result<StageOutcome, SandboxError> {
        let outcome = Self::parse(&solution.code)?;
        debug!(passed = outcome.is_pass(), "static check complete");
        Ok(outcome)
    }
}
