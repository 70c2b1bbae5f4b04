//! Response parsing
//!
//! Turns raw model output into a `CandidateSolution`. The chain degrades
//! gracefully: structured JSON first, then a fenced JSON block, then a
//! fenced code block with a synthesized explanation. A response with no
//! usable code body after all fallbacks is a parse failure.

use crucible_solution::CandidateSolution;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static JSON_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid regex"));
static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(?:[a-zA-Z0-9_+-]*)\n(.*?)```").expect("valid regex"));
static IMPORT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:from\s+\S+\s+)?import\s+.+$").expect("valid regex"));

/// Why a response could not be parsed
#[derive(Debug, thiserror::Error)]
pub enum ParseFailure {
    /// No code body could be recovered
    #[error("no code body in response: {0}")]
    MissingCode(String),
}

/// Structured shape the model is asked to produce
#[derive(Debug, Deserialize)]
struct RawSolution {
    code: String,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    imports: Option<Vec<String>>,
    #[serde(default)]
    assumptions: Option<String>,
}

/// Parse raw model output into a candidate for the given attempt
pub(crate) fn parse_response(
    raw: &str,
    request_description: &str,
    attempt: u32,
) -> Result<CandidateSolution, ParseFailure> {
    // 1. The whole response as JSON, or a fenced JSON block
    let structured = serde_json::from_str::<RawSolution>(raw.trim()).ok().or_else(|| {
        JSON_FENCE
            .captures(raw)
            .and_then(|c| serde_json::from_str::<RawSolution>(c.get(1)?.as_str()).ok())
    });

    if let Some(solution) = structured {
        return finish(solution, request_description, attempt);
    }

    // 2. A fenced code block with everything else as explanation
    if let Some(captures) = CODE_FENCE.captures(raw) {
        let code = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
        let explanation = CODE_FENCE.replace_all(raw, "").trim().to_string();
        let solution = RawSolution {
            code: code.to_string(),
            explanation: (!explanation.is_empty()).then_some(explanation),
            imports: None,
            assumptions: Some("recovered from unstructured response".to_string()),
        };
        return finish(solution, request_description, attempt);
    }

    Err(ParseFailure::MissingCode(
        "response is neither valid JSON nor a fenced code block".to_string(),
    ))
}

fn finish(
    raw: RawSolution,
    request_description: &str,
    attempt: u32,
) -> Result<CandidateSolution, ParseFailure> {
    let code = clean_code(&raw.code);
    if code.trim().is_empty() {
        return Err(ParseFailure::MissingCode("code field is empty".to_string()));
    }

    let mut imports = extract_imports(&code);
    for declared in raw.imports.unwrap_or_default() {
        let declared = declared.trim().to_string();
        if !declared.is_empty() && !imports.contains(&declared) {
            imports.push(declared);
        }
    }

    let explanation = raw
        .explanation
        .filter(|e| !e.trim().is_empty())
        .unwrap_or_else(|| format!("Generated solution for: {request_description}"));

    let mut candidate = CandidateSolution::new(attempt, code, explanation).with_imports(imports);
    if let Some(assumptions) = raw.assumptions.filter(|a| !a.trim().is_empty()) {
        candidate = candidate.with_assumptions(assumptions);
    }
    Ok(candidate)
}

/// Strip stray fences and collapse runs of blank lines
pub(crate) fn clean_code(code: &str) -> String {
    let mut cleaned: Vec<&str> = Vec::new();
    for line in code.lines() {
        if line.trim_start().starts_with("```") {
            continue;
        }
        if line.trim().is_empty() && cleaned.last().is_some_and(|l| l.trim().is_empty()) {
            continue;
        }
        cleaned.push(line);
    }
    cleaned.join("\n").trim().to_string()
}

/// Extract import statements from the code body
pub(crate) fn extract_imports(code: &str) -> Vec<String> {
    code.lines()
        .map(str::trim)
        .filter(|line| IMPORT_LINE.is_match(line))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_plain_json_response() {
        let raw = r#"{"code": "import math\nprint(math.pi)", "explanation": "prints pi", "imports": ["import math"], "assumptions": null}"#;
        let candidate = parse_response(raw, "print pi", 1).unwrap();

        assert_eq!(candidate.attempt, 1);
        assert!(candidate.code.contains("math.pi"));
        assert_eq!(candidate.explanation, "prints pi");
        assert_eq!(candidate.imports, vec!["import math".to_string()]);
    }

    #[test]
    fn parses_fenced_json_response() {
        let raw = "Here is the solution:\n```json\n{\"code\": \"x = 1\", \"explanation\": \"sets x\"}\n```";
        let candidate = parse_response(raw, "set x", 2).unwrap();
        assert_eq!(candidate.code, "x = 1");
        assert_eq!(candidate.attempt, 2);
    }

    #[test]
    fn falls_back_to_fenced_code_block() {
        let raw = "Sure, here you go:\n```python\ndef add(a, b):\n    return a + b\n```\nThat adds two numbers.";
        let candidate = parse_response(raw, "add two numbers", 1).unwrap();

        assert!(candidate.code.contains("def add"));
        assert!(candidate.explanation.contains("adds two numbers"));
        assert_eq!(
            candidate.assumptions.as_deref(),
            Some("recovered from unstructured response")
        );
    }

    #[test]
    fn missing_code_is_a_parse_failure() {
        let raw = "I cannot help with that request.";
        assert!(parse_response(raw, "anything", 1).is_err());
    }

    #[test]
    fn empty_code_field_is_a_parse_failure() {
        let raw = r#"{"code": "   ", "explanation": "nothing"}"#;
        assert!(parse_response(raw, "anything", 1).is_err());
    }

    #[test]
    fn clean_code_strips_fences_and_blank_runs() {
        let dirty = "```python\nimport math\n\n\n\nprint(math.pi)\n```";
        assert_eq!(clean_code(dirty), "import math\n\nprint(math.pi)");
    }

    #[test]
    fn extract_imports_finds_both_forms() {
        let code = "import math\nfrom collections import Counter\nx = 1\n  import json";
        let imports = extract_imports(code);
        assert_eq!(
            imports,
            vec![
                "import math".to_string(),
                "from collections import Counter".to_string(),
                "import json".to_string(),
            ]
        );
    }

    #[test]
    fn declared_imports_merge_without_duplicates() {
        let raw = r#"{"code": "import math\nprint(1)", "imports": ["import math", "import numpy"]}"#;
        let candidate = parse_response(raw, "anything", 1).unwrap();
        assert_eq!(
            candidate.imports,
            vec!["import math".to_string(), "import numpy".to_string()]
        );
    }

    #[test]
    fn missing_explanation_is_synthesized() {
        let raw = r#"{"code": "x = 1"}"#;
        let candidate = parse_response(raw, "set x to one", 1).unwrap();
        assert!(candidate.explanation.contains("set x to one"));
    }
}
