//! Prompt assembly
//!
//! Builds the prompt payload from the request, the retrieved context, and
//! the most recent failure. The failure section carries the specific
//! verdict detail so a correction attempt targets the actual defect
//! instead of retrying blindly.

use crate::model::PromptPayload;
use crucible_retrieval::RetrievedContext;
use crucible_solution::{PriorFailure, Request, ValidationVerdict};

const SYSTEM_TEMPLATE: &str = "\
You are an expert programmer. Generate clean, efficient, runnable code.

Rules:
1. Include ALL necessary import statements at the top.
2. Write complete code with proper error handling.
3. Make reasonable assumptions if requirements are unclear.

Respond with a JSON object of the shape:
{\"code\": \"...\", \"explanation\": \"...\", \"imports\": [\"...\"], \"assumptions\": \"...\"}

Reference documentation:
";

/// Build the full prompt payload for one generation attempt
#[must_use]
pub fn build_payload(
    request: &Request,
    context: &RetrievedContext,
    prior: Option<&PriorFailure>,
) -> PromptPayload {
    let system = format!("{SYSTEM_TEMPLATE}{}", context.format_for_prompt());

    let mut user = format!(
        "Write {} code for the following request:\n\n{}",
        request.target_language().name(),
        request.description
    );

    if let Some(failure) = prior {
        user.push_str("\n\n");
        user.push_str(&render_failure(failure));
    }

    PromptPayload::new(system, user)
}

/// Render the most recent failure into correction feedback
fn render_failure(failure: &PriorFailure) -> String {
    match failure {
        PriorFailure::Rejected { solution, verdict } => {
            let mut out = format!(
                "Your previous attempt failed validation ({}).\n",
                verdict.summary()
            );
            match verdict {
                ValidationVerdict::RuntimeError { traceback, .. } if !traceback.is_empty() => {
                    out.push_str(&format!("Traceback:\n{traceback}\n"));
                }
                ValidationVerdict::PolicyViolation { rule } => {
                    out.push_str(&format!(
                        "Do not use what the rule forbids: {rule}. \
                         Solve the task with allowed modules only.\n"
                    ));
                }
                ValidationVerdict::Timeout => {
                    out.push_str("The code ran past the execution time limit; avoid unbounded loops and long sleeps.\n");
                }
                _ => {}
            }
            out.push_str(&format!(
                "Failed code:\n```\n{}\n```\nFix the specific problem above and return the corrected solution.",
                solution.code.trim()
            ));
            out
        }
        PriorFailure::Unparseable { detail } => format!(
            "Your previous response could not be parsed into a solution ({detail}). \
             Respond again with exactly the JSON object described in the instructions."
        ),
    }
}
