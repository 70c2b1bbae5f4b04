//! Retrieved context
//!
//! The ordered, immutable passage set produced once per request.

use serde::{Deserialize, Serialize};

/// Identifier of the document a passage came from
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId(pub String);

impl SourceId {
    /// Create new source ID
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The underlying identifier
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One retrieved passage with its relevance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Passage text
    pub text: String,
    /// Source document identifier
    pub source: SourceId,
    /// Relevance score (higher is more relevant)
    pub score: f32,
}

impl Passage {
    /// Create new passage
    #[inline]
    #[must_use]
    pub fn new(text: impl Into<String>, source: impl Into<String>, score: f32) -> Self {
        Self {
            text: text.into(),
            source: SourceId::new(source),
            score,
        }
    }
}

/// How the context for a request was obtained
///
/// Diagnostic only; none of these variants is fatal to the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContextOrigin {
    /// Passages came from the index
    Index,
    /// The index holds no passages
    EmptyIndex,
    /// The backing store could not be reached
    IndexUnavailable,
    /// The search did not return within the retrieval timeout
    TimedOut,
}

/// Ordered sequence of retrieved passages for one request
///
/// Ordering is by descending relevance score, ties broken by ascending
/// source identifier, so retrieval is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedContext {
    /// Passages in rank order
    pub passages: Vec<Passage>,
    /// How this context was obtained
    pub origin: ContextOrigin,
}

impl RetrievedContext {
    /// Create context from unranked passages, imposing the rank order
    #[must_use]
    pub fn ranked(mut passages: Vec<Passage>) -> Self {
        passages.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.source.cmp(&b.source))
        });
        let origin = if passages.is_empty() {
            ContextOrigin::EmptyIndex
        } else {
            ContextOrigin::Index
        };
        Self { passages, origin }
    }

    /// Create empty context with the given origin
    #[inline]
    #[must_use]
    pub fn empty(origin: ContextOrigin) -> Self {
        Self {
            passages: Vec::new(),
            origin,
        }
    }

    /// Whether any passages were retrieved
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Number of passages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.passages.len()
    }

    /// Render the passages for inclusion in a generation prompt
    #[must_use]
    pub fn format_for_prompt(&self) -> String {
        if self.passages.is_empty() {
            return "No relevant documentation found.".to_string();
        }

        let mut out = String::new();
        for (i, passage) in self.passages.iter().enumerate() {
            out.push_str(&format!(
                "[{} | {} | relevance {:.3}]\n{}\n\n",
                i + 1,
                passage.source,
                passage.score,
                passage.text.trim()
            ));
        }
        out.trim_end().to_string()
    }
}
