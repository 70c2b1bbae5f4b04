//! Vector index boundary
//!
//! The backing store is an external collaborator; the workflow sees it only
//! as `search(query, top_k) -> ranked passages`. `InMemoryIndex` is the
//! in-process reference implementation: deterministic term-frequency cosine
//! scoring over seeded passages, immutable after construction.

use crate::context::Passage;
use async_trait::async_trait;
use std::collections::HashMap;

/// Errors from the vector index boundary
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The backing store cannot be reached
    #[error("index unavailable: {0}")]
    Unavailable(String),

    /// The index holds no passages
    #[error("index is empty")]
    Empty,
}

/// Boundary to the vector index backing store
///
/// Read-only and idempotent: identical queries against an unchanged index
/// must return identical ordered results.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Search for the `top_k` most relevant passages
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, IndexError>;
}

/// Seeded in-memory index with term-frequency cosine scoring
///
/// Built once at startup from `(source, text)` pairs and treated as
/// process-wide immutable state, passed into the retriever explicitly.
#[derive(Debug)]
pub struct InMemoryIndex {
    entries: Vec<IndexEntry>,
}

#[derive(Debug)]
struct IndexEntry {
    source: String,
    text: String,
    terms: HashMap<String, f32>,
    norm: f32,
}

impl InMemoryIndex {
    /// Build index from `(source, passage text)` pairs
    #[must_use]
    pub fn seeded<S, T>(passages: impl IntoIterator<Item = (S, T)>) -> Self
    where
        S: Into<String>,
        T: Into<String>,
    {
        let entries = passages
            .into_iter()
            .map(|(source, text)| {
                let text = text.into();
                let terms = term_frequencies(&text);
                let norm = vector_norm(&terms);
                IndexEntry {
                    source: source.into(),
                    text,
                    terms,
                    norm,
                }
            })
            .collect();
        Self { entries }
    }

    /// Create empty index
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of indexed passages
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no passages
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<Passage>, IndexError> {
        if self.entries.is_empty() {
            return Err(IndexError::Empty);
        }

        let query_terms = term_frequencies(query);
        let query_norm = vector_norm(&query_terms);

        let mut scored: Vec<Passage> = self
            .entries
            .iter()
            .map(|entry| {
                let score = cosine_similarity(&query_terms, query_norm, &entry.terms, entry.norm);
                Passage::new(entry.text.clone(), entry.source.clone(), score)
            })
            .collect();

        // Rank order: score desc, source asc for deterministic ties
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.source.cmp(&b.source))
        });
        scored.truncate(top_k);

        Ok(scored)
    }
}

/// Lowercased alphanumeric term counts
fn term_frequencies(text: &str) -> HashMap<String, f32> {
    let mut counts: HashMap<String, f32> = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 1)
    {
        *counts.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    counts
}

fn vector_norm(terms: &HashMap<String, f32>) -> f32 {
    terms.values().map(|v| v * v).sum::<f32>().sqrt()
}

fn cosine_similarity(
    a: &HashMap<String, f32>,
    a_norm: f32,
    b: &HashMap<String, f32>,
    b_norm: f32,
) -> f32 {
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = a
        .iter()
        .filter_map(|(term, weight)| b.get(term).map(|other| weight * other))
        .sum();
    dot / (a_norm * b_norm)
}
