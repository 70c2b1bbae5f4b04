//! Request types
//!
//! A request is the immutable input to one workflow run: a natural-language
//! task description plus an optional target-language tag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unique request identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Ulid);

impl RequestId {
    /// Generate new request ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Target languages for generated code
///
/// Closed set; only Python is wired through the sandbox today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetLanguage {
    /// Python 3
    Python,
}

impl TargetLanguage {
    /// Get file extensions for this language
    #[inline]
    #[must_use]
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            TargetLanguage::Python => &["py"],
        }
    }

    /// Get human-readable name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            TargetLanguage::Python => "python",
        }
    }
}

impl Default for TargetLanguage {
    fn default() -> Self {
        TargetLanguage::Python
    }
}

/// A code-generation request (natural language input)
///
/// Immutable once accepted; one workflow run per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Request identifier
    pub id: RequestId,
    /// Natural language task description
    pub description: String,
    /// Optional target language tag
    pub language: Option<TargetLanguage>,
    /// When the request was accepted
    pub created_at: DateTime<Utc>,
}

impl Request {
    /// Create new request
    #[inline]
    #[must_use]
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            id: RequestId::new(),
            description: description.into(),
            language: None,
            created_at: Utc::now(),
        }
    }

    /// With target language
    #[inline]
    #[must_use]
    pub fn with_language(mut self, language: TargetLanguage) -> Self {
        self.language = Some(language);
        self
    }

    /// Effective target language (defaults to Python)
    #[inline]
    #[must_use]
    pub fn target_language(&self) -> TargetLanguage {
        self.language.unwrap_or_default()
    }
}
