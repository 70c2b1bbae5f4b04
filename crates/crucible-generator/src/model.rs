//! Completion model boundary
//!
//! The language-model call itself (provider, prompt templates, token
//! limits) is an external collaborator. The workflow sees only
//! `complete(payload) -> raw response text`.

use async_trait::async_trait;

/// Prompt payload sent to the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPayload {
    /// System instructions (role, context, output format)
    pub system: String,
    /// The user-turn content (request plus correction feedback)
    pub user: String,
}

impl PromptPayload {
    /// Create new payload
    #[inline]
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
        }
    }
}

/// Errors from the external model capability
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// The capability could not produce a response
    #[error("model call failed: {0}")]
    Failed(String),
}

/// Boundary to the external language-model capability
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Produce a raw completion for the payload
    async fn complete(&self, payload: PromptPayload) -> Result<String, ModelError>;
}
