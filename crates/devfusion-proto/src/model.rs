//! Hosted language model seam.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the language model backend.
#[derive(Debug, Error)]
pub enum ModelError {
    /// No API key could be resolved for the backend.
    #[error("Gemini API key is not configured.")]
    MissingApiKey,

    #[error("AI request failed: {0}")]
    Network(String),

    /// Backend returned an error status; `message` is the backend's own text.
    #[error("{message}")]
    Api { status: u16, message: String },

    /// Response carried no candidate text.
    #[error("No content received from AI.")]
    EmptyResponse,

    #[error("malformed AI response: {0}")]
    Malformed(String),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Single-shot text generation.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends a prompt and returns the model's raw text.
    async fn generate(&self, prompt: &str) -> ModelResult<String>;
}
