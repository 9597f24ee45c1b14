//! LLM completion providers that turn a rendered prompt into an answer.
//!
//! Answer generation is a separate failure domain from retrieval: a failed
//! completion call yields [`SearchError::Generation`] while the reranked
//! chunks that produced the prompt remain valid and displayable.

mod azure;
mod openai;

pub use azure::AzureOpenAiProvider;
pub use openai::OpenAiProvider;

use crate::error::SearchError;

/// Request envelope shared by the providers.
pub struct CompletionRequest<'a> {
    /// Fully rendered prompt text.
    pub prompt: &'a str,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to request from the completion model.
    pub max_tokens: usize,
}

/// Trait implemented by concrete completion providers.
pub trait AnswerProvider {
    /// Generates an answer for the rendered prompt.
    fn answer(&self, request: &CompletionRequest) -> Result<String, SearchError>;
}
