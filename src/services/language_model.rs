use async_trait::async_trait;

use crate::error::SynthesisError;

#[async_trait]
pub trait LanguageModelService: Send + Sync {
    /// Model identifier, part of the draft cache key.
    fn model_name(&self) -> &str;

    /// Sends one prompt and returns the raw text payload of the reply.
    async fn complete(&self, prompt: &str) -> Result<String, SynthesisError>;
}
