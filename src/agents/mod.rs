mod openai;
mod prompt;

pub use openai::OpenAiVision;
pub use prompt::ESTIMATOR_PROMPT;

use async_trait::async_trait;
use thiserror::Error;

use crate::images::ValidatedImage;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("rate limited or out of quota: {0}")]
    RateLimited(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error("no text in model response")]
    EmptyResponse,
}

/// Text completion over one or more images.
#[async_trait]
pub trait VisionModel: Send + Sync {
    async fn complete(
        &self,
        images: &[ValidatedImage],
        prompt: &str,
        hint: Option<&str>,
    ) -> Result<String, AgentError>;

    fn model_name(&self) -> &str;
}
