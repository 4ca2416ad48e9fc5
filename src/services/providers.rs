use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from embedding and text-generation backends
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("unauthorized: invalid API key")]
    Unauthorized,

    #[error("rate limited")]
    RateLimited,

    #[error("invalid response format: {0}")]
    InvalidResponse(String),

    #[error("no API key available for {0:?}")]
    NoKeyAvailable(GenerationPurpose),
}

impl ProviderError {
    /// Whether a different key might succeed where this one failed
    pub fn is_key_failure(&self) -> bool {
        match self {
            ProviderError::Unauthorized | ProviderError::RateLimited => true,
            ProviderError::Api { status, .. } => *status == 403 || *status == 429,
            _ => false,
        }
    }
}

/// What a generation call is for. Key selection is done per purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPurpose {
    Recommendation,
    SkillExtraction,
    Embedding,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub purpose: GenerationPurpose,
    /// JSON schema the response must satisfy
    pub schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    pub model: String,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;

    fn model_id(&self) -> &str;
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError>;

    fn model_id(&self) -> &str;
}
