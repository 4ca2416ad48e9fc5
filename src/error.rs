use std::time::Duration;
use thiserror::Error;

use crate::services::providers::ProviderError;
use crate::services::store::StoreError;

/// Errors raised by the scoring and explanation engine
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("missing embedding for {subject} {id}")]
    MissingEmbedding { subject: &'static str, id: String },

    #[error("invalid embedding: {0}")]
    InvalidEmbedding(String),

    #[error("rubric weights must be non-negative and sum to 1.0 (got {sum})")]
    InvalidRubric { sum: f64 },

    #[error("invalid posting: {0}")]
    InvalidPosting(String),

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("stale data for {subject} {id}: stored hash {stored} does not match current {current}")]
    StaleData {
        subject: &'static str,
        id: String,
        stored: String,
        current: String,
    },

    #[error("provider timed out after {after:?}")]
    ProviderTimeout { after: Duration },

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("no evidence found for skill {skill}")]
    MissingEvidence { skill: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("explanations belong to different postings ({left} vs {right})")]
    PostingMismatch { left: String, right: String },

    #[error("group attribute {attribute} requires explicit consent")]
    ConsentRequired { attribute: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl EngineError {
    /// Stable machine-readable name, used in batch failure reports and HTTP bodies
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::MissingEmbedding { .. } => "missing_embedding",
            EngineError::InvalidEmbedding(_) => "invalid_embedding",
            EngineError::InvalidRubric { .. } => "invalid_rubric",
            EngineError::InvalidPosting(_) => "invalid_posting",
            EngineError::SchemaValidation(_) => "schema_validation",
            EngineError::StaleData { .. } => "stale_data",
            EngineError::ProviderTimeout { .. } => "provider_timeout",
            EngineError::Provider(_) => "provider",
            EngineError::MissingEvidence { .. } => "missing_evidence",
            EngineError::NotFound(_) => "not_found",
            EngineError::PostingMismatch { .. } => "posting_mismatch",
            EngineError::ConsentRequired { .. } => "consent_required",
            EngineError::InvalidRequest(_) => "invalid_request",
            EngineError::Storage(_) => "storage",
        }
    }
}
