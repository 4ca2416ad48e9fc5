// Service exports
pub mod cache;
pub mod gemini;
pub mod keys;
pub mod providers;
pub mod store;

pub use cache::{CacheError, CacheKey, CacheStats, ExplanationCache};
pub use gemini::{GeminiClient, GeminiSettings};
pub use keys::{ApiKey, KeyRing, KeySelectionPolicy};
pub use providers::{
    Embedder, GenerationPurpose, GenerationRequest, GenerationResponse, ProviderError,
    TextGenerator,
};
pub use store::{
    AuditRepository, EmbeddingRepository, EmbeddingSubject, InMemoryStore, ProfileRepository,
    ResultRepository, StoreError,
};
