use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::core::fingerprint::hash_parts;
use crate::models::MatchExplanation;

/// Errors that can occur with cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache invalidation failed: {0}")]
    Invalidation(String),
}

/// Everything an explanation depends on. Two equal keys always produce the
/// same explanation, so entries never expire on time alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub resume_id: String,
    pub posting_id: String,
    pub resume_hash: String,
    pub posting_hash: String,
    pub taxonomy_version: String,
    pub config_fingerprint: String,
    pub blind_mode: bool,
    pub with_recommendation: bool,
}

impl CacheKey {
    pub fn digest(&self) -> String {
        hash_parts(&[
            self.resume_hash.as_str(),
            self.posting_hash.as_str(),
            self.taxonomy_version.as_str(),
            self.config_fingerprint.as_str(),
            if self.blind_mode { "blind" } else { "open" },
            if self.with_recommendation { "ai" } else { "plain" },
        ])
    }
}

#[derive(Clone)]
struct Entry {
    resume_id: String,
    posting_id: String,
    explanation: Arc<MatchExplanation>,
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub capacity: u64,
}

/// Content-addressed cache of computed explanations
pub struct ExplanationCache {
    inner: Cache<String, Entry>,
    capacity: u64,
}

impl ExplanationCache {
    pub fn new(capacity: u64) -> Self {
        let inner = moka::future::CacheBuilder::new(capacity)
            .support_invalidation_closures()
            .build();
        Self { inner, capacity }
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<MatchExplanation>> {
        let hit = self.inner.get(&key.digest()).await.map(|e| e.explanation);
        if hit.is_some() {
            tracing::trace!("Explanation cache hit: {}/{}", key.posting_id, key.resume_id);
        }
        hit
    }

    pub async fn insert(&self, key: &CacheKey, explanation: Arc<MatchExplanation>) {
        let entry = Entry {
            resume_id: key.resume_id.clone(),
            posting_id: key.posting_id.clone(),
            explanation,
        };
        self.inner.insert(key.digest(), entry).await;
    }

    /// Drop every explanation computed for a posting
    pub fn invalidate_posting(&self, posting_id: &str) -> Result<(), CacheError> {
        let posting_id = posting_id.to_string();
        tracing::debug!("Invalidating cached explanations for posting {}", posting_id);
        self.inner
            .invalidate_entries_if(move |_, entry| entry.posting_id == posting_id)
            .map(|_| ())
            .map_err(|e| CacheError::Invalidation(e.to_string()))
    }

    /// Drop every explanation computed from a resume
    pub fn invalidate_resume(&self, resume_id: &str) -> Result<(), CacheError> {
        let resume_id = resume_id.to_string();
        tracing::debug!("Invalidating cached explanations for resume {}", resume_id);
        self.inner
            .invalidate_entries_if(move |_, entry| entry.resume_id == resume_id)
            .map(|_| ())
            .map_err(|e| CacheError::Invalidation(e.to_string()))
    }

    pub fn invalidate_all(&self) {
        self.inner.invalidate_all();
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.run_pending_tasks().await;
        CacheStats {
            entries: self.inner.entry_count(),
            capacity: self.capacity,
        }
    }
}
