use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Application, AuditRecord, FairnessReport, GenerationAttempt, MatchExplanation,
    PostingRequirements, ResumeProfile, StoredEmbedding,
};

/// Errors raised by repository backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingSubject {
    Resume,
    Posting,
}

impl EmbeddingSubject {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingSubject::Resume => "resume",
            EmbeddingSubject::Posting => "posting",
        }
    }
}

/// Read/write access to resumes, postings and applications
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get_resume(&self, resume_id: &str) -> Result<Option<ResumeProfile>, StoreError>;

    async fn put_resume(&self, resume: ResumeProfile) -> Result<(), StoreError>;

    async fn list_resumes(&self) -> Result<Vec<ResumeProfile>, StoreError>;

    async fn get_posting(&self, posting_id: &str) -> Result<Option<PostingRequirements>, StoreError>;

    async fn list_postings(&self) -> Result<Vec<PostingRequirements>, StoreError>;

    /// Rejects postings that fail configuration-time validation
    async fn put_posting(&self, posting: PostingRequirements) -> Result<(), StoreError>;

    async fn put_application(&self, application: Application) -> Result<(), StoreError>;

    async fn list_applications(&self, posting_id: &str) -> Result<Vec<Application>, StoreError>;
}

/// Vector store. Entries carry the content hash they were computed from.
#[async_trait]
pub trait EmbeddingRepository: Send + Sync {
    async fn get_embedding(
        &self,
        subject: EmbeddingSubject,
        id: &str,
    ) -> Result<Option<StoredEmbedding>, StoreError>;

    async fn put_embedding(
        &self,
        subject: EmbeddingSubject,
        id: &str,
        embedding: StoredEmbedding,
    ) -> Result<(), StoreError>;
}

/// Append-only sink for audit records and fairness reports
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn append_audit(&self, record: AuditRecord) -> Result<(), StoreError>;

    async fn append_fairness(&self, reports: Vec<FairnessReport>) -> Result<(), StoreError>;

    async fn audit_trail(&self, posting_id: &str) -> Result<Vec<AuditRecord>, StoreError>;

    async fn fairness_reports(&self, audit_id: Uuid) -> Result<Vec<FairnessReport>, StoreError>;
}

/// Write side for computed explanations and every generation attempt
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Latest explanation per (posting, resume, blind mode) replaces the previous one
    async fn put_explanation(&self, explanation: MatchExplanation) -> Result<(), StoreError>;

    async fn get_explanation(
        &self,
        posting_id: &str,
        resume_id: &str,
        blind_mode: bool,
    ) -> Result<Option<MatchExplanation>, StoreError>;

    async fn append_generation(&self, attempt: GenerationAttempt) -> Result<(), StoreError>;

    async fn generation_attempts(
        &self,
        posting_id: &str,
        resume_id: &str,
    ) -> Result<Vec<GenerationAttempt>, StoreError>;
}

#[derive(Default)]
struct Tables {
    resumes: BTreeMap<String, ResumeProfile>,
    postings: BTreeMap<String, PostingRequirements>,
    /// keyed by (posting, candidate)
    applications: BTreeMap<(String, String), Application>,
    embeddings: BTreeMap<(EmbeddingSubject, String), StoredEmbedding>,
    audit: Vec<AuditRecord>,
    fairness: Vec<FairnessReport>,
    /// keyed by (posting, resume, blind mode)
    explanations: BTreeMap<(String, String, bool), MatchExplanation>,
    generations: Vec<GenerationAttempt>,
}

/// In-process store backing every repository
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn get_resume(&self, resume_id: &str) -> Result<Option<ResumeProfile>, StoreError> {
        Ok(self.tables.read().await.resumes.get(resume_id).cloned())
    }

    async fn put_resume(&self, resume: ResumeProfile) -> Result<(), StoreError> {
        if resume.resume_id.trim().is_empty() || resume.candidate_id.trim().is_empty() {
            return Err(StoreError::InvalidInput("resume and candidate ids are required".into()));
        }
        tracing::debug!("Storing resume {} for candidate {}", resume.resume_id, resume.candidate_id);
        self.tables
            .write()
            .await
            .resumes
            .insert(resume.resume_id.clone(), resume);
        Ok(())
    }

    async fn list_resumes(&self) -> Result<Vec<ResumeProfile>, StoreError> {
        Ok(self.tables.read().await.resumes.values().cloned().collect())
    }

    async fn get_posting(&self, posting_id: &str) -> Result<Option<PostingRequirements>, StoreError> {
        Ok(self.tables.read().await.postings.get(posting_id).cloned())
    }

    async fn list_postings(&self) -> Result<Vec<PostingRequirements>, StoreError> {
        Ok(self.tables.read().await.postings.values().cloned().collect())
    }

    async fn put_posting(&self, posting: PostingRequirements) -> Result<(), StoreError> {
        posting
            .check()
            .map_err(|e| StoreError::InvalidInput(e.to_string()))?;
        tracing::debug!("Storing posting {}", posting.posting_id);
        self.tables
            .write()
            .await
            .postings
            .insert(posting.posting_id.clone(), posting);
        Ok(())
    }

    async fn put_application(&self, application: Application) -> Result<(), StoreError> {
        let key = (application.posting_id.clone(), application.candidate_id.clone());
        self.tables.write().await.applications.insert(key, application);
        Ok(())
    }

    async fn list_applications(&self, posting_id: &str) -> Result<Vec<Application>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .applications
            .values()
            .filter(|a| a.posting_id == posting_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl EmbeddingRepository for InMemoryStore {
    async fn get_embedding(
        &self,
        subject: EmbeddingSubject,
        id: &str,
    ) -> Result<Option<StoredEmbedding>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .embeddings
            .get(&(subject, id.to_string()))
            .cloned())
    }

    async fn put_embedding(
        &self,
        subject: EmbeddingSubject,
        id: &str,
        embedding: StoredEmbedding,
    ) -> Result<(), StoreError> {
        if embedding.vector.is_empty() {
            return Err(StoreError::InvalidInput(format!("empty embedding for {} {}", subject.as_str(), id)));
        }
        self.tables
            .write()
            .await
            .embeddings
            .insert((subject, id.to_string()), embedding);
        Ok(())
    }
}

#[async_trait]
impl AuditRepository for InMemoryStore {
    async fn append_audit(&self, record: AuditRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.audit.iter().any(|r| r.audit_id == record.audit_id) {
            return Err(StoreError::InvalidInput(format!(
                "audit record {} already exists",
                record.audit_id
            )));
        }
        tables.audit.push(record);
        Ok(())
    }

    async fn append_fairness(&self, reports: Vec<FairnessReport>) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        for report in &reports {
            if !tables.audit.iter().any(|r| r.audit_id == report.audit_id) {
                return Err(StoreError::NotFound(format!("audit record {}", report.audit_id)));
            }
        }
        tables.fairness.extend(reports);
        Ok(())
    }

    async fn audit_trail(&self, posting_id: &str) -> Result<Vec<AuditRecord>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .audit
            .iter()
            .filter(|r| r.posting_id == posting_id)
            .cloned()
            .collect())
    }

    async fn fairness_reports(&self, audit_id: Uuid) -> Result<Vec<FairnessReport>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .fairness
            .iter()
            .filter(|r| r.audit_id == audit_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResultRepository for InMemoryStore {
    async fn put_explanation(&self, explanation: MatchExplanation) -> Result<(), StoreError> {
        let key = (
            explanation.posting_id.clone(),
            explanation.resume_id.clone(),
            explanation.provenance.blind_mode,
        );
        self.tables.write().await.explanations.insert(key, explanation);
        Ok(())
    }

    async fn get_explanation(
        &self,
        posting_id: &str,
        resume_id: &str,
        blind_mode: bool,
    ) -> Result<Option<MatchExplanation>, StoreError> {
        let key = (posting_id.to_string(), resume_id.to_string(), blind_mode);
        Ok(self.tables.read().await.explanations.get(&key).cloned())
    }

    async fn append_generation(&self, attempt: GenerationAttempt) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.generations.iter().any(|a| a.attempt_id == attempt.attempt_id) {
            return Err(StoreError::InvalidInput(format!(
                "generation attempt {} already exists",
                attempt.attempt_id
            )));
        }
        tables.generations.push(attempt);
        Ok(())
    }

    async fn generation_attempts(
        &self,
        posting_id: &str,
        resume_id: &str,
    ) -> Result<Vec<GenerationAttempt>, StoreError> {
        Ok(self
            .tables
            .read()
            .await
            .generations
            .iter()
            .filter(|a| a.posting_id == posting_id && a.resume_id == resume_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AuditAction, FairnessMetric, RubricWeights};

    fn posting(weights: RubricWeights) -> PostingRequirements {
        let mut posting: PostingRequirements = serde_json::from_value(serde_json::json!({
            "postingId": "p1",
            "title": "Data Intern",
            "postedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        posting.rubric_weights = weights;
        posting
    }

    #[tokio::test]
    async fn test_put_posting_rejects_bad_rubric() {
        let store = InMemoryStore::new();
        let bad = RubricWeights {
            semantic: 0.5,
            ..Default::default()
        };
        let result = store.put_posting(posting(bad)).await;
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
        assert!(store.get_posting("p1").await.unwrap().is_none());

        store.put_posting(posting(RubricWeights::default())).await.unwrap();
        assert!(store.get_posting("p1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_audit_is_append_only() {
        let store = InMemoryStore::new();
        let record = AuditRecord::new(
            "tester",
            AuditAction::RankCandidates,
            "p1",
            vec!["c1".to_string()],
            serde_json::Value::Null,
            false,
            "hash".to_string(),
        );
        store.append_audit(record.clone()).await.unwrap();
        assert!(store.append_audit(record.clone()).await.is_err());

        let report = FairnessReport {
            audit_id: record.audit_id,
            metric_type: FairnessMetric::Gini,
            value: 0.1,
            threshold: 0.4,
            passed: true,
        };
        store.append_fairness(vec![report]).await.unwrap();
        assert_eq!(store.fairness_reports(record.audit_id).await.unwrap().len(), 1);
        assert_eq!(store.audit_trail("p1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generation_attempts_kept_per_pair() {
        use crate::services::providers::GenerationPurpose;

        let store = InMemoryStore::new();
        let mut failed = GenerationAttempt::new(
            GenerationPurpose::Recommendation,
            "r1",
            "p1",
            "prompt".to_string(),
            "gen-model",
        );
        failed.response = Some("not json".to_string());
        failed.error = Some("schema validation failed".to_string());
        store.append_generation(failed.clone()).await.unwrap();
        assert!(store.append_generation(failed.clone()).await.is_err());

        store
            .append_generation(GenerationAttempt::new(
                GenerationPurpose::Recommendation,
                "r2",
                "p1",
                "other".to_string(),
                "gen-model",
            ))
            .await
            .unwrap();

        let attempts = store.generation_attempts("p1", "r1").await.unwrap();
        assert_eq!(attempts, vec![failed]);
        assert!(!attempts[0].succeeded());
    }

    #[tokio::test]
    async fn test_fairness_requires_audit_record() {
        let store = InMemoryStore::new();
        let report = FairnessReport {
            audit_id: Uuid::new_v4(),
            metric_type: FairnessMetric::Gini,
            value: 0.1,
            threshold: 0.4,
            passed: true,
        };
        assert!(matches!(
            store.append_fairness(vec![report]).await,
            Err(StoreError::NotFound(_))
        ));
    }
}
