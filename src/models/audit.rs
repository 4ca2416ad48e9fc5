use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::services::providers::GenerationPurpose;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    ScoreCandidate,
    RankCandidates,
    CompareCandidates,
    FairnessCheck,
}

/// Append-only record of an engine call. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub audit_id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    pub posting_id: String,
    pub candidate_ids: Vec<String>,
    pub filters: serde_json::Value,
    pub blind_mode: bool,
    pub result_hash: String,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        actor: &str,
        action: AuditAction,
        posting_id: &str,
        candidate_ids: Vec<String>,
        filters: serde_json::Value,
        blind_mode: bool,
        result_hash: String,
    ) -> Self {
        Self {
            audit_id: Uuid::new_v4(),
            actor: actor.to_string(),
            action,
            posting_id: posting_id.to_string(),
            candidate_ids,
            filters,
            blind_mode,
            result_hash,
            timestamp: Utc::now(),
        }
    }
}

/// One call to the text generator, kept whether or not it succeeded.
/// `response` is the raw provider text and is absent when nothing came back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationAttempt {
    pub attempt_id: Uuid,
    pub purpose: GenerationPurpose,
    pub resume_id: String,
    pub posting_id: String,
    pub prompt: String,
    pub response: Option<String>,
    pub model: String,
    pub error: Option<String>,
    pub attempted_at: DateTime<Utc>,
}

impl GenerationAttempt {
    pub fn new(purpose: GenerationPurpose, resume_id: &str, posting_id: &str, prompt: String, model: &str) -> Self {
        Self {
            attempt_id: Uuid::new_v4(),
            purpose,
            resume_id: resume_id.to_string(),
            posting_id: posting_id.to_string(),
            prompt,
            response: None,
            model: model.to_string(),
            error: None,
            attempted_at: Utc::now(),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FairnessMetric {
    Gini,
    DisparateImpact,
    StatisticalParity,
}

/// Outcome of one fairness check, linked to the audit record that triggered it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessReport {
    pub audit_id: Uuid,
    pub metric_type: FairnessMetric,
    pub value: f64,
    pub threshold: f64,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupStats {
    pub group: String,
    pub size: usize,
    pub mean_score: f64,
    pub selected: usize,
    pub selection_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessCheckResult {
    pub audit_id: Uuid,
    pub posting_id: String,
    pub candidates_evaluated: usize,
    pub top_k: usize,
    pub reports: Vec<FairnessReport>,
    pub groups: Vec<GroupStats>,
    pub failures: Vec<crate::models::CandidateFailure>,
}

impl FairnessCheckResult {
    pub fn passed(&self) -> bool {
        self.reports.iter().all(|r| r.passed)
    }
}
