use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::explanation::{ComponentScores, MatchExplanation, Recommendation};

/// A candidate that could not be scored in a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFailure {
    pub candidate_id: String,
    pub resume_id: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    SameMobile,
    SameLinkedin,
    SameGithub,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateFlag {
    pub reason: FlagReason,
    pub matched_candidate_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedCandidate {
    pub rank: usize,
    pub candidate_id: String,
    pub resume_id: String,
    pub used_tailored_resume: bool,
    pub overall_score: f64,
    pub recommendation: Recommendation,
    pub short_reason: String,
    pub is_flagged: bool,
    pub flags: Vec<DuplicateFlag>,
    pub explanation: MatchExplanation,
}

/// Response for rank candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingResult {
    pub posting_id: String,
    pub results: Vec<RankedCandidate>,
    pub total_before_filter: usize,
    pub total_after_filter: usize,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub audit_id: Uuid,
    pub failures: Vec<CandidateFailure>,
}

/// A posting that could not be scored for the candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingFailure {
    pub posting_id: String,
    pub kind: String,
    pub message: String,
}

/// One posting scored for a candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingMatch {
    pub rank: usize,
    pub posting_id: String,
    pub title: String,
    pub company: String,
    pub location: Option<String>,
    pub posted_at: DateTime<Utc>,
    /// Canonical required skills
    pub required_skills: Vec<String>,
    pub overall_score: f64,
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub component_scores: ComponentScores,
    pub summary: String,
}

/// Response for recommend postings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingRecommendations {
    pub resume_id: String,
    pub candidate_id: String,
    pub results: Vec<PostingMatch>,
    pub total_before_filter: usize,
    pub total_after_filter: usize,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
    pub failures: Vec<PostingFailure>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub taxonomy_version: String,
    pub cached_explanations: u64,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
