use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

use crate::models::domain::ApplicationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillPresence {
    All,
    #[default]
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillFilter {
    pub skills: Vec<String>,
    #[serde(default)]
    pub mode: SkillPresence,
}

/// Filters applied to an already scored candidate set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingFilters {
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    #[serde(default)]
    pub skills: Option<SkillFilter>,
    /// Case-insensitive substring match on the candidate's location
    #[serde(default)]
    pub locations: Vec<String>,
    /// Keep candidates whose application (or resume, in discovery mode) dates
    /// from no more than this many days after the posting went up
    #[serde(default)]
    pub posted_within_days: Option<i64>,
    #[serde(default)]
    pub min_experience_years: Option<f64>,
    #[serde(default)]
    pub max_experience_years: Option<f64>,
    /// Minimum degree, e.g. "Bachelor"
    #[serde(default)]
    pub min_education: Option<String>,
    #[serde(default)]
    pub application_statuses: Vec<ApplicationStatus>,
    #[serde(default)]
    pub exclude_flagged: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Score,
    Date,
    Title,
    Experience,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortSpec {
    #[serde(default)]
    pub key: SortKey,
    #[serde(default)]
    pub order: SortOrder,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// 1-based page selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[validate(range(min = 1))]
    #[serde(default = "default_page")]
    pub page: u32,
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RankingMode {
    /// Every resume on file
    #[default]
    Discovery,
    /// Only candidates who applied, optionally scoring their tailored resume
    ApplicantsOnly {
        #[serde(default, rename = "useTailored")]
        use_tailored: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostingSortKey {
    #[default]
    Score,
    Date,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PostingSort {
    #[serde(default)]
    pub key: PostingSortKey,
    #[serde(default)]
    pub order: SortOrder,
}

/// Filters over the postings scored for one candidate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingFilters {
    #[serde(default)]
    pub min_score: Option<f64>,
    #[serde(default)]
    pub max_score: Option<f64>,
    /// Keep postings that require at least one of these skills
    #[serde(default)]
    pub skills: Vec<String>,
    /// Case-insensitive substring match on the posting location
    #[serde(default)]
    pub location: Option<String>,
    /// Keep postings that went up no more than this many days ago
    #[serde(default)]
    pub posted_within_days: Option<i64>,
}

/// Request to rank postings for one resume
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostingSearch {
    #[serde(default)]
    pub filters: PostingFilters,
    #[serde(default)]
    pub sort: PostingSort,
    #[validate(nested)]
    #[serde(default)]
    pub pagination: Pagination,
}

fn default_actor() -> String {
    "system".to_string()
}

/// Request to rank candidates for a posting
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RankRequest {
    #[serde(default)]
    pub filters: RankingFilters,
    #[serde(default)]
    pub sort: SortSpec,
    #[validate(nested)]
    #[serde(default)]
    pub pagination: Pagination,
    #[serde(default)]
    pub mode: RankingMode,
    #[serde(default)]
    pub generate_recommendations: bool,
    #[serde(default)]
    pub blind_mode: bool,
    #[validate(length(min = 1))]
    #[serde(default = "default_actor")]
    pub actor: String,
}

impl Default for RankRequest {
    fn default() -> Self {
        Self {
            filters: RankingFilters::default(),
            sort: SortSpec::default(),
            pagination: Pagination::default(),
            mode: RankingMode::default(),
            generate_recommendations: false,
            blind_mode: false,
            actor: default_actor(),
        }
    }
}

/// Group membership for fairness metrics. Only used when `consent` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAttribute {
    pub name: String,
    #[serde(default)]
    pub consent: bool,
    /// candidate id -> group label
    pub groups: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FairnessRequest {
    #[validate(length(min = 1))]
    pub candidate_ids: Vec<String>,
    #[serde(default)]
    pub group_attribute: Option<GroupAttribute>,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default = "default_actor")]
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareQuery {
    pub a: String,
    pub b: String,
    #[serde(default = "default_actor")]
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplanationQuery {
    #[serde(default)]
    pub blind: bool,
    #[serde(default)]
    pub recommendation: bool,
    #[serde(default = "default_actor")]
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ExtractSkillsRequest {
    #[validate(length(min = 1, max = 20000))]
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_request_defaults() {
        let request: RankRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.pagination.page, 1);
        assert_eq!(request.pagination.page_size, 20);
        assert_eq!(request.mode, RankingMode::Discovery);
        assert_eq!(request.sort.key, SortKey::Score);
        assert_eq!(request.sort.order, SortOrder::Desc);
        assert_eq!(request.actor, "system");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_page_size_capped() {
        let request: RankRequest =
            serde_json::from_str(r#"{"pagination": {"page": 1, "pageSize": 500}}"#).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_applicants_mode_parses() {
        let request: RankRequest =
            serde_json::from_str(r#"{"mode": {"type": "applicants_only", "useTailored": true}}"#).unwrap();
        assert_eq!(request.mode, RankingMode::ApplicantsOnly { use_tailored: true });
    }
}
