use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::core::fingerprint::content_hash;
use crate::error::EngineError;

const DAYS_PER_YEAR: f64 = 365.25;
const RUBRIC_TOLERANCE: f64 = 1e-6;

/// Skill category in the taxonomy. Unresolved terms are `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillCategory {
    Tech,
    Soft,
    Other,
}

/// Canonical skill reference data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillEntry {
    pub name: String,
    pub category: SkillCategory,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Aliases that are ordinary words in prose ("rest", "spring"). They
    /// resolve in skill lists but never count as mentions in evidence text.
    #[serde(default)]
    pub list_only_aliases: Vec<String>,
}

/// Identity-correlated fields. Scoring never reads these; blind mode strips them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateIdentity {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    #[serde(default)]
    pub github_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkExperience {
    pub title: String,
    pub company: String,
    #[serde(default)]
    pub start: Option<NaiveDate>,
    /// `None` means the role is ongoing as of the resume's `parsed_at` date
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub skills_used: Vec<String>,
    #[serde(default)]
    pub evidence_text: String,
}

impl WorkExperience {
    /// A role counts as dated when its start is known
    pub fn is_dated(&self) -> bool {
        self.start.is_some()
    }

    /// Role duration in years. Undated or inverted ranges contribute nothing.
    pub fn duration_years(&self, as_of: NaiveDate) -> f64 {
        let Some(start) = self.start else {
            return 0.0;
        };
        let end = self.end.unwrap_or(as_of);
        if end <= start {
            return 0.0;
        }
        (end - start).num_days() as f64 / DAYS_PER_YEAR
    }

    pub fn evidence_snippet(&self) -> String {
        let text = self.evidence_text.trim();
        if text.is_empty() {
            format!("{} at {}", self.title, self.company)
        } else {
            text.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub title: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub evidence_text: String,
}

impl Project {
    pub fn evidence_snippet(&self) -> String {
        let text = self.evidence_text.trim();
        if text.is_empty() {
            self.title.clone()
        } else {
            text.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub degree: String,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub field: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certification {
    pub name: String,
    #[serde(default)]
    pub issuer: Option<String>,
    #[serde(default)]
    pub evidence_text: String,
}

impl Certification {
    pub fn evidence_snippet(&self) -> String {
        let text = self.evidence_text.trim();
        match (text.is_empty(), &self.issuer) {
            (false, _) => text.to_string(),
            (true, Some(issuer)) => format!("{} ({})", self.name, issuer),
            (true, None) => self.name.clone(),
        }
    }
}

/// Structured extraction of a candidate's resume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeProfile {
    pub resume_id: String,
    pub candidate_id: String,
    #[serde(default)]
    pub identity: CandidateIdentity,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub experiences: Vec<WorkExperience>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub education: Vec<Education>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(default)]
    pub is_tailored: bool,
    #[serde(default)]
    pub tailored_for: Option<String>,
    pub parsed_at: DateTime<Utc>,
}

impl ResumeProfile {
    /// Reference date for ongoing roles, fixed by the extraction time so that
    /// scoring stays reproducible
    pub fn as_of(&self) -> NaiveDate {
        self.parsed_at.date_naive()
    }

    pub fn total_years(&self) -> f64 {
        let as_of = self.as_of();
        self.experiences
            .iter()
            .map(|role| role.duration_years(as_of))
            .sum()
    }

    pub fn content_hash(&self) -> String {
        content_hash(self)
    }
}

fn default_skill_weight() -> f64 {
    1.0
}

/// A posting skill with its weight. "Must" entries may be weighted up to 2.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct WeightedSkill {
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0.0, max = 2.0))]
    #[serde(default = "default_skill_weight")]
    pub weight: f64,
}

impl WeightedSkill {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Per-posting rubric. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RubricWeights {
    pub semantic: f64,
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub projects: f64,
}

impl Default for RubricWeights {
    fn default() -> Self {
        Self {
            semantic: 0.10,
            skills: 0.45,
            experience: 0.25,
            education: 0.10,
            projects: 0.10,
        }
    }
}

impl RubricWeights {
    pub fn sum(&self) -> f64 {
        self.semantic + self.skills + self.experience + self.education + self.projects
    }

    /// Reject negative weights and sums away from 1.0
    pub fn check(&self) -> Result<(), EngineError> {
        let sum = self.sum();
        let any_negative = [
            self.semantic,
            self.skills,
            self.experience,
            self.education,
            self.projects,
        ]
        .iter()
        .any(|w| *w < 0.0 || !w.is_finite());

        if any_negative || (sum - 1.0).abs() > RUBRIC_TOLERANCE {
            return Err(EngineError::InvalidRubric { sum });
        }
        Ok(())
    }
}

/// Recommendation tier cut-offs on the overall score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierThresholds {
    pub shortlist: f64,
    pub maybe: f64,
}

impl Default for TierThresholds {
    fn default() -> Self {
        Self {
            shortlist: 80.0,
            maybe: 60.0,
        }
    }
}

impl TierThresholds {
    pub fn check(&self) -> Result<(), EngineError> {
        if !(0.0..=100.0).contains(&self.maybe)
            || !(0.0..=100.0).contains(&self.shortlist)
            || self.maybe > self.shortlist
        {
            return Err(EngineError::InvalidPosting(format!(
                "tier thresholds must satisfy 0 <= maybe ({}) <= shortlist ({}) <= 100",
                self.maybe, self.shortlist
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EducationRequirement {
    pub degree: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Requirements of an internship posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostingRequirements {
    #[validate(length(min = 1))]
    pub posting_id: String,
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: String,
    pub posted_at: DateTime<Utc>,
    #[validate(nested)]
    #[serde(default)]
    pub required_skills: Vec<WeightedSkill>,
    #[validate(nested)]
    #[serde(default)]
    pub preferred_skills: Vec<WeightedSkill>,
    #[validate(range(min = 0.0, max = 50.0))]
    #[serde(default)]
    pub min_years: f64,
    #[validate(range(min = 0.0, max = 50.0))]
    #[serde(default)]
    pub preferred_years: f64,
    #[serde(default)]
    pub required_education: Option<EducationRequirement>,
    #[serde(default)]
    pub rubric_weights: RubricWeights,
    #[serde(default)]
    pub tier_thresholds: Option<TierThresholds>,
}

impl PostingRequirements {
    /// Configuration-time validation; repositories call this before accepting a write
    pub fn check(&self) -> Result<(), EngineError> {
        self.rubric_weights.check()?;
        self.validate()
            .map_err(|e| EngineError::InvalidPosting(e.to_string()))?;
        if let Some(thresholds) = &self.tier_thresholds {
            thresholds.check()?;
        }
        Ok(())
    }

    pub fn content_hash(&self) -> String {
        content_hash(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Shortlisted,
    Accepted,
    Rejected,
}

/// A candidate's application to a posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub candidate_id: String,
    pub posting_id: String,
    pub resume_id: String,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Vector-store entry. Only valid for the content hash it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredEmbedding {
    pub vector: Vec<f32>,
    pub model: String,
    pub source_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(start: Option<NaiveDate>, end: Option<NaiveDate>) -> WorkExperience {
        WorkExperience {
            title: "Intern".to_string(),
            company: "Acme".to_string(),
            start,
            end,
            skills_used: vec![],
            evidence_text: String::new(),
        }
    }

    #[test]
    fn test_duration_years() {
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let dated = role(NaiveDate::from_ymd_opt(2022, 1, 1), NaiveDate::from_ymd_opt(2023, 1, 1));
        assert!((dated.duration_years(as_of) - 1.0).abs() < 0.01);

        let ongoing = role(NaiveDate::from_ymd_opt(2023, 1, 1), None);
        assert!((ongoing.duration_years(as_of) - 1.0).abs() < 0.01);

        let undated = role(None, None);
        assert_eq!(undated.duration_years(as_of), 0.0);

        let inverted = role(NaiveDate::from_ymd_opt(2023, 1, 1), NaiveDate::from_ymd_opt(2022, 1, 1));
        assert_eq!(inverted.duration_years(as_of), 0.0);
    }

    #[test]
    fn test_evidence_snippet_falls_back_to_title() {
        let r = role(None, None);
        assert_eq!(r.evidence_snippet(), "Intern at Acme");
    }

    #[test]
    fn test_default_rubric_sums_to_one() {
        assert!(RubricWeights::default().check().is_ok());
    }

    #[test]
    fn test_rubric_rejects_bad_sum() {
        let weights = RubricWeights {
            semantic: 0.2,
            skills: 0.5,
            experience: 0.3,
            education: 0.1,
            projects: 0.1,
        };
        match weights.check() {
            Err(EngineError::InvalidRubric { sum }) => assert!((sum - 1.2).abs() < 1e-9),
            other => panic!("expected InvalidRubric, got {:?}", other),
        }
    }

    #[test]
    fn test_rubric_rejects_negative_weight() {
        let weights = RubricWeights {
            semantic: -0.1,
            skills: 0.6,
            experience: 0.3,
            education: 0.1,
            projects: 0.1,
        };
        assert!(matches!(weights.check(), Err(EngineError::InvalidRubric { .. })));
    }

    #[test]
    fn test_tier_thresholds_order() {
        assert!(TierThresholds::default().check().is_ok());
        let inverted = TierThresholds {
            shortlist: 50.0,
            maybe: 70.0,
        };
        assert!(inverted.check().is_err());
    }
}
