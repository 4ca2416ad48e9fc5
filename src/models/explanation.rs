use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five scoring components, in rubric order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Semantic,
    Skills,
    Experience,
    Education,
    Projects,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Semantic,
        Component::Skills,
        Component::Experience,
        Component::Education,
        Component::Projects,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Component::Semantic => "semantic similarity",
            Component::Skills => "skills",
            Component::Experience => "experience",
            Component::Education => "education",
            Component::Projects => "projects",
        }
    }
}

/// One value per component. Used for scores (0-100), confidences (0-1) and deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    pub semantic: f64,
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub projects: f64,
}

impl ComponentScores {
    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Semantic => self.semantic,
            Component::Skills => self.skills,
            Component::Experience => self.experience,
            Component::Education => self.education,
            Component::Projects => self.projects,
        }
    }

    /// Component-wise `self - other`
    pub fn delta(&self, other: &ComponentScores) -> ComponentScores {
        ComponentScores {
            semantic: self.semantic - other.semantic,
            skills: self.skills - other.skills,
            experience: self.experience - other.experience,
            education: self.education - other.education,
            projects: self.projects - other.projects,
        }
    }

    pub fn mean(&self) -> f64 {
        Component::ALL.iter().map(|c| self.get(*c)).sum::<f64>() / Component::ALL.len() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Shortlist,
    Maybe,
    Reject,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Shortlist => "SHORTLIST",
            Recommendation::Maybe => "MAYBE",
            Recommendation::Reject => "REJECT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ProficiencyLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

/// Where a piece of resume evidence came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum EvidenceSource {
    Experience { index: usize },
    Project { index: usize },
    Certification { index: usize },
    SkillsList,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceRef {
    pub source: EvidenceSource,
    pub snippet: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillProficiency {
    pub score: f64,
    pub level: ProficiencyLevel,
    pub years: f64,
    pub project_count: usize,
    pub certified: bool,
    pub evidence: Vec<EvidenceRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementKind {
    Required,
    Preferred,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedSkill {
    pub name: String,
    pub requirement: RequirementKind,
    pub weight: f64,
    pub proficiency: SkillProficiency,
    /// How confidently the resume term resolved onto the posting skill
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingSkill {
    pub name: String,
    pub requirement: RequirementKind,
    pub weight: f64,
    pub impact: Impact,
    pub reason: String,
    pub mitigation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleContribution {
    pub title: String,
    pub company: String,
    pub years: f64,
    pub matched_skills: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceAnalysis {
    pub total_years: f64,
    pub relevant_years: f64,
    pub min_years: f64,
    pub preferred_years: f64,
    /// `relevant_years - min_years`; negative when under the requirement
    pub gap_years: f64,
    pub dated_roles: usize,
    pub relevant_roles: Vec<RoleContribution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EducationMatchLevel {
    Strong,
    Partial,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationAnalysis {
    pub highest_degree: Option<String>,
    pub required_degree: Option<String>,
    pub match_level: EducationMatchLevel,
    pub field_matched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalysis {
    pub title: String,
    pub relevant_skills: Vec<String>,
    pub is_relevant: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Generated recommendation text together with the exact exchange that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRecommendation {
    pub action: Recommendation,
    pub priority: Priority,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub interview_questions: Vec<String>,
    pub justification: String,
    pub prompt: String,
    pub response: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Hash over every input the scores depend on
    pub inputs_hash: String,
    pub resume_hash: String,
    pub posting_hash: String,
    pub taxonomy_version: String,
    pub scoring_version: String,
    pub embedding_model: Option<String>,
    pub generation_model: Option<String>,
    pub blind_mode: bool,
    pub computed_at: DateTime<Utc>,
}

/// Structured, evidence-backed explanation of one (candidate, posting) match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchExplanation {
    pub candidate_id: String,
    pub resume_id: String,
    pub posting_id: String,
    pub overall_score: f64,
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub component_scores: ComponentScores,
    pub component_confidence: ComponentScores,
    pub matched_skills: Vec<MatchedSkill>,
    pub missing_skills: Vec<MissingSkill>,
    pub experience_analysis: ExperienceAnalysis,
    pub education_analysis: EducationAnalysis,
    pub project_analysis: Vec<ProjectAnalysis>,
    pub summary: String,
    pub ai_recommendation: Option<AiRecommendation>,
    /// Set when generation was attempted and failed
    pub generation_error: Option<String>,
    pub provenance: Provenance,
}

impl MatchExplanation {
    pub fn required_total(&self) -> usize {
        let matched = self
            .matched_skills
            .iter()
            .filter(|s| s.requirement == RequirementKind::Required)
            .count();
        let missing = self
            .missing_skills
            .iter()
            .filter(|s| s.requirement == RequirementKind::Required)
            .count();
        matched + missing
    }

    pub fn required_matched(&self) -> usize {
        self.matched_skills
            .iter()
            .filter(|s| s.requirement == RequirementKind::Required)
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonSide {
    pub candidate_id: String,
    pub resume_id: String,
    pub overall_score: f64,
    pub recommendation: Recommendation,
    pub component_scores: ComponentScores,
    pub matched_skills_count: usize,
    pub missing_skills_count: usize,
    pub relevant_years: f64,
    pub next_steps: Vec<String>,
}

/// Aligned diff of two explanations for the same posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub posting_id: String,
    pub candidate_a: ComparisonSide,
    pub candidate_b: ComparisonSide,
    /// `a.overall - b.overall`
    pub overall_delta: f64,
    /// Component-wise `a - b`
    pub component_deltas: ComponentScores,
    pub decisive_component: Option<Component>,
    pub skills_only_a: Vec<String>,
    pub skills_only_b: Vec<String>,
    pub shared_skills: Vec<String>,
    pub preferred_candidate: Option<String>,
    pub summary: String,
}
