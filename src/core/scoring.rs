use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::core::proficiency::{estimate, ProficiencyConfig, ResumeSkillIndex};
use crate::core::taxonomy::{degree_level, SkillTaxonomy};
use crate::error::EngineError;
use crate::models::{
    EducationAnalysis, EducationMatchLevel, ExperienceAnalysis, Impact, MatchedSkill,
    MissingSkill, PostingRequirements, ProjectAnalysis, RequirementKind, ResumeProfile,
    RoleContribution, WeightedSkill,
};

/// Share of the skills score carried by required vs preferred skills
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillSplit {
    #[serde(default = "default_required_share")]
    pub required_share: f64,
    #[serde(default = "default_preferred_share")]
    pub preferred_share: f64,
}

fn default_required_share() -> f64 { 0.7 }
fn default_preferred_share() -> f64 { 0.3 }

impl Default for SkillSplit {
    fn default() -> Self {
        Self {
            required_share: default_required_share(),
            preferred_share: default_preferred_share(),
        }
    }
}

/// A component score in [0, 100] with its confidence in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct Scored<T> {
    pub score: f64,
    pub confidence: f64,
    pub detail: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillsDetail {
    pub matched: Vec<MatchedSkill>,
    pub missing: Vec<MissingSkill>,
}

/// Posting skills resolved to canonical keys. Duplicates collapse onto the
/// first occurrence and preferred entries already required are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequirements {
    pub required: Vec<(String, f64)>,
    pub preferred: Vec<(String, f64)>,
}

impl ResolvedRequirements {
    pub fn resolve(posting: &PostingRequirements, taxonomy: &SkillTaxonomy) -> Self {
        let mut seen = BTreeSet::new();
        let required = collect_unique(&posting.required_skills, taxonomy, &mut seen);
        let preferred = collect_unique(&posting.preferred_skills, taxonomy, &mut seen);
        Self { required, preferred }
    }

    pub fn required_keys(&self) -> BTreeSet<String> {
        self.required.iter().map(|(k, _)| k.clone()).collect()
    }
}

fn collect_unique(
    skills: &[WeightedSkill],
    taxonomy: &SkillTaxonomy,
    seen: &mut BTreeSet<String>,
) -> Vec<(String, f64)> {
    skills
        .iter()
        .filter_map(|s| {
            let key = taxonomy.lookup(&s.name).key();
            if key.is_empty() || !seen.insert(key.clone()) {
                None
            } else {
                Some((key, s.weight))
            }
        })
        .collect()
}

/// Weighted share of `items` that are hit. Falls back to a plain count when
/// every weight is zero.
fn weighted_fraction(items: &[(f64, bool)]) -> f64 {
    if items.is_empty() {
        return 0.0;
    }
    let total: f64 = items.iter().map(|(w, _)| *w).sum();
    if total <= 0.0 {
        let hits = items.iter().filter(|(_, hit)| *hit).count();
        return hits as f64 / items.len() as f64;
    }
    let covered: f64 = items.iter().filter(|(_, hit)| *hit).map(|(w, _)| *w).sum();
    covered / total
}

/// Cosine similarity of two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64, EngineError> {
    if a.len() != b.len() {
        return Err(EngineError::InvalidEmbedding(format!(
            "dimension mismatch: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 || !norm_a.is_finite() || !norm_b.is_finite() {
        return Err(EngineError::InvalidEmbedding("zero or non-finite vector".to_string()));
    }

    Ok((dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0))
}

/// Semantic similarity rescaled from [-1, 1] to [0, 100].
///
/// There is no default similarity: an absent or empty embedding is an error.
pub fn semantic_score(
    resume_embedding: Option<&[f32]>,
    posting_embedding: Option<&[f32]>,
    resume_id: &str,
    posting_id: &str,
) -> Result<Scored<()>, EngineError> {
    let resume_vec = resume_embedding
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EngineError::MissingEmbedding {
            subject: "resume",
            id: resume_id.to_string(),
        })?;
    let posting_vec = posting_embedding
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EngineError::MissingEmbedding {
            subject: "posting",
            id: posting_id.to_string(),
        })?;

    let cosine = cosine_similarity(resume_vec, posting_vec)?;
    Ok(Scored {
        score: ((cosine + 1.0) / 2.0 * 100.0).clamp(0.0, 100.0),
        confidence: 1.0,
        detail: (),
    })
}

fn missing_preferred_impact(weight: f64) -> Impact {
    if weight >= 1.0 {
        Impact::Medium
    } else {
        Impact::Low
    }
}

/// Weighted coverage of required and preferred skills
pub fn skills_score(
    requirements: &ResolvedRequirements,
    resume: &ResumeProfile,
    index: &ResumeSkillIndex,
    proficiency: &ProficiencyConfig,
    split: &SkillSplit,
) -> Result<Scored<SkillsDetail>, EngineError> {
    let mut matched = Vec::new();
    let mut missing = Vec::new();

    let mut check = |list: &[(String, f64)], kind: RequirementKind| -> Result<Vec<(f64, bool)>, EngineError> {
        let mut hits = Vec::with_capacity(list.len());
        for (name, weight) in list {
            if index.has(name) {
                matched.push(MatchedSkill {
                    name: name.clone(),
                    requirement: kind,
                    weight: *weight,
                    proficiency: estimate(name, resume, index, proficiency)?,
                    confidence: index.confidence(name).unwrap_or(1.0),
                });
                hits.push((*weight, true));
            } else {
                let (impact, reason, mitigation) = match kind {
                    RequirementKind::Required => (
                        Impact::High,
                        format!("Required skill {} not found in resume", name),
                        format!("Ask about exposure to {} or plans to learn it", name),
                    ),
                    RequirementKind::Preferred => (
                        missing_preferred_impact(*weight),
                        format!("Preferred skill {} not found in resume", name),
                        format!("{} can be picked up on the job", name),
                    ),
                };
                missing.push(MissingSkill {
                    name: name.clone(),
                    requirement: kind,
                    weight: *weight,
                    impact,
                    reason,
                    mitigation,
                });
                hits.push((*weight, false));
            }
        }
        Ok(hits)
    };

    let required = check(requirements.required.as_slice(), RequirementKind::Required)?;
    let preferred = check(requirements.preferred.as_slice(), RequirementKind::Preferred)?;

    let score = if required.is_empty() {
        if preferred.iter().any(|(_, hit)| *hit) { 100.0 } else { 0.0 }
    } else if preferred.is_empty() {
        100.0 * weighted_fraction(&required)
    } else {
        let total_share = split.required_share + split.preferred_share;
        let (req_share, pref_share) = if total_share > 0.0 {
            (split.required_share / total_share, split.preferred_share / total_share)
        } else {
            (1.0, 0.0)
        };
        100.0 * (req_share * weighted_fraction(&required) + pref_share * weighted_fraction(&preferred))
    };

    let evaluated = requirements.required.len() + requirements.preferred.len();
    Ok(Scored {
        score: score.clamp(0.0, 100.0),
        confidence: (evaluated as f64 / 5.0).min(1.0),
        detail: SkillsDetail { matched, missing },
    })
}

/// Piecewise experience score on relevant years `r`:
///
/// - `preferred <= min`: `min(100, 100 * r / max(min, 1))`
/// - otherwise `r >= preferred` scores 100, `min <= r < preferred` climbs
///   linearly from 70 to 100, and `r < min` climbs linearly from 0 to 70
pub fn experience_curve(relevant_years: f64, min_years: f64, preferred_years: f64) -> f64 {
    let r = relevant_years.max(0.0);
    let floor = min_years.max(1.0);

    let score = if preferred_years <= min_years {
        100.0 * r / floor
    } else if r >= preferred_years {
        100.0
    } else if r >= min_years {
        70.0 + 30.0 * (r - min_years) / (preferred_years - min_years)
    } else if min_years > 0.0 {
        70.0 * r / min_years
    } else {
        70.0
    };
    score.clamp(0.0, 100.0)
}

/// Years spent in roles that used at least one required skill. When the
/// posting lists no required skills every role counts.
pub fn experience_score(
    posting: &PostingRequirements,
    requirements: &ResolvedRequirements,
    resume: &ResumeProfile,
    index: &ResumeSkillIndex,
) -> Scored<ExperienceAnalysis> {
    let required = requirements.required_keys();
    let as_of = resume.as_of();

    let mut relevant_years = 0.0;
    let mut relevant_roles = Vec::new();
    for (role, declared) in resume.experiences.iter().zip(&index.role_declared) {
        let overlap: Vec<String> = if required.is_empty() {
            declared.iter().cloned().collect()
        } else {
            declared.intersection(&required).cloned().collect()
        };
        if required.is_empty() || !overlap.is_empty() {
            let years = role.duration_years(as_of);
            relevant_years += years;
            relevant_roles.push(RoleContribution {
                title: role.title.clone(),
                company: role.company.clone(),
                years,
                matched_skills: overlap,
            });
        }
    }

    let dated_roles = resume.experiences.iter().filter(|r| r.is_dated()).count();

    Scored {
        score: experience_curve(relevant_years, posting.min_years, posting.preferred_years),
        confidence: (dated_roles as f64 / 3.0).min(1.0),
        detail: ExperienceAnalysis {
            total_years: resume.total_years(),
            relevant_years,
            min_years: posting.min_years,
            preferred_years: posting.preferred_years,
            gap_years: relevant_years - posting.min_years,
            dated_roles,
            relevant_roles,
        },
    }
}

/// Degree level plus field-of-study match against the posting requirement
pub fn education_score(
    posting: &PostingRequirements,
    resume: &ResumeProfile,
    taxonomy: &SkillTaxonomy,
) -> Scored<EducationAnalysis> {
    let levels: Vec<Option<u8>> = resume.education.iter().map(|e| degree_level(&e.degree)).collect();

    let highest_degree = resume
        .education
        .iter()
        .zip(&levels)
        .filter_map(|(e, level)| level.map(|l| (l, e)))
        .max_by_key(|(level, _)| *level)
        .map(|(_, e)| e.degree.clone())
        .or_else(|| resume.education.first().map(|e| e.degree.clone()));

    let confidence = if levels.iter().any(Option::is_some) {
        1.0
    } else if !resume.education.is_empty() {
        0.6
    } else {
        0.2
    };

    let Some(requirement) = &posting.required_education else {
        return Scored {
            score: 100.0,
            confidence,
            detail: EducationAnalysis {
                highest_degree,
                required_degree: None,
                match_level: EducationMatchLevel::Strong,
                field_matched: true,
            },
        };
    };

    let required_level = degree_level(&requirement.degree).unwrap_or(0);
    let field_ok = |field: &Option<String>| {
        requirement.fields.is_empty()
            || field
                .as_deref()
                .map(|f| requirement.fields.iter().any(|req| taxonomy.fields_match(f, req)))
                .unwrap_or(false)
    };

    let mut match_level = EducationMatchLevel::None;
    let mut field_matched = false;
    for (entry, level) in resume.education.iter().zip(&levels) {
        let level = level.unwrap_or(0);
        let field = field_ok(&entry.field);
        field_matched |= field;
        let level_ok = level >= required_level && (level > 0 || required_level == 0);

        if level_ok && field {
            match_level = EducationMatchLevel::Strong;
            break;
        }
        let one_below = level > 0 && level + 1 == required_level;
        if level_ok || (field && one_below) {
            match_level = EducationMatchLevel::Partial;
        }
    }

    let score = match match_level {
        EducationMatchLevel::Strong => 100.0,
        EducationMatchLevel::Partial => 60.0,
        EducationMatchLevel::None => 20.0,
    };

    Scored {
        score,
        confidence,
        detail: EducationAnalysis {
            highest_degree,
            required_degree: Some(requirement.degree.clone()),
            match_level,
            field_matched,
        },
    }
}

/// Weighted coverage of the posting's skills by project technologies.
/// Uses required skills, or preferred ones when nothing is required.
pub fn projects_score(
    requirements: &ResolvedRequirements,
    resume: &ResumeProfile,
    index: &ResumeSkillIndex,
) -> Scored<Vec<ProjectAnalysis>> {
    let targets = if requirements.required.is_empty() {
        &requirements.preferred
    } else {
        &requirements.required
    };
    let target_keys: BTreeSet<String> = targets.iter().map(|(k, _)| k.clone()).collect();

    let analyses: Vec<ProjectAnalysis> = resume
        .projects
        .iter()
        .zip(&index.projects)
        .map(|(project, skills)| {
            let relevant_skills: Vec<String> = skills.intersection(&target_keys).cloned().collect();
            ProjectAnalysis {
                title: project.title.clone(),
                is_relevant: !relevant_skills.is_empty(),
                relevant_skills,
            }
        })
        .collect();

    let score = if targets.is_empty() {
        if resume.projects.is_empty() { 0.0 } else { 100.0 }
    } else {
        let hits: Vec<(f64, bool)> = targets
            .iter()
            .map(|(key, weight)| (*weight, index.projects.iter().any(|p| p.contains(key))))
            .collect();
        100.0 * weighted_fraction(&hits)
    };

    Scored {
        score: score.clamp(0.0, 100.0),
        confidence: (resume.projects.len() as f64 / 3.0).min(1.0),
        detail: analyses,
    }
}
