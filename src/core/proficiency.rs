use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::taxonomy::SkillTaxonomy;
use crate::error::EngineError;
use crate::models::{EvidenceRef, EvidenceSource, ProficiencyLevel, ResumeProfile, SkillProficiency};

/// Confidence assigned to skills found only by scanning prose
const MENTION_CONFIDENCE: f64 = 0.95;

/// Weights and normalisation caps for proficiency inference
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProficiencyConfig {
    #[serde(default = "default_years_cap")]
    pub years_cap: f64,
    #[serde(default = "default_projects_cap")]
    pub projects_cap: f64,
}

fn default_years_cap() -> f64 { 5.0 }
fn default_projects_cap() -> f64 { 4.0 }

impl Default for ProficiencyConfig {
    fn default() -> Self {
        Self {
            years_cap: default_years_cap(),
            projects_cap: default_projects_cap(),
        }
    }
}

/// Canonical skills evidenced by each part of a resume, resolved once per
/// scoring pass and shared by every component.
#[derive(Debug, Clone, Default)]
pub struct ResumeSkillIndex {
    /// skills_used on each role, resolved
    pub role_declared: Vec<BTreeSet<String>>,
    /// skills_used plus skills mentioned in the role's evidence text
    pub roles: Vec<BTreeSet<String>>,
    pub projects: Vec<BTreeSet<String>>,
    pub certifications: Vec<BTreeSet<String>>,
    /// canonical skill -> raw term from the flat skills list
    pub listed: BTreeMap<String, String>,
    /// best lookup confidence seen for each canonical skill
    confidence: BTreeMap<String, f64>,
}

impl ResumeSkillIndex {
    pub fn build(resume: &ResumeProfile, taxonomy: &SkillTaxonomy) -> Self {
        let mut index = ResumeSkillIndex::default();

        for role in &resume.experiences {
            let declared = index.resolve_terms(taxonomy, &role.skills_used);
            let mut all = declared.clone();
            for skill in taxonomy.mentions(&role.evidence_text) {
                index.note(&skill, MENTION_CONFIDENCE);
                all.insert(skill);
            }
            index.role_declared.push(declared);
            index.roles.push(all);
        }

        for project in &resume.projects {
            let mut skills = index.resolve_terms(taxonomy, &project.technologies);
            for skill in taxonomy.mentions(&project.evidence_text) {
                index.note(&skill, MENTION_CONFIDENCE);
                skills.insert(skill);
            }
            index.projects.push(skills);
        }

        for cert in &resume.certifications {
            let mut skills = BTreeSet::new();
            let text = format!("{} {}", cert.name, cert.evidence_text);
            for skill in taxonomy.mentions(&text) {
                index.note(&skill, MENTION_CONFIDENCE);
                skills.insert(skill);
            }
            index.certifications.push(skills);
        }

        for raw in &resume.skills {
            let found = taxonomy.lookup(raw);
            if raw.trim().is_empty() {
                continue;
            }
            let key = found.key();
            index.note(&key, found.confidence());
            index.listed.entry(key).or_insert_with(|| raw.trim().to_string());
        }

        index
    }

    fn resolve_terms(&mut self, taxonomy: &SkillTaxonomy, terms: &[String]) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for term in terms.iter().filter(|t| !t.trim().is_empty()) {
            let found = taxonomy.lookup(term);
            let key = found.key();
            self.note(&key, found.confidence());
            out.insert(key);
        }
        out
    }

    fn note(&mut self, key: &str, confidence: f64) {
        let entry = self.confidence.entry(key.to_string()).or_insert(confidence);
        if confidence > *entry {
            *entry = confidence;
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.confidence.contains_key(key)
    }

    pub fn confidence(&self, key: &str) -> Option<f64> {
        self.confidence.get(key).copied()
    }

    pub fn all_skills(&self) -> BTreeSet<String> {
        self.confidence.keys().cloned().collect()
    }
}

pub fn level_for(score: f64) -> ProficiencyLevel {
    if score >= 0.8 {
        ProficiencyLevel::Expert
    } else if score >= 0.6 {
        ProficiencyLevel::Advanced
    } else if score >= 0.35 {
        ProficiencyLevel::Intermediate
    } else {
        ProficiencyLevel::Beginner
    }
}

fn normalise(value: f64, cap: f64) -> f64 {
    if cap <= 0.0 {
        return 1.0;
    }
    (value / cap).min(1.0)
}

/// Infer how proficient the candidate is in `skill` (a canonical key) from
/// role durations, project usage and certifications.
///
/// Every result carries at least one evidence reference; a skill the resume
/// never evidences is an error, not a zero.
pub fn estimate(
    skill: &str,
    resume: &ResumeProfile,
    index: &ResumeSkillIndex,
    config: &ProficiencyConfig,
) -> Result<SkillProficiency, EngineError> {
    let as_of = resume.as_of();
    let mut evidence = Vec::new();

    let mut years = 0.0;
    for (i, (role, skills)) in resume.experiences.iter().zip(&index.roles).enumerate() {
        if skills.contains(skill) {
            years += role.duration_years(as_of);
            evidence.push(EvidenceRef {
                source: EvidenceSource::Experience { index: i },
                snippet: role.evidence_snippet(),
            });
        }
    }

    let mut project_count = 0;
    for (i, (project, skills)) in resume.projects.iter().zip(&index.projects).enumerate() {
        if skills.contains(skill) {
            project_count += 1;
            evidence.push(EvidenceRef {
                source: EvidenceSource::Project { index: i },
                snippet: project.evidence_snippet(),
            });
        }
    }

    let mut certified = false;
    for (i, (cert, skills)) in resume.certifications.iter().zip(&index.certifications).enumerate() {
        if skills.contains(skill) {
            certified = true;
            evidence.push(EvidenceRef {
                source: EvidenceSource::Certification { index: i },
                snippet: cert.evidence_snippet(),
            });
        }
    }

    if let Some(raw) = index.listed.get(skill) {
        evidence.push(EvidenceRef {
            source: EvidenceSource::SkillsList,
            snippet: raw.clone(),
        });
    }

    if evidence.is_empty() {
        return Err(EngineError::MissingEvidence {
            skill: skill.to_string(),
        });
    }

    let score = (0.5 * normalise(years, config.years_cap)
        + 0.3 * normalise(project_count as f64, config.projects_cap)
        + 0.2 * if certified { 1.0 } else { 0.0 })
    .clamp(0.0, 1.0);

    Ok(SkillProficiency {
        score,
        level: level_for(score),
        years,
        project_count,
        certified,
        evidence,
    })
}
