use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::core::taxonomy::{SkillMatch, SkillTaxonomy};
use crate::error::EngineError;
use crate::services::providers::{GenerationPurpose, GenerationRequest, TextGenerator};

const MAX_DESCRIPTION_CHARS: usize = 12_000;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtractionPayload {
    required_skills: Vec<String>,
    preferred_skills: Vec<String>,
}

/// One extracted term and what the taxonomy made of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedSkill {
    pub term: String,
    pub resolution: SkillMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillExtraction {
    pub required: Vec<ExtractedSkill>,
    pub preferred: Vec<ExtractedSkill>,
    pub taxonomy_version: String,
    pub prompt: String,
    pub response: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl SkillExtraction {
    /// Terms the taxonomy did not recognise, for curation
    pub fn unmatched(&self) -> Vec<&str> {
        self.required
            .iter()
            .chain(&self.preferred)
            .filter(|s| !s.resolution.is_matched())
            .map(|s| s.term.as_str())
            .collect()
    }
}

pub fn extraction_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "required_skills": { "type": "ARRAY", "items": { "type": "STRING" } },
            "preferred_skills": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["required_skills", "preferred_skills"]
    })
}

pub fn extraction_prompt(description: &str) -> String {
    let description: String = description.chars().take(MAX_DESCRIPTION_CHARS).collect();
    format!(
        "Extract the skills from this internship description.\n\
         \n\
         Put skills the description says are required, mandatory or must-have in \
         required_skills. Put nice-to-have, preferred or bonus skills in preferred_skills. \
         Use short skill names (\"React\", \"SQL\", \"Communication\"), one per entry, \
         without proficiency words or years.\n\
         \n\
         Description:\n{}\n\
         \n\
         Respond with JSON only: {{\"required_skills\": [...], \"preferred_skills\": [...]}}",
        description.trim()
    )
}

/// Resolve terms through the taxonomy, dropping blanks and repeats of the same skill
fn resolve_terms(terms: Vec<String>, taxonomy: &SkillTaxonomy, seen: &mut BTreeSet<String>) -> Vec<ExtractedSkill> {
    terms
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .filter_map(|term| {
            let resolution = taxonomy.lookup(&term);
            if seen.insert(resolution.key()) {
                Some(ExtractedSkill { term, resolution })
            } else {
                None
            }
        })
        .collect()
}

/// Strict parse of the generator response. A skill listed as both required
/// and preferred is kept as required.
pub fn parse_extraction(
    text: &str,
    taxonomy: &SkillTaxonomy,
    prompt: String,
    model: String,
    generated_at: DateTime<Utc>,
) -> Result<SkillExtraction, EngineError> {
    let payload: ExtractionPayload =
        serde_json::from_str(text).map_err(|e| EngineError::SchemaValidation(e.to_string()))?;

    let mut seen = BTreeSet::new();
    let required = resolve_terms(payload.required_skills, taxonomy, &mut seen);
    let preferred = resolve_terms(payload.preferred_skills, taxonomy, &mut seen);

    Ok(SkillExtraction {
        required,
        preferred,
        taxonomy_version: taxonomy.version().to_string(),
        prompt,
        response: text.to_string(),
        model,
        generated_at,
    })
}

pub async fn extract_posting_skills(
    generator: &dyn TextGenerator,
    taxonomy: &SkillTaxonomy,
    description: &str,
    limit: Duration,
) -> Result<SkillExtraction, EngineError> {
    if description.trim().is_empty() {
        return Err(EngineError::InvalidRequest("description is empty".to_string()));
    }

    let prompt = extraction_prompt(description);
    let request = GenerationRequest {
        prompt: prompt.clone(),
        purpose: GenerationPurpose::SkillExtraction,
        schema: Some(extraction_schema()),
    };

    let response = tokio::time::timeout(limit, generator.generate(request))
        .await
        .map_err(|_| EngineError::ProviderTimeout { after: limit })??;

    parse_extraction(&response.text, taxonomy, prompt, response.model, Utc::now())
}
