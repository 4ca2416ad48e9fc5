use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::core::aggregate::weight_of;
use crate::error::EngineError;
use crate::models::{
    AiRecommendation, Comparison, ComparisonSide, Component, EducationMatchLevel,
    GenerationAttempt, Impact, MatchExplanation, PostingRequirements, Priority, Recommendation, RequirementKind,
    RubricWeights,
};
use crate::services::providers::{GenerationPurpose, GenerationRequest, TextGenerator};

const SUMMARY_SEPARATOR: &str = " · ";

/// Signed contribution of each component relative to a neutral 50, ordered
/// by magnitude and then by rubric order
fn contributions(explanation: &MatchExplanation, weights: &RubricWeights) -> Vec<(Component, f64)> {
    Component::ALL
        .iter()
        .map(|c| (*c, weight_of(weights, *c) * (explanation.component_scores.get(*c) - 50.0)))
        .collect()
}

fn positive_phrase(component: Component, explanation: &MatchExplanation) -> String {
    match component {
        Component::Skills => {
            let total = explanation.required_total();
            if total == 0 {
                "Matches the preferred skills".to_string()
            } else {
                format!(
                    "Strong skills match ({}/{} required)",
                    explanation.required_matched(),
                    total
                )
            }
        }
        Component::Experience => {
            let gap = explanation.experience_analysis.gap_years;
            if gap >= 1.0 {
                format!("Exceeds experience requirement by {:.1} years", gap)
            } else {
                format!(
                    "Meets experience requirement ({:.1} relevant years)",
                    explanation.experience_analysis.relevant_years
                )
            }
        }
        Component::Education => match explanation.education_analysis.match_level {
            EducationMatchLevel::Strong => "Education meets the requirement".to_string(),
            _ => "Education partially meets the requirement".to_string(),
        },
        Component::Projects => {
            let relevant = explanation.project_analysis.iter().filter(|p| p.is_relevant).count();
            format!("{} relevant project(s) demonstrate required skills", relevant)
        }
        Component::Semantic => "Resume closely aligned with the posting".to_string(),
    }
}

fn negative_phrase(component: Component, explanation: &MatchExplanation) -> String {
    match component {
        Component::Skills => {
            let missing: Vec<&str> = explanation
                .missing_skills
                .iter()
                .filter(|s| s.requirement == RequirementKind::Required)
                .take(2)
                .map(|s| s.name.as_str())
                .collect();
            if missing.is_empty() {
                "Few of the listed skills matched".to_string()
            } else {
                format!("Missing required skills: {}", missing.join(", "))
            }
        }
        Component::Experience => {
            let gap = explanation.experience_analysis.gap_years;
            if gap < 0.0 {
                format!(
                    "{:.1} years short of the {:.1}-year experience requirement",
                    -gap, explanation.experience_analysis.min_years
                )
            } else {
                "Limited relevant experience".to_string()
            }
        }
        Component::Education => "Education does not match the requirement".to_string(),
        Component::Projects => "Few projects demonstrate required skills".to_string(),
        Component::Semantic => "Resume weakly aligned with the posting".to_string(),
    }
}

/// One deterministic sentence naming the largest positive and negative
/// contributors. When one side is empty the top two of the other are used.
pub fn summary_sentence(explanation: &MatchExplanation, weights: &RubricWeights) -> String {
    let all = contributions(explanation, weights);
    let by_magnitude = |a: &(Component, f64), b: &(Component, f64)| {
        b.1.abs()
            .partial_cmp(&a.1.abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    };

    let mut positives: Vec<(Component, f64)> = all.iter().copied().filter(|(_, v)| *v > 0.0).collect();
    let mut negatives: Vec<(Component, f64)> = all.iter().copied().filter(|(_, v)| *v < 0.0).collect();
    positives.sort_by(by_magnitude);
    negatives.sort_by(by_magnitude);

    let phrases: Vec<String> = match (positives.first(), negatives.first()) {
        (Some(pos), Some(neg)) => vec![
            positive_phrase(pos.0, explanation),
            negative_phrase(neg.0, explanation),
        ],
        (Some(_), None) => positives
            .iter()
            .take(2)
            .map(|(c, _)| positive_phrase(*c, explanation))
            .collect(),
        (None, Some(_)) => negatives
            .iter()
            .take(2)
            .map(|(c, _)| negative_phrase(*c, explanation))
            .collect(),
        (None, None) => vec!["Average match across all components".to_string()],
    };

    phrases.join(SUMMARY_SEPARATOR)
}

/// Short card-header reason for ranked lists
pub fn short_reason(explanation: &MatchExplanation) -> String {
    let matched = explanation.required_matched();
    let total = explanation.required_total();
    match explanation.recommendation {
        Recommendation::Shortlist => format!(
            "Strong match: {}/{} required skills, {:.1} years relevant experience",
            matched, total, explanation.experience_analysis.relevant_years
        ),
        Recommendation::Maybe => format!(
            "Potential fit: {}/{} required skills matched, needs skills assessment",
            matched, total
        ),
        Recommendation::Reject => {
            let critical = high_impact_missing(explanation);
            if critical.is_empty() {
                format!("Limited match: {}/{} required skills", matched, total)
            } else {
                format!("Missing critical skills: {}", critical.join(", "))
            }
        }
    }
}

fn high_impact_missing(explanation: &MatchExplanation) -> Vec<String> {
    explanation
        .missing_skills
        .iter()
        .filter(|s| s.impact == Impact::High)
        .take(2)
        .map(|s| s.name.clone())
        .collect()
}

/// Recruiter actions for the candidate's tier
pub fn next_steps(explanation: &MatchExplanation) -> Vec<String> {
    let mut steps: Vec<String> = match explanation.recommendation {
        Recommendation::Shortlist => vec![
            "Schedule technical interview".to_string(),
            "Request portfolio/GitHub review".to_string(),
        ],
        Recommendation::Maybe => vec![
            "Conduct phone screening to assess skill gaps".to_string(),
            "Request additional information on missing skills".to_string(),
        ],
        Recommendation::Reject => vec![
            "Send polite rejection email".to_string(),
            "Provide feedback on skills to develop".to_string(),
        ],
    };

    let critical = high_impact_missing(explanation);
    if !critical.is_empty() && explanation.recommendation != Recommendation::Reject {
        steps.push(format!("Ask about plans to learn: {}", critical.join(", ")));
    }
    steps
}

fn side(explanation: &MatchExplanation) -> ComparisonSide {
    ComparisonSide {
        candidate_id: explanation.candidate_id.clone(),
        resume_id: explanation.resume_id.clone(),
        overall_score: explanation.overall_score,
        recommendation: explanation.recommendation,
        component_scores: explanation.component_scores,
        matched_skills_count: explanation.matched_skills.len(),
        missing_skills_count: explanation.missing_skills.len(),
        relevant_years: explanation.experience_analysis.relevant_years,
        next_steps: next_steps(explanation),
    }
}

/// Aligned diff of two explanations for the same posting. Deltas are `a - b`.
pub fn compare(a: &MatchExplanation, b: &MatchExplanation) -> Result<Comparison, EngineError> {
    if a.posting_id != b.posting_id {
        return Err(EngineError::PostingMismatch {
            left: a.posting_id.clone(),
            right: b.posting_id.clone(),
        });
    }

    let component_deltas = a.component_scores.delta(&b.component_scores);
    let overall_delta = a.overall_score - b.overall_score;

    let decisive_component = Component::ALL
        .iter()
        .copied()
        .filter(|c| component_deltas.get(*c) != 0.0)
        .fold(None, |best: Option<Component>, c| match best {
            Some(b) if component_deltas.get(b).abs() >= component_deltas.get(c).abs() => Some(b),
            _ => Some(c),
        });

    let skills_a: BTreeSet<String> = a.matched_skills.iter().map(|s| s.name.clone()).collect();
    let skills_b: BTreeSet<String> = b.matched_skills.iter().map(|s| s.name.clone()).collect();

    let preferred_candidate = match overall_delta.partial_cmp(&0.0) {
        Some(Ordering::Greater) => Some(a.candidate_id.clone()),
        Some(Ordering::Less) => Some(b.candidate_id.clone()),
        _ => None,
    };

    let summary = comparison_summary(a, b, overall_delta, decisive_component, &component_deltas);

    Ok(Comparison {
        posting_id: a.posting_id.clone(),
        candidate_a: side(a),
        candidate_b: side(b),
        overall_delta,
        component_deltas,
        decisive_component,
        skills_only_a: skills_a.difference(&skills_b).cloned().collect(),
        skills_only_b: skills_b.difference(&skills_a).cloned().collect(),
        shared_skills: skills_a.intersection(&skills_b).cloned().collect(),
        preferred_candidate,
        summary,
    })
}

fn comparison_summary(
    a: &MatchExplanation,
    b: &MatchExplanation,
    overall_delta: f64,
    decisive: Option<Component>,
    deltas: &crate::models::ComponentScores,
) -> String {
    let (winner, loser, sign) = if overall_delta >= 0.0 { (a, b, 1.0) } else { (b, a, -1.0) };

    let mut summary = if overall_delta == 0.0 {
        format!("{} and {} score equally overall", a.candidate_id, b.candidate_id)
    } else {
        format!(
            "{} ranks above {} by {:.1} points",
            winner.candidate_id,
            loser.candidate_id,
            overall_delta.abs()
        )
    };

    match decisive {
        Some(component) => summary.push_str(&format!(
            "; the largest difference is {} ({:+.1} for {})",
            component.label(),
            sign * deltas.get(component),
            winner.candidate_id
        )),
        None => summary.push_str(" with identical component scores"),
    }

    let skill_gap = winner.matched_skills.len() as i64 - loser.matched_skills.len() as i64;
    if overall_delta != 0.0 && skill_gap > 0 {
        summary.push_str(&format!("; matches {} more listed skill(s)", skill_gap));
    }
    summary
}

// ── Generated recommendation ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecommendationPayload {
    action: Recommendation,
    priority: Priority,
    strengths: Vec<String>,
    concerns: Vec<String>,
    interview_questions: Vec<String>,
    justification: String,
}

/// JSON schema handed to the generator alongside the prompt
pub fn recommendation_schema() -> serde_json::Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "action": { "type": "STRING", "enum": ["SHORTLIST", "MAYBE", "REJECT"] },
            "priority": { "type": "STRING", "enum": ["High", "Medium", "Low"] },
            "strengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "concerns": { "type": "ARRAY", "items": { "type": "STRING" } },
            "interview_questions": { "type": "ARRAY", "items": { "type": "STRING" } },
            "justification": { "type": "STRING" }
        },
        "required": ["action", "priority", "strengths", "concerns", "interview_questions", "justification"]
    })
}

/// Prompt built only from structured match data. Identity fields are never
/// part of an explanation, so they cannot leak into the prompt.
pub fn recommendation_prompt(explanation: &MatchExplanation, posting: &PostingRequirements) -> String {
    let list = |names: Vec<String>| if names.is_empty() { "none".to_string() } else { names.join(", ") };

    let matched = list(
        explanation
            .matched_skills
            .iter()
            .take(10)
            .map(|s| format!("{} ({:?})", s.name, s.proficiency.level))
            .collect(),
    );
    let missing = list(
        explanation
            .missing_skills
            .iter()
            .take(5)
            .map(|s| format!("{} ({:?} impact)", s.name, s.impact))
            .collect(),
    );
    let scores = &explanation.component_scores;
    let experience = &explanation.experience_analysis;
    let relevant_projects = explanation.project_analysis.iter().filter(|p| p.is_relevant).count();

    format!(
        "Analyze this candidate for the internship role and recommend an action.\n\
         \n\
         Role: {title} at {company}\n\
         Overall score: {overall:.1}/100 (engine tier: {tier})\n\
         \n\
         Component scores:\n\
         - Semantic: {semantic:.1}\n\
         - Skills: {skills:.1}\n\
         - Experience: {exp:.1}\n\
         - Education: {edu:.1}\n\
         - Projects: {proj:.1}\n\
         \n\
         Matched skills ({matched_count}): {matched}\n\
         Missing skills ({missing_count}): {missing}\n\
         Experience: {total:.1} years total, {relevant:.1} relevant (minimum {min:.1})\n\
         Education: {education:?} match\n\
         Relevant projects: {relevant_projects}/{project_count}\n\
         \n\
         Respond with JSON only, using exactly these fields: action (SHORTLIST, MAYBE or REJECT), \
         priority (High, Medium or Low), strengths (3 items), concerns (2 items), \
         interview_questions (3 items), justification (2-3 sentences).",
        title = posting.title,
        company = posting.company,
        overall = explanation.overall_score,
        tier = explanation.recommendation.as_str(),
        semantic = scores.semantic,
        skills = scores.skills,
        exp = scores.experience,
        edu = scores.education,
        proj = scores.projects,
        matched_count = explanation.matched_skills.len(),
        matched = matched,
        missing_count = explanation.missing_skills.len(),
        missing = missing,
        total = experience.total_years,
        relevant = experience.relevant_years,
        min = experience.min_years,
        education = explanation.education_analysis.match_level,
        relevant_projects = relevant_projects,
        project_count = explanation.project_analysis.len(),
    )
}

/// Strictly parse a generator response. No fence stripping or repair: a
/// response that is not exactly the schema is rejected.
pub fn parse_recommendation(
    text: &str,
    prompt: String,
    model: String,
    generated_at: DateTime<Utc>,
) -> Result<AiRecommendation, EngineError> {
    let payload: RecommendationPayload =
        serde_json::from_str(text).map_err(|e| EngineError::SchemaValidation(e.to_string()))?;

    if payload.justification.trim().is_empty() {
        return Err(EngineError::SchemaValidation("empty justification".to_string()));
    }

    Ok(AiRecommendation {
        action: payload.action,
        priority: payload.priority,
        strengths: payload.strengths,
        concerns: payload.concerns,
        interview_questions: payload.interview_questions,
        justification: payload.justification,
        prompt,
        response: text.to_string(),
        model,
        generated_at,
    })
}

/// A recommendation call: the parsed result and the record of what was
/// sent and received, kept for failures too
#[derive(Debug)]
pub struct RecommendationOutcome {
    pub attempt: GenerationAttempt,
    pub result: Result<AiRecommendation, EngineError>,
}

/// Ask the generator for a recommendation, bounded by `limit`
pub async fn generate_recommendation(
    generator: &dyn TextGenerator,
    explanation: &MatchExplanation,
    posting: &PostingRequirements,
    limit: Duration,
) -> RecommendationOutcome {
    let prompt = recommendation_prompt(explanation, posting);
    let mut attempt = GenerationAttempt::new(
        GenerationPurpose::Recommendation,
        &explanation.resume_id,
        &posting.posting_id,
        prompt.clone(),
        generator.model_id(),
    );
    let request = GenerationRequest {
        prompt: prompt.clone(),
        purpose: GenerationPurpose::Recommendation,
        schema: Some(recommendation_schema()),
    };

    let result = match tokio::time::timeout(limit, generator.generate(request)).await {
        Err(_) => Err(EngineError::ProviderTimeout { after: limit }),
        Ok(Err(e)) => Err(EngineError::from(e)),
        Ok(Ok(response)) => {
            attempt.model = response.model.clone();
            attempt.response = Some(response.text.clone());
            parse_recommendation(&response.text, prompt, response.model, attempt.attempted_at)
        }
    };
    if let Err(e) = &result {
        attempt.error = Some(e.to_string());
    }

    RecommendationOutcome { attempt, result }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ComponentScores, EducationAnalysis, ExperienceAnalysis, MissingSkill, Provenance,
    };

    fn explanation(candidate: &str, scores: ComponentScores, overall: f64) -> MatchExplanation {
        MatchExplanation {
            candidate_id: candidate.to_string(),
            resume_id: format!("{}-resume", candidate),
            posting_id: "p1".to_string(),
            overall_score: overall,
            confidence: 0.8,
            recommendation: crate::core::aggregate::tier(overall, &Default::default()),
            component_scores: scores,
            component_confidence: ComponentScores::default(),
            matched_skills: vec![],
            missing_skills: vec![MissingSkill {
                name: "TypeScript".to_string(),
                requirement: RequirementKind::Required,
                weight: 1.0,
                impact: Impact::High,
                reason: String::new(),
                mitigation: String::new(),
            }],
            experience_analysis: ExperienceAnalysis {
                total_years: 3.0,
                relevant_years: 3.0,
                min_years: 1.0,
                preferred_years: 2.0,
                gap_years: 2.0,
                dated_roles: 2,
                relevant_roles: vec![],
            },
            education_analysis: EducationAnalysis {
                highest_degree: None,
                required_degree: None,
                match_level: EducationMatchLevel::Strong,
                field_matched: true,
            },
            project_analysis: vec![],
            summary: String::new(),
            ai_recommendation: None,
            generation_error: None,
            provenance: Provenance {
                inputs_hash: String::new(),
                resume_hash: String::new(),
                posting_hash: String::new(),
                taxonomy_version: String::new(),
                scoring_version: String::new(),
                embedding_model: None,
                generation_model: None,
                blind_mode: false,
                computed_at: Utc::now(),
            },
        }
    }

    fn scores(semantic: f64, skills: f64, experience: f64, education: f64, projects: f64) -> ComponentScores {
        ComponentScores { semantic, skills, experience, education, projects }
    }

    #[test]
    fn test_summary_names_top_positive_and_negative() {
        let e = explanation("a", scores(50.0, 20.0, 100.0, 50.0, 50.0), 50.0);
        let summary = summary_sentence(&e, &RubricWeights::default());
        assert_eq!(
            summary,
            "Exceeds experience requirement by 2.0 years · Missing required skills: TypeScript"
        );
    }

    #[test]
    fn test_summary_uses_two_when_one_side_empty() {
        let e = explanation("a", scores(50.0, 90.0, 100.0, 50.0, 50.0), 80.0);
        let summary = summary_sentence(&e, &RubricWeights::default());
        assert!(summary.starts_with("Strong skills match"));
        assert!(summary.contains("Exceeds experience requirement"));
    }

    #[test]
    fn test_summary_is_deterministic() {
        let e = explanation("a", scores(61.0, 70.0, 30.0, 100.0, 40.0), 60.0);
        let weights = RubricWeights::default();
        assert_eq!(summary_sentence(&e, &weights), summary_sentence(&e, &weights));
    }

    #[test]
    fn test_next_steps_follow_tier() {
        let shortlist = explanation("a", scores(90.0, 90.0, 90.0, 90.0, 90.0), 90.0);
        let steps = next_steps(&shortlist);
        assert_eq!(steps[0], "Schedule technical interview");
        assert_eq!(steps[2], "Ask about plans to learn: TypeScript");

        let reject = explanation("b", scores(10.0, 10.0, 10.0, 10.0, 10.0), 10.0);
        let steps = next_steps(&reject);
        assert_eq!(steps, vec!["Send polite rejection email", "Provide feedback on skills to develop"]);
    }

    #[test]
    fn test_compare_is_antisymmetric() {
        let a = explanation("a", scores(60.0, 80.0, 70.0, 100.0, 50.0), 74.0);
        let b = explanation("b", scores(62.0, 40.0, 90.0, 60.0, 50.0), 61.0);

        let ab = compare(&a, &b).unwrap();
        let ba = compare(&b, &a).unwrap();

        for c in Component::ALL {
            assert_eq!(ab.component_deltas.get(c), -ba.component_deltas.get(c));
        }
        assert_eq!(ab.decisive_component, Some(Component::Skills));
        assert_eq!(ab.decisive_component, ba.decisive_component);
        assert_eq!(ab.preferred_candidate.as_deref(), Some("a"));
        assert_eq!(ba.preferred_candidate.as_deref(), Some("a"));
        assert_eq!(ab.summary, ba.summary);
    }

    #[test]
    fn test_compare_rejects_different_postings() {
        let a = explanation("a", ComponentScores::default(), 0.0);
        let mut b = explanation("b", ComponentScores::default(), 0.0);
        b.posting_id = "p2".to_string();
        assert!(matches!(compare(&a, &b), Err(EngineError::PostingMismatch { .. })));
    }

    #[test]
    fn test_parse_recommendation_strict() {
        let ok = r#"{"action":"MAYBE","priority":"Medium","strengths":["React"],"concerns":["No TS"],"interview_questions":["Why?"],"justification":"Solid but gaps."}"#;
        let rec = parse_recommendation(ok, "prompt".to_string(), "m".to_string(), Utc::now()).unwrap();
        assert_eq!(rec.action, Recommendation::Maybe);
        assert_eq!(rec.response, ok);

        let fenced = format!("```json\n{}\n```", ok);
        assert!(matches!(
            parse_recommendation(&fenced, String::new(), String::new(), Utc::now()),
            Err(EngineError::SchemaValidation(_))
        ));

        let extra = r#"{"action":"MAYBE","priority":"Medium","strengths":[],"concerns":[],"interview_questions":[],"justification":"x","score":99}"#;
        assert!(parse_recommendation(extra, String::new(), String::new(), Utc::now()).is_err());
    }

    #[test]
    fn test_prompt_has_no_identity() {
        let e = explanation("cand-42", scores(50.0, 50.0, 50.0, 50.0, 50.0), 50.0);
        let posting: PostingRequirements = serde_json::from_value(serde_json::json!({
            "postingId": "p1",
            "title": "Data Intern",
            "company": "Acme",
            "postedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let prompt = recommendation_prompt(&e, &posting);
        assert!(prompt.contains("Data Intern at Acme"));
        assert!(!prompt.contains("cand-42"));
    }
}
