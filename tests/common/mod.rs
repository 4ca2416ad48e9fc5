// Shared fixtures and provider fakes for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use skillmatch::core::SkillTaxonomy;
use skillmatch::engine::{Engine, EngineConfig};
use skillmatch::models::{
    Application, ApplicationStatus, CandidateIdentity, Education, PostingRequirements, Project,
    ResumeProfile, RubricWeights, WeightedSkill, WorkExperience,
};
use skillmatch::services::{
    Embedder, GenerationRequest, GenerationResponse, InMemoryStore, ProviderError, TextGenerator,
};

/// Deterministic embedder: byte histogram folded into 16 buckets
pub struct HashEmbedder;

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vector = vec![0.0f32; 16];
        for (i, byte) in text.bytes().enumerate() {
            vector[(byte as usize + i % 3) % 16] += 1.0;
        }
        vector[0] += 1.0;
        Ok(vector)
    }

    fn model_id(&self) -> &str {
        "hash-embed"
    }
}

/// Generator returning a fixed body after an optional delay
pub struct FixedGenerator {
    pub text: String,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl FixedGenerator {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn slow(text: &str, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(text)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FixedGenerator {
    async fn generate(&self, _request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(GenerationResponse {
            text: self.text.clone(),
            model: "fixed-gen".to_string(),
        })
    }

    fn model_id(&self) -> &str {
        "fixed-gen"
    }
}

pub const RECOMMENDATION_JSON: &str = r#"{
    "action": "MAYBE",
    "priority": "Medium",
    "strengths": ["Solid React project work"],
    "concerns": ["No TypeScript evidence"],
    "interview_questions": ["Walk through the Node.js API you built"],
    "justification": "Covers the required stack but lacks the preferred typing experience."
}"#;

pub fn posting(id: &str, required: &[&str], preferred: &[&str]) -> PostingRequirements {
    PostingRequirements {
        posting_id: id.to_string(),
        title: "Full-stack Engineering Intern".to_string(),
        company: "Acme".to_string(),
        location: Some("Berlin".to_string()),
        description: "Build internal dashboards with a small product team.".to_string(),
        posted_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        required_skills: required.iter().map(|s| WeightedSkill::new(*s, 1.0)).collect(),
        preferred_skills: preferred.iter().map(|s| WeightedSkill::new(*s, 1.0)).collect(),
        min_years: 1.0,
        preferred_years: 2.0,
        required_education: None,
        rubric_weights: RubricWeights::default(),
        tier_thresholds: None,
    }
}

pub fn resume(candidate: &str, name: &str, skills: &[&str]) -> ResumeProfile {
    let skills: Vec<String> = skills.iter().map(|s| s.to_string()).collect();
    ResumeProfile {
        resume_id: format!("r-{}", candidate),
        candidate_id: candidate.to_string(),
        identity: CandidateIdentity {
            name: Some(name.to_string()),
            location: Some("Berlin, Germany".to_string()),
            email: Some(format!("{}@example.com", candidate)),
            ..Default::default()
        },
        headline: Some(format!("{} - aspiring software engineer", name)),
        experiences: vec![WorkExperience {
            title: "Software Engineering Intern".to_string(),
            company: "Initech".to_string(),
            start: NaiveDate::from_ymd_opt(2022, 6, 1),
            end: NaiveDate::from_ymd_opt(2023, 6, 1),
            skills_used: skills.clone(),
            evidence_text: format!("{} built the internal reporting dashboard.", name),
        }],
        projects: vec![Project {
            title: "Course planner".to_string(),
            role: Some("Lead".to_string()),
            technologies: skills.clone(),
            evidence_text: "Scheduling app used by 300 students.".to_string(),
        }],
        education: vec![Education {
            degree: "BSc".to_string(),
            institution: Some("Technical University".to_string()),
            field: Some("Computer Science".to_string()),
        }],
        skills,
        certifications: vec![],
        is_tailored: false,
        tailored_for: None,
        parsed_at: Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
    }
}

pub fn application(candidate: &str, posting: &str, resume: &str) -> Application {
    Application {
        candidate_id: candidate.to_string(),
        posting_id: posting.to_string(),
        resume_id: resume.to_string(),
        status: ApplicationStatus::Pending,
        submitted_at: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
    }
}

pub fn engine_with(store: Arc<InMemoryStore>, config: EngineConfig) -> Engine {
    Engine::in_memory(store, Arc::new(SkillTaxonomy::builtin()), config).with_embedder(Arc::new(HashEmbedder))
}

pub fn engine(store: Arc<InMemoryStore>) -> Engine {
    engine_with(store, EngineConfig::default())
}
