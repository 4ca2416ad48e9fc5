// Criterion benchmarks for skillmatch

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;

use skillmatch::core::flagging::detect_duplicates;
use skillmatch::core::proficiency::{ProficiencyConfig, ResumeSkillIndex};
use skillmatch::core::scoring::{skills_score, ResolvedRequirements, SkillSplit};
use skillmatch::core::taxonomy::SkillTaxonomy;
use skillmatch::engine::{Engine, EngineConfig};
use skillmatch::models::{
    CandidateIdentity, PostingRequirements, Project, RankRequest, ResumeProfile, RubricWeights,
    WeightedSkill, WorkExperience,
};
use skillmatch::services::{Embedder, InMemoryStore, ProviderError};

const SKILLS: [&str; 10] = [
    "React", "Node.js", "TypeScript", "Python", "Docker", "SQL", "Java", "Go", "AWS", "Git",
];

struct LengthEmbedder;

#[async_trait]
impl Embedder for LengthEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vector = vec![1.0f32; 8];
        for (i, byte) in text.bytes().enumerate() {
            vector[i % 8] += byte as f32 / 255.0;
        }
        Ok(vector)
    }

    fn model_id(&self) -> &str {
        "bench-embed"
    }
}

fn create_posting() -> PostingRequirements {
    PostingRequirements {
        posting_id: "p1".to_string(),
        title: "Backend Intern".to_string(),
        company: "Acme".to_string(),
        location: None,
        description: "APIs and data pipelines".to_string(),
        posted_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        required_skills: SKILLS[..4].iter().map(|s| WeightedSkill::new(*s, 1.5)).collect(),
        preferred_skills: SKILLS[4..7].iter().map(|s| WeightedSkill::new(*s, 1.0)).collect(),
        min_years: 1.0,
        preferred_years: 2.0,
        required_education: None,
        rubric_weights: RubricWeights::default(),
        tier_thresholds: None,
    }
}

fn create_resume(id: usize) -> ResumeProfile {
    let skills: Vec<String> = SKILLS
        .iter()
        .enumerate()
        .filter(|(i, _)| (id + i) % 3 != 0)
        .map(|(_, s)| s.to_string())
        .collect();
    ResumeProfile {
        resume_id: format!("r{}", id),
        candidate_id: format!("c{}", id),
        identity: CandidateIdentity {
            name: Some(format!("Student {}", id)),
            phone: Some(format!("+1 555 {:04}", id % 500)),
            ..Default::default()
        },
        headline: Some("Computer science student".to_string()),
        experiences: vec![WorkExperience {
            title: "Developer Intern".to_string(),
            company: "Initech".to_string(),
            start: NaiveDate::from_ymd_opt(2022, 6, 1),
            end: NaiveDate::from_ymd_opt(2023, 6 + (id % 6) as u32, 1),
            skills_used: skills.iter().take(3).cloned().collect(),
            evidence_text: "Built REST services with Docker and SQL".to_string(),
        }],
        projects: vec![Project {
            title: "Campus app".to_string(),
            role: None,
            technologies: skills.clone(),
            evidence_text: "React front end on a Node.js API".to_string(),
        }],
        education: vec![],
        skills,
        certifications: vec![],
        is_tailored: false,
        tailored_for: None,
        parsed_at: Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
    }
}

fn bench_taxonomy_lookup(c: &mut Criterion) {
    let taxonomy = SkillTaxonomy::builtin();
    c.bench_function("taxonomy_lookup", |b| {
        b.iter(|| {
            for term in ["reactjs", "Node JS", "typescrpt", "Underwater Basketry"] {
                black_box(taxonomy.lookup(black_box(term)));
            }
        });
    });
}

fn bench_skills_score(c: &mut Criterion) {
    let taxonomy = SkillTaxonomy::builtin();
    let posting = create_posting();
    let requirements = ResolvedRequirements::resolve(&posting, &taxonomy);
    let resume = create_resume(7);

    c.bench_function("skills_score", |b| {
        b.iter(|| {
            let index = ResumeSkillIndex::build(black_box(&resume), &taxonomy);
            skills_score(
                &requirements,
                &resume,
                &index,
                &ProficiencyConfig::default(),
                &SkillSplit::default(),
            )
        });
    });
}

fn bench_duplicate_detection(c: &mut Criterion) {
    let resumes: Vec<ResumeProfile> = (0..1000).map(create_resume).collect();
    c.bench_function("detect_duplicates_1000", |b| {
        b.iter(|| black_box(detect_duplicates(resumes.iter())));
    });
}

fn bench_ranking(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("rank_candidates");

    for size in [50usize, 200, 500] {
        let engine = runtime.block_on(async {
            let engine = Engine::in_memory(
                Arc::new(InMemoryStore::new()),
                Arc::new(SkillTaxonomy::builtin()),
                EngineConfig::default(),
            )
            .with_embedder(Arc::new(LengthEmbedder));
            engine.index_posting(create_posting()).await.unwrap();
            for id in 0..size {
                engine.index_resume(create_resume(id)).await.unwrap();
            }
            engine
        });
        let request = RankRequest::default();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                engine.invalidate_posting("p1");
                runtime.block_on(engine.rank_candidates("p1", &request)).unwrap()
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_taxonomy_lookup,
    bench_skills_score,
    bench_duplicate_detection,
    bench_ranking
);

criterion_main!(benches);
