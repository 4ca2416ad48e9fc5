use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde_json::json;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;
use validator::Validate;

use crate::core::blind::redact;
use crate::core::explain::{compare, generate_recommendation, summary_sentence};
use crate::core::extraction::{extract_posting_skills, SkillExtraction};
use crate::core::fairness::{evaluate, FairnessThresholds};
use crate::core::fingerprint::content_hash;
use crate::core::flagging::detect_duplicates;
use crate::core::matcher::{rank_postings, result_hash, Ranker, ScoredCandidate, ScoredPosting};
use crate::core::proficiency::{ProficiencyConfig, ResumeSkillIndex};
use crate::core::scoring::{
    education_score, experience_score, projects_score, semantic_score, skills_score,
    ResolvedRequirements, SkillSplit,
};
use crate::core::aggregate::aggregate;
use crate::core::taxonomy::SkillTaxonomy;
use crate::error::EngineError;
use crate::models::{
    Application, AuditAction, AuditRecord, CandidateFailure, Comparison, ComponentScores,
    FairnessCheckResult, GenerationAttempt, GroupAttribute, MatchExplanation, PostingFailure,
    PostingRecommendations, PostingRequirements, PostingSearch, Provenance, RankRequest,
    RankingMode, RankingResult, ResumeProfile, StoredEmbedding, TierThresholds,
};
use crate::services::cache::{CacheKey, CacheStats, ExplanationCache};
use crate::services::providers::{Embedder, TextGenerator};
use crate::services::store::{
    AuditRepository, EmbeddingRepository, EmbeddingSubject, InMemoryStore, ProfileRepository,
    ResultRepository,
};

pub const SCORING_VERSION: &str = "2024.1";

/// Tunables shared by every scoring call
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub skill_split: SkillSplit,
    pub proficiency: ProficiencyConfig,
    /// Used when a posting carries no thresholds of its own
    pub default_tiers: TierThresholds,
    pub generation_timeout: Duration,
    pub embedding_timeout: Duration,
    pub max_concurrency: usize,
    pub fairness: FairnessThresholds,
    pub scoring_version: String,
    pub cache_capacity: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            skill_split: SkillSplit::default(),
            proficiency: ProficiencyConfig::default(),
            default_tiers: TierThresholds::default(),
            generation_timeout: Duration::from_secs(30),
            embedding_timeout: Duration::from_secs(30),
            max_concurrency: 8,
            fairness: FairnessThresholds::default(),
            scoring_version: SCORING_VERSION.to_string(),
            cache_capacity: 10_000,
        }
    }
}

impl EngineConfig {
    /// Hash of every setting that changes a score
    pub fn fingerprint(&self) -> String {
        content_hash(&json!({
            "skillSplit": self.skill_split,
            "proficiency": self.proficiency,
            "defaultTiers": self.default_tiers,
            "scoringVersion": self.scoring_version,
        }))
    }
}

/// Per-call scoring switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreOptions {
    pub blind_mode: bool,
    pub with_recommendation: bool,
}

/// Posting data loaded once per call and shared by every candidate
struct PostingContext {
    posting: PostingRequirements,
    requirements: ResolvedRequirements,
    embedding: StoredEmbedding,
    posting_hash: String,
    thresholds: TierThresholds,
}

/// A resume chosen for ranking, with the application that selected it
struct Selection {
    resume: Arc<ResumeProfile>,
    application: Option<Application>,
    used_tailored: bool,
}

/// Text the resume embedding is computed from. Always built from the
/// redacted profile so identity never reaches the vector.
pub fn resume_embedding_text(resume: &ResumeProfile) -> String {
    let resume = redact(resume);
    let mut lines = Vec::new();
    if let Some(headline) = &resume.headline {
        lines.push(headline.clone());
    }
    if !resume.skills.is_empty() {
        lines.push(format!("Skills: {}", resume.skills.join(", ")));
    }
    for role in &resume.experiences {
        lines.push(format!(
            "{} at {}: {} {}",
            role.title,
            role.company,
            role.skills_used.join(", "),
            role.evidence_text
        ));
    }
    for project in &resume.projects {
        lines.push(format!(
            "Project {}: {} {}",
            project.title,
            project.technologies.join(", "),
            project.evidence_text
        ));
    }
    for education in &resume.education {
        lines.push(format!(
            "{} {}",
            education.degree,
            education.field.as_deref().unwrap_or_default()
        ));
    }
    for cert in &resume.certifications {
        lines.push(format!("Certification: {}", cert.name));
    }
    lines.join("\n")
}

pub fn posting_embedding_text(posting: &PostingRequirements) -> String {
    let names = |skills: &[crate::models::WeightedSkill]| {
        skills.iter().map(|s| s.name.as_str()).collect::<Vec<_>>().join(", ")
    };
    format!(
        "{}\n{}\nRequired skills: {}\nPreferred skills: {}",
        posting.title,
        posting.description,
        names(&posting.required_skills),
        names(&posting.preferred_skills)
    )
}

/// Latest non-tailored resume per candidate, falling back to the latest tailored one
fn base_resumes(resumes: &[Arc<ResumeProfile>]) -> BTreeMap<String, Arc<ResumeProfile>> {
    let mut best: BTreeMap<String, Arc<ResumeProfile>> = BTreeMap::new();
    for resume in resumes {
        let replace = match best.get(&resume.candidate_id) {
            None => true,
            Some(current) => {
                (current.is_tailored, std::cmp::Reverse(current.parsed_at), &current.resume_id)
                    > (resume.is_tailored, std::cmp::Reverse(resume.parsed_at), &resume.resume_id)
            }
        };
        if replace {
            best.insert(resume.candidate_id.clone(), resume.clone());
        }
    }
    best
}

fn failure(candidate_id: &str, resume_id: &str, error: &EngineError) -> CandidateFailure {
    CandidateFailure {
        candidate_id: candidate_id.to_string(),
        resume_id: resume_id.to_string(),
        kind: error.kind().to_string(),
        message: error.to_string(),
    }
}

/// Candidate scoring and explanation engine
///
/// Holds its collaborators explicitly; there is no process-wide state.
pub struct Engine {
    profiles: Arc<dyn ProfileRepository>,
    embeddings: Arc<dyn EmbeddingRepository>,
    audit: Arc<dyn AuditRepository>,
    results: Arc<dyn ResultRepository>,
    embedder: Option<Arc<dyn Embedder>>,
    generator: Option<Arc<dyn TextGenerator>>,
    taxonomy: Arc<SkillTaxonomy>,
    cache: ExplanationCache,
    config: EngineConfig,
    config_fingerprint: String,
}

impl Engine {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        embeddings: Arc<dyn EmbeddingRepository>,
        audit: Arc<dyn AuditRepository>,
        results: Arc<dyn ResultRepository>,
        taxonomy: Arc<SkillTaxonomy>,
        config: EngineConfig,
    ) -> Self {
        Self {
            profiles,
            embeddings,
            audit,
            results,
            embedder: None,
            generator: None,
            taxonomy,
            cache: ExplanationCache::new(config.cache_capacity),
            config_fingerprint: config.fingerprint(),
            config,
        }
    }

    /// Engine over a single in-memory store
    pub fn in_memory(store: Arc<InMemoryStore>, taxonomy: Arc<SkillTaxonomy>, config: EngineConfig) -> Self {
        Self::new(store.clone(), store.clone(), store.clone(), store, taxonomy, config)
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn taxonomy(&self) -> &SkillTaxonomy {
        &self.taxonomy
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    // ── Loading ─────────────────────────────────────────────────────────

    async fn load_posting(&self, posting_id: &str) -> Result<PostingRequirements, EngineError> {
        self.profiles
            .get_posting(posting_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("posting {}", posting_id)))
    }

    async fn load_resume(&self, resume_id: &str) -> Result<ResumeProfile, EngineError> {
        self.profiles
            .get_resume(resume_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("resume {}", resume_id)))
    }

    /// Stored embedding, checked against the content it must have been computed from
    async fn load_embedding(
        &self,
        subject: EmbeddingSubject,
        id: &str,
        current_hash: &str,
    ) -> Result<StoredEmbedding, EngineError> {
        let stored = self
            .embeddings
            .get_embedding(subject, id)
            .await?
            .filter(|e| !e.vector.is_empty())
            .ok_or_else(|| EngineError::MissingEmbedding {
                subject: subject.as_str(),
                id: id.to_string(),
            })?;

        if stored.source_hash != current_hash {
            return Err(EngineError::StaleData {
                subject: subject.as_str(),
                id: id.to_string(),
                stored: stored.source_hash,
                current: current_hash.to_string(),
            });
        }
        Ok(stored)
    }

    async fn posting_context(&self, posting: PostingRequirements) -> Result<PostingContext, EngineError> {
        posting.check()?;
        let posting_hash = posting.content_hash();
        let embedding = self
            .load_embedding(EmbeddingSubject::Posting, &posting.posting_id, &posting_hash)
            .await?;
        let thresholds = posting.tier_thresholds.unwrap_or(self.config.default_tiers);
        Ok(PostingContext {
            requirements: ResolvedRequirements::resolve(&posting, &self.taxonomy),
            posting,
            embedding,
            posting_hash,
            thresholds,
        })
    }

    fn cache_key(&self, ctx: &PostingContext, resume: &ResumeProfile, options: ScoreOptions) -> CacheKey {
        CacheKey {
            resume_id: resume.resume_id.clone(),
            posting_id: ctx.posting.posting_id.clone(),
            resume_hash: resume.content_hash(),
            posting_hash: ctx.posting_hash.clone(),
            taxonomy_version: self.taxonomy.version().to_string(),
            config_fingerprint: self.config_fingerprint.clone(),
            blind_mode: options.blind_mode,
            with_recommendation: options.with_recommendation,
        }
    }

    // ── Scoring ─────────────────────────────────────────────────────────

    /// Score one pair with no generation call. Pure apart from the embedding lookup.
    async fn compute_explanation(
        &self,
        ctx: &PostingContext,
        resume: &ResumeProfile,
        blind_mode: bool,
        inputs_hash: String,
    ) -> Result<MatchExplanation, EngineError> {
        let resume_embedding = self
            .load_embedding(EmbeddingSubject::Resume, &resume.resume_id, &resume.content_hash())
            .await?;

        let scoring_resume: Cow<ResumeProfile> = if blind_mode {
            Cow::Owned(redact(resume))
        } else {
            Cow::Borrowed(resume)
        };
        let scoring_resume = scoring_resume.as_ref();

        let index = ResumeSkillIndex::build(scoring_resume, &self.taxonomy);
        let posting = &ctx.posting;

        let semantic = semantic_score(
            Some(resume_embedding.vector.as_slice()),
            Some(ctx.embedding.vector.as_slice()),
            &resume.resume_id,
            &posting.posting_id,
        )?;
        let skills = skills_score(
            &ctx.requirements,
            scoring_resume,
            &index,
            &self.config.proficiency,
            &self.config.skill_split,
        )?;
        let experience = experience_score(posting, &ctx.requirements, scoring_resume, &index);
        let education = education_score(posting, scoring_resume, &self.taxonomy);
        let projects = projects_score(&ctx.requirements, scoring_resume, &index);

        let component_scores = ComponentScores {
            semantic: semantic.score,
            skills: skills.score,
            experience: experience.score,
            education: education.score,
            projects: projects.score,
        };
        let component_confidence = ComponentScores {
            semantic: semantic.confidence,
            skills: skills.confidence,
            experience: experience.confidence,
            education: education.confidence,
            projects: projects.confidence,
        };
        let overall = aggregate(
            &component_scores,
            &component_confidence,
            &posting.rubric_weights,
            &ctx.thresholds,
        );

        let mut explanation = MatchExplanation {
            candidate_id: resume.candidate_id.clone(),
            resume_id: resume.resume_id.clone(),
            posting_id: posting.posting_id.clone(),
            overall_score: overall.overall,
            confidence: overall.confidence,
            recommendation: overall.recommendation,
            component_scores,
            component_confidence,
            matched_skills: skills.detail.matched,
            missing_skills: skills.detail.missing,
            experience_analysis: experience.detail,
            education_analysis: education.detail,
            project_analysis: projects.detail,
            summary: String::new(),
            ai_recommendation: None,
            generation_error: None,
            provenance: Provenance {
                inputs_hash,
                resume_hash: scoring_resume.content_hash(),
                posting_hash: ctx.posting_hash.clone(),
                taxonomy_version: self.taxonomy.version().to_string(),
                scoring_version: self.config.scoring_version.clone(),
                embedding_model: Some(resume_embedding.model),
                generation_model: None,
                blind_mode,
                computed_at: Utc::now(),
            },
        };
        explanation.summary = summary_sentence(&explanation, &posting.rubric_weights);

        tracing::debug!(
            "Scored resume {} for posting {}: {:.1} ({})",
            resume.resume_id,
            posting.posting_id,
            explanation.overall_score,
            explanation.recommendation.as_str()
        );
        Ok(explanation)
    }

    /// Attach a generated recommendation. Failures leave scores intact and are
    /// recorded on the explanation.
    async fn attach_recommendation(&self, explanation: &mut MatchExplanation, posting: &PostingRequirements) {
        let Some(generator) = &self.generator else {
            explanation.generation_error = Some("no text generator configured".to_string());
            return;
        };

        let outcome = generate_recommendation(
            generator.as_ref(),
            explanation,
            posting,
            self.config.generation_timeout,
        )
        .await;
        self.record_generation(outcome.attempt).await;

        match outcome.result {
            Ok(recommendation) => {
                explanation.provenance.generation_model = Some(recommendation.model.clone());
                explanation.ai_recommendation = Some(recommendation);
                explanation.generation_error = None;
            }
            Err(e) => {
                tracing::warn!(
                    "Recommendation generation failed for resume {}: {}",
                    explanation.resume_id,
                    e
                );
                explanation.ai_recommendation = None;
                explanation.generation_error = Some(e.to_string());
            }
        }
    }

    async fn record_generation(&self, attempt: GenerationAttempt) {
        let attempt_id = attempt.attempt_id;
        if let Err(e) = self.results.append_generation(attempt).await {
            tracing::error!("Failed to store generation attempt {}: {}", attempt_id, e);
        }
    }

    /// Cached explanation for one pair
    async fn explain(
        &self,
        ctx: &PostingContext,
        resume: &ResumeProfile,
        options: ScoreOptions,
    ) -> Result<MatchExplanation, EngineError> {
        let key = self.cache_key(ctx, resume, options);
        if let Some(hit) = self.cache.get(&key).await {
            return Ok(hit.as_ref().clone());
        }

        let plain_key = CacheKey {
            with_recommendation: false,
            ..key.clone()
        };
        let mut explanation = match self.cache.get(&plain_key).await {
            Some(hit) => hit.as_ref().clone(),
            None => {
                let computed = self
                    .compute_explanation(ctx, resume, options.blind_mode, plain_key.digest())
                    .await?;
                self.results.put_explanation(computed.clone()).await?;
                self.cache.insert(&plain_key, Arc::new(computed.clone())).await;
                computed
            }
        };

        if options.with_recommendation {
            self.attach_recommendation(&mut explanation, &ctx.posting).await;
            explanation.provenance.inputs_hash = key.digest();
            self.results.put_explanation(explanation.clone()).await?;
            if explanation.generation_error.is_none() {
                self.cache.insert(&key, Arc::new(explanation.clone())).await;
            }
        }

        Ok(explanation)
    }

    async fn record_audit(&self, record: AuditRecord) -> Result<(), EngineError> {
        tracing::info!(
            "Audit {} {:?} on posting {} by {} ({} candidates)",
            record.audit_id,
            record.action,
            record.posting_id,
            record.actor,
            record.candidate_ids.len()
        );
        self.audit.append_audit(record).await?;
        Ok(())
    }

    /// Full explanation for one resume against one posting. Errors are
    /// returned as-is; nothing is substituted for a failed component.
    pub async fn score_candidate(
        &self,
        resume_id: &str,
        posting_id: &str,
        options: ScoreOptions,
        actor: &str,
    ) -> Result<MatchExplanation, EngineError> {
        let posting = self.load_posting(posting_id).await?;
        let resume = self.load_resume(resume_id).await?;
        let ctx = self.posting_context(posting).await?;

        let explanation = self.explain(&ctx, &resume, options).await?;

        self.record_audit(AuditRecord::new(
            actor,
            AuditAction::ScoreCandidate,
            posting_id,
            vec![explanation.candidate_id.clone()],
            json!({ "resumeId": resume_id, "withRecommendation": options.with_recommendation }),
            options.blind_mode,
            result_hash([(explanation.candidate_id.as_str(), explanation.overall_score)]),
        ))
        .await?;

        Ok(explanation)
    }

    // ── Ranking ─────────────────────────────────────────────────────────

    fn select_candidates(
        &self,
        posting_id: &str,
        mode: RankingMode,
        resumes: &[Arc<ResumeProfile>],
        applications: Vec<Application>,
        failures: &mut Vec<CandidateFailure>,
    ) -> Vec<Selection> {
        let base = base_resumes(resumes);
        let by_id: HashMap<&str, &Arc<ResumeProfile>> =
            resumes.iter().map(|r| (r.resume_id.as_str(), r)).collect();
        let mut applications: BTreeMap<String, Application> = applications
            .into_iter()
            .map(|a| (a.candidate_id.clone(), a))
            .collect();

        match mode {
            RankingMode::Discovery => base
                .into_iter()
                .map(|(candidate_id, resume)| Selection {
                    resume,
                    application: applications.remove(&candidate_id),
                    used_tailored: false,
                })
                .collect(),
            RankingMode::ApplicantsOnly { use_tailored } => applications
                .into_values()
                .filter_map(|application| {
                    let tailored = use_tailored
                        .then(|| {
                            by_id
                                .get(application.resume_id.as_str())
                                .filter(|r| r.is_tailored)
                                .map(|r| Arc::clone(r))
                                .or_else(|| {
                                    resumes
                                        .iter()
                                        .filter(|r| {
                                            r.candidate_id == application.candidate_id
                                                && r.is_tailored
                                                && r.tailored_for.as_deref() == Some(posting_id)
                                        })
                                        .max_by_key(|r| r.parsed_at)
                                        .cloned()
                                })
                        })
                        .flatten();

                    let (resume, used_tailored) = match tailored {
                        Some(resume) => (Some(resume), true),
                        None => (
                            base.get(&application.candidate_id)
                                .cloned()
                                .or_else(|| by_id.get(application.resume_id.as_str()).map(|r| Arc::clone(r))),
                            false,
                        ),
                    };

                    match resume {
                        Some(resume) => Some(Selection {
                            resume,
                            application: Some(application),
                            used_tailored,
                        }),
                        None => {
                            let error = EngineError::NotFound(format!("resume {}", application.resume_id));
                            failures.push(failure(&application.candidate_id, &application.resume_id, &error));
                            None
                        }
                    }
                })
                .collect(),
        }
    }

    /// Score a set of selections concurrently. Failing candidates are
    /// reported, never given a substitute score.
    async fn score_batch(
        &self,
        ctx: &PostingContext,
        selections: Vec<Selection>,
        blind_mode: bool,
    ) -> (Vec<(Selection, MatchExplanation)>, Vec<CandidateFailure>) {
        let options = ScoreOptions {
            blind_mode,
            with_recommendation: false,
        };

        let outcomes: Vec<(Selection, Result<MatchExplanation, EngineError>)> = stream::iter(selections)
            .map(|selection| async move {
                let result = self.explain(ctx, &selection.resume, options).await;
                (selection, result)
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let mut scored = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (selection, result) in outcomes {
            match result {
                Ok(explanation) => scored.push((selection, explanation)),
                Err(e) => {
                    tracing::warn!(
                        "Excluding candidate {} (resume {}): {}",
                        selection.resume.candidate_id,
                        selection.resume.resume_id,
                        e
                    );
                    failures.push(failure(&selection.resume.candidate_id, &selection.resume.resume_id, &e));
                }
            }
        }
        scored.sort_by(|a, b| a.1.candidate_id.cmp(&b.1.candidate_id));
        failures.sort_by(|a, b| a.candidate_id.cmp(&b.candidate_id));
        (scored, failures)
    }

    /// Collect, score, filter, sort and paginate candidates for a posting
    pub async fn rank_candidates(&self, posting_id: &str, request: &RankRequest) -> Result<RankingResult, EngineError> {
        request
            .validate()
            .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;

        // snapshot: everything below works on owned copies
        let posting = self.load_posting(posting_id).await?;
        let ctx = self.posting_context(posting).await?;
        let resumes: Vec<Arc<ResumeProfile>> = self
            .profiles
            .list_resumes()
            .await?
            .into_iter()
            .map(Arc::new)
            .collect();
        let applications = self.profiles.list_applications(posting_id).await?;

        let mut failures = Vec::new();
        let selections = self.select_candidates(posting_id, request.mode, &resumes, applications, &mut failures);
        let mut flags = detect_duplicates(resumes.iter().map(|r| r.as_ref()));

        tracing::info!(
            "Ranking {} candidates for posting {} ({:?})",
            selections.len(),
            posting_id,
            request.mode
        );

        let (scored, batch_failures) = self.score_batch(&ctx, selections, request.blind_mode).await;
        failures.extend(batch_failures);
        failures.sort_by(|a, b| a.candidate_id.cmp(&b.candidate_id));

        let candidates: Vec<ScoredCandidate> = scored
            .into_iter()
            .map(|(selection, explanation)| ScoredCandidate {
                skills: ResumeSkillIndex::build(&selection.resume, &self.taxonomy).all_skills(),
                flags: flags.remove(&selection.resume.candidate_id).unwrap_or_default(),
                explanation,
                resume: selection.resume,
                application: selection.application,
                used_tailored: selection.used_tailored,
            })
            .collect();

        let ranker = Ranker::new(&ctx.posting, &self.taxonomy);
        let mut page = ranker.rank(candidates, &request.filters, request.sort, request.pagination);

        if request.generate_recommendations {
            let posting = &ctx.posting;
            let explanations: Vec<MatchExplanation> = stream::iter(page.results.iter().map(|r| r.explanation.clone()))
                .map(|mut explanation| async move {
                    self.attach_recommendation(&mut explanation, posting).await;
                    explanation
                })
                .buffered(self.config.max_concurrency.max(1))
                .collect()
                .await;
            for (result, explanation) in page.results.iter_mut().zip(explanations) {
                result.explanation = explanation;
            }
        }

        let record = AuditRecord::new(
            &request.actor,
            AuditAction::RankCandidates,
            posting_id,
            page.ordered_ids.clone(),
            json!({
                "filters": request.filters,
                "sort": request.sort,
                "pagination": request.pagination,
                "mode": request.mode,
                "generateRecommendations": request.generate_recommendations,
            }),
            request.blind_mode,
            page.result_hash.clone(),
        );
        let audit_id = record.audit_id;
        self.record_audit(record).await?;

        Ok(RankingResult {
            posting_id: posting_id.to_string(),
            results: page.results,
            total_before_filter: page.total_before_filter,
            total_after_filter: page.total_after_filter,
            page: request.pagination.page,
            page_size: request.pagination.page_size,
            total_pages: page.total_pages,
            audit_id,
            failures,
        })
    }

    /// Resume used for a candidate on a posting: the application's resume
    /// when they applied, otherwise their base resume
    async fn resume_for_candidate(&self, candidate_id: &str, posting_id: &str) -> Result<ResumeProfile, EngineError> {
        let applications = self.profiles.list_applications(posting_id).await?;
        if let Some(application) = applications.iter().find(|a| a.candidate_id == candidate_id) {
            if let Some(resume) = self.profiles.get_resume(&application.resume_id).await? {
                return Ok(resume);
            }
        }

        let resumes: Vec<Arc<ResumeProfile>> = self
            .profiles
            .list_resumes()
            .await?
            .into_iter()
            .filter(|r| r.candidate_id == candidate_id)
            .map(Arc::new)
            .collect();
        base_resumes(&resumes)
            .remove(candidate_id)
            .map(|r| r.as_ref().clone())
            .ok_or_else(|| EngineError::NotFound(format!("candidate {}", candidate_id)))
    }

    /// Side-by-side comparison of two candidates on one posting
    pub async fn compare_candidates(
        &self,
        posting_id: &str,
        candidate_a: &str,
        candidate_b: &str,
        actor: &str,
    ) -> Result<Comparison, EngineError> {
        let posting = self.load_posting(posting_id).await?;
        let ctx = self.posting_context(posting).await?;

        let resume_a = self.resume_for_candidate(candidate_a, posting_id).await?;
        let resume_b = self.resume_for_candidate(candidate_b, posting_id).await?;

        let a = self.explain(&ctx, &resume_a, ScoreOptions::default()).await?;
        let b = self.explain(&ctx, &resume_b, ScoreOptions::default()).await?;
        let comparison = compare(&a, &b)?;

        self.record_audit(AuditRecord::new(
            actor,
            AuditAction::CompareCandidates,
            posting_id,
            vec![a.candidate_id.clone(), b.candidate_id.clone()],
            json!({ "a": candidate_a, "b": candidate_b }),
            false,
            result_hash([
                (a.candidate_id.as_str(), a.overall_score),
                (b.candidate_id.as_str(), b.overall_score),
            ]),
        ))
        .await?;

        Ok(comparison)
    }

    // ── Candidate-side recommendations ──────────────────────────────────

    /// Score every posting on file for one resume and return the best fits.
    /// Postings that cannot be scored are reported, never ranked.
    pub async fn recommend_postings(
        &self,
        resume_id: &str,
        search: &PostingSearch,
    ) -> Result<PostingRecommendations, EngineError> {
        search
            .validate()
            .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;

        let resume = self.load_resume(resume_id).await?;
        // without a usable resume embedding no posting can be scored
        self.load_embedding(EmbeddingSubject::Resume, resume_id, &resume.content_hash())
            .await?;

        let postings = self.profiles.list_postings().await?;
        tracing::info!("Scoring {} postings for resume {}", postings.len(), resume_id);

        let resume_ref = &resume;
        let outcomes: Vec<(String, Result<ScoredPosting, EngineError>)> = stream::iter(postings)
            .map(|posting| async move {
                let posting_id = posting.posting_id.clone();
                let result = async {
                    let ctx = self.posting_context(posting).await?;
                    let explanation = self.explain(&ctx, resume_ref, ScoreOptions::default()).await?;
                    let required = ctx.requirements.required.iter().map(|(key, _)| key.clone()).collect();
                    Ok::<_, EngineError>(ScoredPosting {
                        posting: ctx.posting,
                        required,
                        explanation,
                    })
                }
                .await;
                (posting_id, result)
            })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;

        let mut scored = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();
        for (posting_id, result) in outcomes {
            match result {
                Ok(posting) => scored.push(posting),
                Err(e) => {
                    tracing::warn!("Skipping posting {} for resume {}: {}", posting_id, resume_id, e);
                    failures.push(PostingFailure {
                        posting_id,
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        failures.sort_by(|a, b| a.posting_id.cmp(&b.posting_id));

        let page = rank_postings(scored, search, &self.taxonomy, Utc::now());

        Ok(PostingRecommendations {
            resume_id: resume.resume_id.clone(),
            candidate_id: resume.candidate_id.clone(),
            results: page.results,
            total_before_filter: page.total_before_filter,
            total_after_filter: page.total_after_filter,
            page: search.pagination.page,
            page_size: search.pagination.page_size,
            total_pages: page.total_pages,
            failures,
        })
    }

    // ── Fairness ────────────────────────────────────────────────────────

    /// Distribution checks over the given candidates' scores. The group
    /// attribute is only used when supplied with consent.
    pub async fn run_fairness_check(
        &self,
        posting_id: &str,
        candidate_ids: &[String],
        group_attribute: Option<&GroupAttribute>,
        top_k: Option<usize>,
        actor: &str,
    ) -> Result<FairnessCheckResult, EngineError> {
        if let Some(attribute) = group_attribute {
            if !attribute.consent {
                return Err(EngineError::ConsentRequired {
                    attribute: attribute.name.clone(),
                });
            }
        }
        if candidate_ids.is_empty() {
            return Err(EngineError::InvalidRequest("no candidates supplied".to_string()));
        }

        let posting = self.load_posting(posting_id).await?;
        let ctx = self.posting_context(posting).await?;

        let mut failures = Vec::new();
        let mut selections = Vec::new();
        for candidate_id in candidate_ids {
            match self.resume_for_candidate(candidate_id, posting_id).await {
                Ok(resume) => selections.push(Selection {
                    resume: Arc::new(resume),
                    application: None,
                    used_tailored: false,
                }),
                Err(e) => failures.push(failure(candidate_id, "", &e)),
            }
        }

        let (scored, batch_failures) = self.score_batch(&ctx, selections, false).await;
        failures.extend(batch_failures);

        let mut ranked: Vec<(String, f64)> = scored
            .into_iter()
            .map(|(_, e)| (e.candidate_id, e.overall_score))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let top_k = top_k.unwrap_or(self.config.fairness.default_top_k).max(1);
        let record = AuditRecord::new(
            actor,
            AuditAction::FairnessCheck,
            posting_id,
            ranked.iter().map(|(id, _)| id.clone()).collect(),
            json!({
                "topK": top_k,
                "groupAttribute": group_attribute.map(|a| a.name.clone()),
            }),
            false,
            result_hash(ranked.iter().map(|(id, s)| (id.as_str(), *s))),
        );
        let audit_id = record.audit_id;

        let evaluation = evaluate(audit_id, &ranked, group_attribute, top_k, &self.config.fairness)?;

        self.record_audit(record).await?;
        self.audit.append_fairness(evaluation.reports.clone()).await?;

        for report in evaluation.reports.iter().filter(|r| !r.passed) {
            tracing::warn!(
                "Fairness check {:?} failed for posting {}: {:.3} vs threshold {:.3}",
                report.metric_type,
                posting_id,
                report.value,
                report.threshold
            );
        }

        Ok(FairnessCheckResult {
            audit_id,
            posting_id: posting_id.to_string(),
            candidates_evaluated: ranked.len(),
            top_k,
            reports: evaluation.reports,
            groups: evaluation.groups,
            failures,
        })
    }

    // ── Extraction and indexing ─────────────────────────────────────────

    pub async fn extract_posting_skills(&self, description: &str) -> Result<SkillExtraction, EngineError> {
        let generator = self
            .generator
            .as_ref()
            .ok_or_else(|| EngineError::InvalidRequest("no text generator configured".to_string()))?;
        extract_posting_skills(
            generator.as_ref(),
            &self.taxonomy,
            description,
            self.config.generation_timeout,
        )
        .await
    }

    async fn embed(&self, text: &str) -> Result<Option<(Vec<f32>, String)>, EngineError> {
        let Some(embedder) = &self.embedder else {
            return Ok(None);
        };
        let limit = self.config.embedding_timeout;
        let vector = tokio::time::timeout(limit, embedder.embed(text))
            .await
            .map_err(|_| EngineError::ProviderTimeout { after: limit })??;
        Ok(Some((vector, embedder.model_id().to_string())))
    }

    /// Store a resume and, when an embedder is configured, its embedding
    pub async fn index_resume(&self, resume: ResumeProfile) -> Result<(), EngineError> {
        let resume_id = resume.resume_id.clone();
        let source_hash = resume.content_hash();
        let embedding = self.embed(&resume_embedding_text(&resume)).await?;

        self.profiles.put_resume(resume).await?;
        if let Some((vector, model)) = embedding {
            self.embeddings
                .put_embedding(
                    EmbeddingSubject::Resume,
                    &resume_id,
                    StoredEmbedding {
                        vector,
                        model,
                        source_hash,
                    },
                )
                .await?;
        }
        self.invalidate_resume(&resume_id);
        Ok(())
    }

    /// Validate and store a posting and, when an embedder is configured, its embedding
    pub async fn index_posting(&self, posting: PostingRequirements) -> Result<(), EngineError> {
        posting.check()?;
        let posting_id = posting.posting_id.clone();
        let source_hash = posting.content_hash();
        let embedding = self.embed(&posting_embedding_text(&posting)).await?;

        self.profiles.put_posting(posting).await?;
        if let Some((vector, model)) = embedding {
            self.embeddings
                .put_embedding(
                    EmbeddingSubject::Posting,
                    &posting_id,
                    StoredEmbedding {
                        vector,
                        model,
                        source_hash,
                    },
                )
                .await?;
        }
        self.invalidate_posting(&posting_id);
        Ok(())
    }

    pub async fn record_application(&self, application: Application) -> Result<(), EngineError> {
        self.load_posting(&application.posting_id).await?;
        let resume = self.load_resume(&application.resume_id).await?;
        if resume.candidate_id != application.candidate_id {
            return Err(EngineError::InvalidRequest(format!(
                "resume {} does not belong to candidate {}",
                application.resume_id, application.candidate_id
            )));
        }
        self.profiles.put_application(application).await?;
        Ok(())
    }

    pub fn invalidate_posting(&self, posting_id: &str) {
        if let Err(e) = self.cache.invalidate_posting(posting_id) {
            tracing::error!("{}", e);
        }
    }

    pub fn invalidate_resume(&self, resume_id: &str) {
        if let Err(e) = self.cache.invalidate_resume(resume_id) {
            tracing::error!("{}", e);
        }
    }

    pub async fn audit_trail(&self, posting_id: &str) -> Result<Vec<AuditRecord>, EngineError> {
        Ok(self.audit.audit_trail(posting_id).await?)
    }

    /// Latest stored explanation for a pair, as last computed
    pub async fn stored_explanation(
        &self,
        posting_id: &str,
        resume_id: &str,
        blind_mode: bool,
    ) -> Result<Option<MatchExplanation>, EngineError> {
        Ok(self.results.get_explanation(posting_id, resume_id, blind_mode).await?)
    }

    /// Every generation call made for a pair, failed ones included
    pub async fn generation_attempts(
        &self,
        posting_id: &str,
        resume_id: &str,
    ) -> Result<Vec<GenerationAttempt>, EngineError> {
        Ok(self.results.generation_attempts(posting_id, resume_id).await?)
    }

    pub async fn fairness_reports(&self, audit_id: Uuid) -> Result<Vec<crate::models::FairnessReport>, EngineError> {
        Ok(self.audit.fairness_reports(audit_id).await?)
    }
}
