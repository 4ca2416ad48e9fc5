use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::core::explain::short_reason;
use crate::core::filters::matches_filters;
use crate::core::fingerprint::hash_parts;
use crate::core::taxonomy::SkillTaxonomy;
use crate::models::{
    Application, DuplicateFlag, MatchExplanation, Pagination, PostingFilters, PostingMatch,
    PostingRequirements, PostingSearch, PostingSortKey, RankedCandidate, RankingFilters,
    ResumeProfile, SortKey, SortOrder, SortSpec,
};

/// One scored candidate with the facts filters and sort keys read.
/// `resume` is always the unredacted profile; `explanation` may be blinded.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub explanation: MatchExplanation,
    pub resume: Arc<ResumeProfile>,
    /// canonical skills found anywhere on the resume
    pub skills: BTreeSet<String>,
    pub application: Option<Application>,
    pub flags: Vec<DuplicateFlag>,
    pub used_tailored: bool,
}

impl ScoredCandidate {
    pub fn candidate_id(&self) -> &str {
        &self.explanation.candidate_id
    }

    pub fn is_flagged(&self) -> bool {
        !self.flags.is_empty()
    }

    /// Application time, or the resume extraction time for non-applicants
    pub fn activity_date(&self) -> DateTime<Utc> {
        self.application
            .as_ref()
            .map(|app| app.submitted_at)
            .unwrap_or(self.resume.parsed_at)
    }

    /// Headline, falling back to the most recent role title
    pub fn title(&self) -> String {
        self.resume
            .headline
            .clone()
            .or_else(|| self.resume.experiences.first().map(|r| r.title.clone()))
            .unwrap_or_default()
            .to_lowercase()
    }

    fn into_ranked(self, rank: usize) -> RankedCandidate {
        RankedCandidate {
            rank,
            candidate_id: self.explanation.candidate_id.clone(),
            resume_id: self.explanation.resume_id.clone(),
            used_tailored_resume: self.used_tailored,
            overall_score: self.explanation.overall_score,
            recommendation: self.explanation.recommendation,
            short_reason: short_reason(&self.explanation),
            is_flagged: !self.flags.is_empty(),
            flags: self.flags,
            explanation: self.explanation,
        }
    }
}

/// Result of the filter, sort and paginate stages
#[derive(Debug)]
pub struct RankedPage {
    pub results: Vec<RankedCandidate>,
    pub total_before_filter: usize,
    pub total_after_filter: usize,
    pub total_pages: u32,
    /// Hash over the full ordered (candidate, score) list after filtering
    pub result_hash: String,
    pub ordered_ids: Vec<String>,
}

fn compare_by_key(a: &ScoredCandidate, b: &ScoredCandidate, key: SortKey) -> Ordering {
    match key {
        SortKey::Score => a
            .explanation
            .overall_score
            .partial_cmp(&b.explanation.overall_score)
            .unwrap_or(Ordering::Equal),
        SortKey::Date => a.activity_date().cmp(&b.activity_date()),
        SortKey::Title => a.title().cmp(&b.title()),
        SortKey::Experience => a
            .resume
            .total_years()
            .partial_cmp(&b.resume.total_years())
            .unwrap_or(Ordering::Equal),
    }
}

/// Order by the requested key, then candidate id ascending regardless of direction
pub fn sort_candidates(candidates: &mut [ScoredCandidate], sort: SortSpec) {
    candidates.sort_by(|a, b| {
        let primary = compare_by_key(a, b, sort.key);
        let primary = match sort.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary
            .then_with(|| a.candidate_id().cmp(b.candidate_id()))
            .then_with(|| a.explanation.resume_id.cmp(&b.explanation.resume_id))
    });
}

pub fn total_pages(total: usize, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size as usize) as u32
}

/// Fingerprint of an ordered result list, recorded in the audit trail
pub fn result_hash<'a>(entries: impl IntoIterator<Item = (&'a str, f64)>) -> String {
    let parts: Vec<String> = entries
        .into_iter()
        .map(|(id, score)| format!("{}:{:.4}", id, score))
        .collect();
    hash_parts(&parts)
}

/// Filter, sort and paginate a scored set. Never rescores.
#[derive(Debug, Clone)]
pub struct Ranker<'a> {
    posting: &'a PostingRequirements,
    taxonomy: &'a SkillTaxonomy,
}

impl<'a> Ranker<'a> {
    pub fn new(posting: &'a PostingRequirements, taxonomy: &'a SkillTaxonomy) -> Self {
        Self { posting, taxonomy }
    }

    pub fn rank(
        &self,
        candidates: Vec<ScoredCandidate>,
        filters: &RankingFilters,
        sort: SortSpec,
        pagination: Pagination,
    ) -> RankedPage {
        let total_before_filter = candidates.len();

        let mut kept: Vec<ScoredCandidate> = candidates
            .into_iter()
            .filter(|c| matches_filters(c, filters, self.posting, self.taxonomy))
            .collect();

        sort_candidates(&mut kept, sort);

        let total_after_filter = kept.len();
        let result_hash = result_hash(
            kept.iter()
                .map(|c| (c.candidate_id(), c.explanation.overall_score)),
        );
        let ordered_ids = kept.iter().map(|c| c.candidate_id().to_string()).collect();

        let page_size = pagination.page_size.max(1) as usize;
        let offset = (pagination.page.max(1) as usize - 1) * page_size;

        let results = kept
            .into_iter()
            .enumerate()
            .skip(offset)
            .take(page_size)
            .map(|(i, c)| c.into_ranked(i + 1))
            .collect();

        RankedPage {
            results,
            total_before_filter,
            total_after_filter,
            total_pages: total_pages(total_after_filter, pagination.page_size),
            result_hash,
            ordered_ids,
        }
    }
}

/// One posting scored against a single resume
#[derive(Debug, Clone)]
pub struct ScoredPosting {
    pub posting: PostingRequirements,
    /// canonical required skill keys
    pub required: Vec<String>,
    pub explanation: MatchExplanation,
}

impl ScoredPosting {
    fn into_match(self, rank: usize) -> PostingMatch {
        PostingMatch {
            rank,
            posting_id: self.posting.posting_id,
            title: self.posting.title,
            company: self.posting.company,
            location: self.posting.location,
            posted_at: self.posting.posted_at,
            required_skills: self.required,
            overall_score: self.explanation.overall_score,
            confidence: self.explanation.confidence,
            recommendation: self.explanation.recommendation,
            component_scores: self.explanation.component_scores,
            summary: self.explanation.summary,
        }
    }
}

#[derive(Debug)]
pub struct PostingPage {
    pub results: Vec<PostingMatch>,
    pub total_before_filter: usize,
    pub total_after_filter: usize,
    pub total_pages: u32,
}

fn posting_passes(
    scored: &ScoredPosting,
    filters: &PostingFilters,
    wanted_skills: &BTreeSet<String>,
    now: DateTime<Utc>,
) -> bool {
    let score = scored.explanation.overall_score;
    if filters.min_score.is_some_and(|min| score < min) {
        return false;
    }
    if filters.max_score.is_some_and(|max| score > max) {
        return false;
    }
    if !wanted_skills.is_empty() && !scored.required.iter().any(|s| wanted_skills.contains(s)) {
        return false;
    }
    if let Some(wanted) = filters.location.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(location) = scored.posting.location.as_deref() else {
            return false;
        };
        if !location.to_lowercase().contains(&wanted.to_lowercase()) {
            return false;
        }
    }
    if let Some(days) = filters.posted_within_days {
        if (now - scored.posting.posted_at).num_days() > days {
            return false;
        }
    }
    true
}

/// Filter, sort and paginate postings scored for one candidate. Ties break
/// on posting id ascending.
pub fn rank_postings(
    postings: Vec<ScoredPosting>,
    search: &PostingSearch,
    taxonomy: &SkillTaxonomy,
    now: DateTime<Utc>,
) -> PostingPage {
    let total_before_filter = postings.len();
    let wanted_skills: BTreeSet<String> = search
        .filters
        .skills
        .iter()
        .map(|s| taxonomy.lookup(s).key())
        .collect();

    let mut kept: Vec<ScoredPosting> = postings
        .into_iter()
        .filter(|p| posting_passes(p, &search.filters, &wanted_skills, now))
        .collect();

    kept.sort_by(|a, b| {
        let primary = match search.sort.key {
            PostingSortKey::Score => a
                .explanation
                .overall_score
                .partial_cmp(&b.explanation.overall_score)
                .unwrap_or(Ordering::Equal),
            PostingSortKey::Date => a.posting.posted_at.cmp(&b.posting.posted_at),
            PostingSortKey::Title => a.posting.title.to_lowercase().cmp(&b.posting.title.to_lowercase()),
        };
        let primary = match search.sort.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.posting.posting_id.cmp(&b.posting.posting_id))
    });

    let total_after_filter = kept.len();
    let page_size = search.pagination.page_size.max(1) as usize;
    let offset = (search.pagination.page.max(1) as usize - 1) * page_size;

    PostingPage {
        results: kept
            .into_iter()
            .enumerate()
            .skip(offset)
            .take(page_size)
            .map(|(i, p)| p.into_match(i + 1))
            .collect(),
        total_before_filter,
        total_after_filter,
        total_pages: total_pages(total_after_filter, search.pagination.page_size),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{
        ComponentScores, EducationAnalysis, EducationMatchLevel, ExperienceAnalysis, Provenance,
    };
    use chrono::TimeZone;

    pub(crate) fn scored(candidate: &str, overall: f64) -> ScoredCandidate {
        let parsed_at = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
        let resume = ResumeProfile {
            resume_id: format!("r-{}", candidate),
            candidate_id: candidate.to_string(),
            identity: Default::default(),
            headline: None,
            experiences: vec![],
            projects: vec![],
            education: vec![],
            skills: vec![],
            certifications: vec![],
            is_tailored: false,
            tailored_for: None,
            parsed_at,
        };
        let explanation = MatchExplanation {
            candidate_id: candidate.to_string(),
            resume_id: resume.resume_id.clone(),
            posting_id: "p1".to_string(),
            overall_score: overall,
            confidence: 1.0,
            recommendation: crate::core::aggregate::tier(overall, &Default::default()),
            component_scores: ComponentScores::default(),
            component_confidence: ComponentScores::default(),
            matched_skills: vec![],
            missing_skills: vec![],
            experience_analysis: ExperienceAnalysis {
                total_years: 0.0,
                relevant_years: 0.0,
                min_years: 0.0,
                preferred_years: 0.0,
                gap_years: 0.0,
                dated_roles: 0,
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
                computed_at: parsed_at,
            },
        };
        ScoredCandidate {
            explanation,
            resume: Arc::new(resume),
            skills: BTreeSet::new(),
            application: None,
            flags: vec![],
            used_tailored: false,
        }
    }

    fn posting() -> PostingRequirements {
        serde_json::from_value(serde_json::json!({
            "postingId": "p1",
            "title": "Backend Intern",
            "postedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn test_sorted_by_score_with_id_tie_break() {
        let mut candidates = vec![scored("b", 70.0), scored("c", 90.0), scored("a", 70.0)];
        sort_candidates(&mut candidates, SortSpec::default());
        let ids: Vec<&str> = candidates.iter().map(|c| c.candidate_id()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        sort_candidates(
            &mut candidates,
            SortSpec {
                key: SortKey::Score,
                order: SortOrder::Asc,
            },
        );
        let ids: Vec<&str> = candidates.iter().map(|c| c.candidate_id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_pagination() {
        let posting = posting();
        let taxonomy = SkillTaxonomy::builtin();
        let ranker = Ranker::new(&posting, &taxonomy);
        let candidates: Vec<ScoredCandidate> = (0..25)
            .map(|i| scored(&format!("c{:02}", i), 50.0 + i as f64))
            .collect();

        let page = ranker.rank(
            candidates,
            &RankingFilters::default(),
            SortSpec::default(),
            Pagination { page: 3, page_size: 10 },
        );

        assert_eq!(page.total_before_filter, 25);
        assert_eq!(page.total_after_filter, 25);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.results.len(), 5);
        assert_eq!(page.results[0].rank, 21);
        assert_eq!(page.results[0].candidate_id, "c04");
    }

    #[test]
    fn test_page_past_end_is_empty() {
        let posting = posting();
        let taxonomy = SkillTaxonomy::builtin();
        let ranker = Ranker::new(&posting, &taxonomy);
        let page = ranker.rank(
            vec![scored("a", 50.0)],
            &RankingFilters::default(),
            SortSpec::default(),
            Pagination { page: 4, page_size: 10 },
        );
        assert!(page.results.is_empty());
        assert_eq!(page.total_after_filter, 1);
    }

    #[test]
    fn test_filters_applied_before_pagination() {
        let posting = posting();
        let taxonomy = SkillTaxonomy::builtin();
        let ranker = Ranker::new(&posting, &taxonomy);
        let filters = RankingFilters {
            min_score: Some(60.0),
            ..Default::default()
        };
        let page = ranker.rank(
            vec![scored("a", 50.0), scored("b", 65.0), scored("c", 80.0)],
            &filters,
            SortSpec::default(),
            Pagination::default(),
        );
        assert_eq!(page.total_before_filter, 3);
        assert_eq!(page.total_after_filter, 2);
        assert_eq!(page.ordered_ids, vec!["c", "b"]);
    }

    fn scored_posting(id: &str, overall: f64, location: Option<&str>, required: &[&str], days_old: i64) -> ScoredPosting {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let mut posting = posting();
        posting.posting_id = id.to_string();
        posting.title = format!("Intern {}", id);
        posting.location = location.map(str::to_string);
        posting.posted_at = now - chrono::Duration::days(days_old);
        let mut explanation = scored("c1", overall).explanation;
        explanation.posting_id = id.to_string();
        ScoredPosting {
            posting,
            required: required.iter().map(|s| s.to_string()).collect(),
            explanation,
        }
    }

    #[test]
    fn test_rank_postings_filters_sorts_and_pages() {
        let taxonomy = SkillTaxonomy::builtin();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let postings = vec![
            scored_posting("p-a", 72.0, Some("Berlin"), &["React"], 3),
            scored_posting("p-b", 88.0, Some("Munich"), &["Python"], 3),
            scored_posting("p-c", 72.0, Some("Berlin, Germany"), &["React", "Node.js"], 40),
            scored_posting("p-d", 95.0, None, &["React"], 1),
        ];

        let page = rank_postings(postings.clone(), &PostingSearch::default(), &taxonomy, now);
        let ids: Vec<&str> = page.results.iter().map(|m| m.posting_id.as_str()).collect();
        assert_eq!(ids, vec!["p-d", "p-b", "p-a", "p-c"]);
        assert_eq!(page.results[0].rank, 1);

        let search = PostingSearch {
            filters: PostingFilters {
                skills: vec!["reactjs".to_string()],
                location: Some("berlin".to_string()),
                posted_within_days: Some(30),
                ..Default::default()
            },
            ..Default::default()
        };
        let page = rank_postings(postings.clone(), &search, &taxonomy, now);
        assert_eq!(page.total_before_filter, 4);
        assert_eq!(page.total_after_filter, 1);
        assert_eq!(page.results[0].posting_id, "p-a");

        let search = PostingSearch {
            filters: PostingFilters {
                min_score: Some(80.0),
                ..Default::default()
            },
            pagination: Pagination { page: 2, page_size: 1 },
            ..Default::default()
        };
        let page = rank_postings(postings, &search, &taxonomy, now);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.results.len(), 1);
        assert_eq!(page.results[0].posting_id, "p-b");
        assert_eq!(page.results[0].rank, 2);
    }

    #[test]
    fn test_result_hash_depends_on_order() {
        let forward = result_hash(vec![("a", 80.0), ("b", 70.0)]);
        let reversed = result_hash(vec![("b", 70.0), ("a", 80.0)]);
        assert_ne!(forward, reversed);
        assert_eq!(forward, result_hash(vec![("a", 80.0), ("b", 70.0)]));
    }
}
