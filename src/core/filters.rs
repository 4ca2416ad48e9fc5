use crate::core::matcher::ScoredCandidate;
use crate::core::taxonomy::{degree_level, SkillTaxonomy};
use crate::models::{PostingRequirements, RankingFilters, SkillPresence};

/// Check the overall score against the requested range
#[inline]
pub fn matches_score_range(candidate: &ScoredCandidate, filters: &RankingFilters) -> bool {
    let score = candidate.explanation.overall_score;
    if let Some(min) = filters.min_score {
        if score < min {
            return false;
        }
    }
    if let Some(max) = filters.max_score {
        if score > max {
            return false;
        }
    }
    true
}

/// Skill presence, compared on canonical names
#[inline]
pub fn matches_skills(
    candidate: &ScoredCandidate,
    filters: &RankingFilters,
    taxonomy: &SkillTaxonomy,
) -> bool {
    let Some(filter) = &filters.skills else {
        return true;
    };
    let mut wanted = filter
        .skills
        .iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| taxonomy.lookup(s).key())
        .peekable();

    if wanted.peek().is_none() {
        return true;
    }

    match filter.mode {
        SkillPresence::All => wanted.all(|key| candidate.skills.contains(&key)),
        SkillPresence::Any => wanted.any(|key| candidate.skills.contains(&key)),
    }
}

#[inline]
pub fn matches_location(candidate: &ScoredCandidate, filters: &RankingFilters) -> bool {
    if filters.locations.is_empty() {
        return true;
    }
    let Some(location) = candidate.resume.identity.location.as_deref() else {
        return false;
    };
    let location = location.to_lowercase();
    filters
        .locations
        .iter()
        .any(|wanted| location.contains(&wanted.trim().to_lowercase()))
}

/// Days between the posting going up and the candidate's activity date
#[inline]
pub fn matches_posting_age(
    candidate: &ScoredCandidate,
    filters: &RankingFilters,
    posting: &PostingRequirements,
) -> bool {
    let Some(days) = filters.posted_within_days else {
        return true;
    };
    let elapsed = candidate.activity_date() - posting.posted_at;
    elapsed.num_days() <= days
}

#[inline]
pub fn matches_experience_range(candidate: &ScoredCandidate, filters: &RankingFilters) -> bool {
    let years = candidate.resume.total_years();
    if let Some(min) = filters.min_experience_years {
        if years < min {
            return false;
        }
    }
    if let Some(max) = filters.max_experience_years {
        if years > max {
            return false;
        }
    }
    true
}

#[inline]
pub fn matches_education(candidate: &ScoredCandidate, filters: &RankingFilters) -> bool {
    let Some(required) = filters.min_education.as_deref() else {
        return true;
    };
    let required = degree_level(required).unwrap_or(0);
    let highest = candidate
        .resume
        .education
        .iter()
        .filter_map(|e| degree_level(&e.degree))
        .max()
        .unwrap_or(0);
    highest >= required
}

#[inline]
pub fn matches_application_status(candidate: &ScoredCandidate, filters: &RankingFilters) -> bool {
    if filters.application_statuses.is_empty() {
        return true;
    }
    candidate
        .application
        .as_ref()
        .map(|app| filters.application_statuses.contains(&app.status))
        .unwrap_or(false)
}

/// Every filter in one pass. Pure over the scored set.
pub fn matches_filters(
    candidate: &ScoredCandidate,
    filters: &RankingFilters,
    posting: &PostingRequirements,
    taxonomy: &SkillTaxonomy,
) -> bool {
    if filters.exclude_flagged && candidate.is_flagged() {
        return false;
    }

    matches_score_range(candidate, filters)
        && matches_skills(candidate, filters, taxonomy)
        && matches_location(candidate, filters)
        && matches_posting_age(candidate, filters, posting)
        && matches_experience_range(candidate, filters)
        && matches_education(candidate, filters)
        && matches_application_status(candidate, filters)
}
