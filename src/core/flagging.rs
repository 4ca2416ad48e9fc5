use std::collections::{BTreeMap, BTreeSet};

use crate::models::{DuplicateFlag, FlagReason, ResumeProfile};

/// Digits only; `None` when nothing is left
pub fn normalize_phone(phone: Option<&str>) -> Option<String> {
    let digits: String = phone?.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

/// Lowercase, without scheme, `www.` prefix or trailing slashes
pub fn normalize_url(url: Option<&str>) -> Option<String> {
    let url = url?.trim().to_lowercase();
    let url = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(&url);
    let url = url.strip_prefix("www.").unwrap_or(url);
    let url = url.trim_end_matches('/');
    if url.is_empty() {
        None
    } else {
        Some(url.to_string())
    }
}

impl FlagReason {
    pub fn label(&self) -> &'static str {
        match self {
            FlagReason::SameMobile => "Mobile number",
            FlagReason::SameLinkedin => "LinkedIn",
            FlagReason::SameGithub => "GitHub",
        }
    }
}

/// "Same Mobile number & LinkedIn"
pub fn format_flag_reason(reasons: &[FlagReason]) -> String {
    let labels: Vec<&str> = reasons.iter().map(FlagReason::label).collect();
    match labels.as_slice() {
        [] => String::new(),
        [only] => format!("Same {}", only),
        [init @ .., last] => format!("Same {} & {}", init.join(", "), last),
    }
}

fn contact_value(resume: &ResumeProfile, reason: FlagReason) -> Option<String> {
    let identity = &resume.identity;
    match reason {
        FlagReason::SameMobile => normalize_phone(identity.phone.as_deref()),
        FlagReason::SameLinkedin => normalize_url(identity.linkedin_url.as_deref()),
        FlagReason::SameGithub => normalize_url(identity.github_url.as_deref()),
    }
}

/// Find candidates sharing contact details. Several resumes of one candidate
/// never flag each other.
pub fn detect_duplicates<'a>(
    resumes: impl IntoIterator<Item = &'a ResumeProfile>,
) -> BTreeMap<String, Vec<DuplicateFlag>> {
    let resumes: Vec<&ResumeProfile> = resumes.into_iter().collect();
    let mut flags: BTreeMap<String, Vec<DuplicateFlag>> = BTreeMap::new();

    for reason in [FlagReason::SameMobile, FlagReason::SameLinkedin, FlagReason::SameGithub] {
        let mut owners: BTreeMap<String, BTreeSet<&str>> = BTreeMap::new();
        for resume in &resumes {
            if let Some(value) = contact_value(resume, reason) {
                owners.entry(value).or_default().insert(resume.candidate_id.as_str());
            }
        }

        let mut collisions: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for ids in owners.values().filter(|ids| ids.len() > 1) {
            for id in ids {
                let others = collisions.entry(*id).or_default();
                others.extend(ids.iter().filter(|other| *other != id));
            }
        }

        for (id, others) in collisions {
            flags.entry(id.to_string()).or_default().push(DuplicateFlag {
                reason,
                matched_candidate_ids: others.into_iter().map(str::to_string).collect(),
            });
        }
    }

    flags
}
