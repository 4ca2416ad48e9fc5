use crate::models::{CandidateIdentity, ResumeProfile};

pub const CANDIDATE_PLACEHOLDER: &str = "[candidate]";
pub const INSTITUTION_PLACEHOLDER: &str = "[institution]";

const MIN_NAME_TOKEN: usize = 2;

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
}

/// Replace whole-word occurrences of `needle`, ignoring ASCII case
pub fn replace_whole_word(text: &str, needle: &str, placeholder: &str) -> String {
    let needle = needle.trim();
    if needle.is_empty() || text.len() < needle.len() {
        return text.to_string();
    }

    let haystack = text.to_ascii_lowercase();
    let target = needle.to_ascii_lowercase();
    let bytes = text.as_bytes();

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut search_from = 0;

    while let Some(found) = haystack[search_from..].find(&target) {
        let start = search_from + found;
        let end = start + target.len();
        let left_ok = start == 0 || !is_word_byte(bytes[start - 1]);
        let right_ok = end == bytes.len() || !is_word_byte(bytes[end]);

        if left_ok && right_ok {
            out.push_str(&text[cursor..start]);
            out.push_str(placeholder);
            cursor = end;
            // replaced text is consumed; overlapping matches are not
            search_from = end;
            continue;
        }
        search_from = match haystack[start..].chars().next() {
            Some(c) => start + c.len_utf8(),
            None => break,
        };
    }

    out.push_str(&text[cursor..]);
    out
}

/// Scrub every identity-correlated string out of free text
fn scrub(text: &str, names: &[String], institutions: &[String]) -> String {
    let mut result = text.to_string();
    for institution in institutions {
        result = replace_whole_word(&result, institution, INSTITUTION_PLACEHOLDER);
    }
    for name in names {
        result = replace_whole_word(&result, name, CANDIDATE_PLACEHOLDER);
    }
    result
}

/// Terms to strip: the full name first, then each token of it
fn name_terms(identity: &CandidateIdentity) -> Vec<String> {
    let Some(name) = identity.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
        return Vec::new();
    };
    let mut terms = vec![name.to_string()];
    terms.extend(
        name.split_whitespace()
            .filter(|t| t.chars().count() >= MIN_NAME_TOKEN)
            .map(str::to_string),
    );
    terms
}

/// Copy of the resume with name, photo, location, contact links and
/// institution names removed, including mentions inside evidence text.
/// Ids are kept so results can still be joined back.
pub fn redact(resume: &ResumeProfile) -> ResumeProfile {
    let names = name_terms(&resume.identity);
    let mut institutions: Vec<String> = resume
        .education
        .iter()
        .filter_map(|e| e.institution.as_deref())
        .map(str::trim)
        .filter(|i| !i.is_empty())
        .map(str::to_string)
        .collect();
    // longest first so "MIT Media Lab" goes before "MIT"
    institutions.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    institutions.dedup();

    let mut redacted = resume.clone();
    redacted.identity = CandidateIdentity::default();
    redacted.headline = resume.headline.as_deref().map(|h| scrub(h, &names, &institutions));

    for role in &mut redacted.experiences {
        role.evidence_text = scrub(&role.evidence_text, &names, &institutions);
    }
    for project in &mut redacted.projects {
        project.evidence_text = scrub(&project.evidence_text, &names, &institutions);
        project.title = scrub(&project.title, &names, &institutions);
    }
    for education in &mut redacted.education {
        education.institution = None;
    }
    for cert in &mut redacted.certifications {
        cert.evidence_text = scrub(&cert.evidence_text, &names, &institutions);
    }

    redacted
}
