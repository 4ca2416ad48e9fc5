use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use strsim::damerau_levenshtein;
use thiserror::Error;

use crate::core::fingerprint::hash_bytes;
use crate::models::{SkillCategory, SkillEntry};

pub const BUILTIN_VERSION: &str = "builtin-1";

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to parse taxonomy: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to read taxonomy file: {0}")]
    Io(#[from] std::io::Error),

    #[error("alias {alias} maps to both {first} and {second}")]
    ConflictingAlias {
        alias: String,
        first: String,
        second: String,
    },

    #[error("empty skill name in taxonomy")]
    EmptyName,
}

/// How a raw term was resolved onto a canonical skill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Alias,
    Fuzzy { distance: usize },
}

impl MatchKind {
    pub fn confidence(&self) -> f64 {
        match self {
            MatchKind::Exact => 1.0,
            MatchKind::Alias => 0.95,
            MatchKind::Fuzzy { .. } => 0.8,
        }
    }
}

/// Result of a taxonomy lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SkillMatch {
    Matched {
        canonical: String,
        category: SkillCategory,
        kind: MatchKind,
    },
    Unmatched {
        raw: String,
    },
}

impl SkillMatch {
    /// Comparison key: the canonical name, or the trimmed lowercase raw term
    pub fn key(&self) -> String {
        match self {
            SkillMatch::Matched { canonical, .. } => canonical.clone(),
            SkillMatch::Unmatched { raw } => raw.trim().to_lowercase(),
        }
    }

    pub fn confidence(&self) -> f64 {
        match self {
            SkillMatch::Matched { kind, .. } => kind.confidence(),
            SkillMatch::Unmatched { .. } => 1.0,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, SkillMatch::Matched { .. })
    }
}

/// Typo tolerance for lookups
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FuzzyConfig {
    #[serde(default = "default_max_edits")]
    pub max_edits: usize,
    #[serde(default = "default_min_len")]
    pub min_len: usize,
}

fn default_max_edits() -> usize { 1 }
fn default_min_len() -> usize { 4 }

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            max_edits: default_max_edits(),
            min_len: default_min_len(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct FieldEntry {
    name: String,
    #[serde(default)]
    aliases: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TaxonomyFile {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    skills: Vec<SkillEntry>,
    #[serde(default)]
    fields: Vec<FieldEntry>,
}

/// Canonical skill vocabulary with alias and typo-tolerant lookup.
///
/// Also carries field-of-study synonyms used when comparing education.
#[derive(Debug, Clone)]
pub struct SkillTaxonomy {
    version: String,
    entries: Vec<SkillEntry>,
    /// compact key -> (entry index, is canonical name)
    lookup: HashMap<String, (usize, bool)>,
    /// keys that only resolve in lists, never in prose
    list_only: HashSet<String>,
    /// sorted for deterministic fuzzy tie-breaking
    fuzzy_keys: Vec<(String, usize)>,
    fields: HashMap<String, String>,
    fuzzy: FuzzyConfig,
}

/// Lowercase and drop separators so "Node.js", "node js" and "NodeJS" share a key
pub fn compact_key(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-' | '_' | '\t'))
        .collect()
}

impl SkillTaxonomy {
    pub fn builtin() -> Self {
        let skills = BUILTIN_SKILLS
            .iter()
            .map(|(name, category, aliases, list_only)| SkillEntry {
                name: name.to_string(),
                category: *category,
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
                list_only_aliases: list_only.iter().map(|a| a.to_string()).collect(),
            })
            .collect();
        let fields = BUILTIN_FIELDS
            .iter()
            .map(|(name, aliases)| FieldEntry {
                name: name.to_string(),
                aliases: aliases.iter().map(|a| a.to_string()).collect(),
            })
            .collect();

        // the builtin table has no conflicting aliases; see test_builtin_builds
        Self::build(BUILTIN_VERSION.to_string(), skills, fields, FuzzyConfig::default())
            .unwrap_or_else(|_| Self::empty())
    }

    fn empty() -> Self {
        Self {
            version: BUILTIN_VERSION.to_string(),
            entries: Vec::new(),
            lookup: HashMap::new(),
            list_only: HashSet::new(),
            fuzzy_keys: Vec::new(),
            fields: HashMap::new(),
            fuzzy: FuzzyConfig::default(),
        }
    }

    /// Load a taxonomy from TOML:
    ///
    /// ```toml
    /// version = "campus-2024"
    /// [[skills]]
    /// name = "React"
    /// category = "tech"
    /// aliases = ["reactjs"]
    /// [[fields]]
    /// name = "Computer Science"
    /// aliases = ["cs"]
    /// ```
    pub fn from_toml_str(source: &str) -> Result<Self, TaxonomyError> {
        let file: TaxonomyFile = toml::from_str(source)?;
        let version = file
            .version
            .unwrap_or_else(|| format!("custom-{}", &hash_bytes(source.as_bytes())[..12]));
        Self::build(version, file.skills, file.fields, FuzzyConfig::default())
    }

    pub fn with_fuzzy(mut self, fuzzy: FuzzyConfig) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    fn build(
        version: String,
        entries: Vec<SkillEntry>,
        fields: Vec<FieldEntry>,
        fuzzy: FuzzyConfig,
    ) -> Result<Self, TaxonomyError> {
        let mut lookup: HashMap<String, (usize, bool)> = HashMap::new();
        let mut prose_keys: HashSet<String> = HashSet::new();
        let mut list_only: HashSet<String> = HashSet::new();

        for (index, entry) in entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(TaxonomyError::EmptyName);
            }
            let names = std::iter::once((&entry.name, true, true))
                .chain(entry.aliases.iter().map(|a| (a, false, true)))
                .chain(entry.list_only_aliases.iter().map(|a| (a, false, false)));
            for (term, is_canonical, in_prose) in names {
                let key = compact_key(term);
                if key.is_empty() {
                    continue;
                }
                if in_prose {
                    prose_keys.insert(key.clone());
                } else {
                    list_only.insert(key.clone());
                }
                match lookup.get(&key) {
                    Some((existing, _)) if *existing != index => {
                        return Err(TaxonomyError::ConflictingAlias {
                            alias: term.clone(),
                            first: entries[*existing].name.clone(),
                            second: entry.name.clone(),
                        });
                    }
                    Some((_, true)) => {}
                    _ => {
                        lookup.insert(key, (index, is_canonical));
                    }
                }
            }
        }

        list_only.retain(|key| !prose_keys.contains(key));

        let mut fuzzy_keys: Vec<(String, usize)> = lookup
            .iter()
            .map(|(key, (index, _))| (key.clone(), *index))
            .collect();
        fuzzy_keys.sort();

        let mut field_map = HashMap::new();
        for field in fields {
            field_map.insert(compact_key(&field.name), field.name.clone());
            for alias in &field.aliases {
                field_map.insert(compact_key(alias), field.name.clone());
            }
        }

        Ok(Self {
            version,
            entries,
            lookup,
            list_only,
            fuzzy_keys,
            fields: field_map,
            fuzzy,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn entries(&self) -> &[SkillEntry] {
        &self.entries
    }

    /// Resolve a single term onto the vocabulary
    pub fn lookup(&self, term: &str) -> SkillMatch {
        let key = compact_key(term);
        if key.is_empty() {
            return SkillMatch::Unmatched {
                raw: term.trim().to_string(),
            };
        }

        if let Some((index, is_canonical)) = self.lookup.get(&key) {
            let entry = &self.entries[*index];
            return SkillMatch::Matched {
                canonical: entry.name.clone(),
                category: entry.category,
                kind: if *is_canonical { MatchKind::Exact } else { MatchKind::Alias },
            };
        }

        if let Some((index, distance)) = self.fuzzy_match(&key) {
            let entry = &self.entries[index];
            return SkillMatch::Matched {
                canonical: entry.name.clone(),
                category: entry.category,
                kind: MatchKind::Fuzzy { distance },
            };
        }

        SkillMatch::Unmatched {
            raw: term.trim().to_string(),
        }
    }

    fn fuzzy_match(&self, key: &str) -> Option<(usize, usize)> {
        if self.fuzzy.max_edits == 0 || key.chars().count() < self.fuzzy.min_len {
            return None;
        }

        let mut best: Option<(usize, usize)> = None;
        for (candidate, index) in &self.fuzzy_keys {
            if candidate.chars().count() < self.fuzzy.min_len {
                continue;
            }
            let distance = damerau_levenshtein(key, candidate);
            if distance == 0 || distance > self.fuzzy.max_edits {
                continue;
            }
            match best {
                Some((_, best_distance)) if distance >= best_distance => {}
                _ => best = Some((*index, distance)),
            }
        }
        best
    }

    /// Resolve raw text (possibly a list like "React / Node.js, SQL") into
    /// canonical skills. Unknown terms pass through lowercased.
    pub fn resolve(&self, raw_text: &str) -> BTreeSet<String> {
        let whole = self.lookup(raw_text);
        if whole.is_matched() {
            return BTreeSet::from([whole.key()]);
        }

        raw_text
            .split(|c: char| matches!(c, ',' | ';' | '/' | '|' | '\n' | '(' | ')'))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|segment| self.lookup(segment).key())
            .collect()
    }

    pub fn categorize(&self, skill_name: &str) -> SkillCategory {
        match self.lookup(skill_name) {
            SkillMatch::Matched { category, .. } => category,
            SkillMatch::Unmatched { .. } => SkillCategory::Other,
        }
    }

    pub fn aliases_of(&self, skill_name: &str) -> Vec<String> {
        match self.lookup(skill_name) {
            SkillMatch::Matched { canonical, .. } => self
                .entries
                .iter()
                .find(|e| e.name == canonical)
                .map(|e| e.aliases.iter().chain(&e.list_only_aliases).cloned().collect())
                .unwrap_or_default(),
            SkillMatch::Unmatched { .. } => Vec::new(),
        }
    }

    /// Known skills mentioned in free text. Canonical names and prose-safe
    /// aliases only; typo tolerance and list-only aliases produce false
    /// positives on ordinary words.
    pub fn mentions(&self, text: &str) -> BTreeSet<String> {
        let tokens: Vec<&str> = text
            .split_whitespace()
            .map(|t| t.trim_matches(|c: char| matches!(c, ',' | ';' | ':' | '(' | ')' | '"' | '\'' | '!' | '?')))
            .map(|t| t.trim_end_matches('.'))
            .filter(|t| !t.is_empty())
            .collect();

        let mut found = BTreeSet::new();
        let mut i = 0;
        while i < tokens.len() {
            let mut advanced = false;
            for width in (1..=3).rev() {
                if i + width > tokens.len() {
                    continue;
                }
                let window = tokens[i..i + width].join(" ");
                let key = compact_key(&window);
                // short keys ("go", "c", "r") only count when written with a capital
                if key.chars().count() < 3 && window.chars().all(|c| !c.is_uppercase()) {
                    continue;
                }
                if self.list_only.contains(&key) {
                    continue;
                }
                if let Some((index, _)) = self.lookup.get(&key) {
                    found.insert(self.entries[*index].name.clone());
                    i += width;
                    advanced = true;
                    break;
                }
            }
            if !advanced {
                i += 1;
            }
        }
        found
    }

    /// Canonical field of study, or the lowercased input when unknown
    pub fn canonical_field(&self, field: &str) -> String {
        self.fields
            .get(&compact_key(field))
            .cloned()
            .unwrap_or_else(|| field.trim().to_lowercase())
    }

    pub fn fields_match(&self, a: &str, b: &str) -> bool {
        self.canonical_field(a) == self.canonical_field(b)
    }
}

impl Default for SkillTaxonomy {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Degree level on the hierarchy certificate(1) < diploma(2) < bachelor(3) <
/// master(4) < doctorate(5). `None` for unrecognised degree strings.
pub fn degree_level(degree: &str) -> Option<u8> {
    let lowered = degree.to_lowercase().replace('.', "");
    let words: Vec<&str> = lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    let has = |list: &[&str]| words.iter().any(|w| list.contains(w));

    if has(&["phd", "doctorate", "doctoral", "dphil"]) {
        Some(5)
    } else if has(&["master", "masters", "mba", "ms", "msc", "mtech", "meng", "mca", "ma"]) {
        Some(4)
    } else if has(&["bachelor", "bachelors", "bs", "bsc", "btech", "beng", "bca", "ba", "be", "undergraduate"]) {
        Some(3)
    } else if has(&["diploma", "associate", "associates"]) {
        Some(2)
    } else if has(&["certificate", "certification"]) {
        Some(1)
    } else {
        None
    }
}

const BUILTIN_SKILLS: &[(&str, SkillCategory, &[&str], &[&str])] = &[
    ("Python", SkillCategory::Tech, &["python3", "py"], &[]),
    ("Java", SkillCategory::Tech, &["java8", "java11", "java17", "openjdk"], &[]),
    ("JavaScript", SkillCategory::Tech, &["js", "ecmascript", "es6"], &[]),
    ("TypeScript", SkillCategory::Tech, &["ts"], &[]),
    ("Node.js", SkillCategory::Tech, &["nodejs"], &["node"]),
    ("React", SkillCategory::Tech, &["reactjs", "react.js"], &[]),
    ("React Native", SkillCategory::Tech, &["react-native"], &[]),
    ("Angular", SkillCategory::Tech, &["angularjs", "angular.js"], &[]),
    ("Vue.js", SkillCategory::Tech, &["vuejs"], &["vue"]),
    ("Next.js", SkillCategory::Tech, &["nextjs"], &["next"]),
    ("Express.js", SkillCategory::Tech, &["expressjs"], &["express"]),
    ("Django", SkillCategory::Tech, &["django rest framework", "drf"], &[]),
    ("Flask", SkillCategory::Tech, &[], &[]),
    ("FastAPI", SkillCategory::Tech, &["fast api"], &[]),
    ("Spring Boot", SkillCategory::Tech, &["springboot"], &["spring"]),
    ("HTML", SkillCategory::Tech, &["html5"], &[]),
    ("CSS", SkillCategory::Tech, &["css3"], &[]),
    ("Tailwind CSS", SkillCategory::Tech, &["tailwindcss"], &["tailwind"]),
    ("SQL", SkillCategory::Tech, &[], &[]),
    ("PostgreSQL", SkillCategory::Tech, &["postgres", "psql"], &[]),
    ("MySQL", SkillCategory::Tech, &["mariadb"], &[]),
    ("MongoDB", SkillCategory::Tech, &["mongo"], &[]),
    ("Redis", SkillCategory::Tech, &[], &[]),
    ("Firebase", SkillCategory::Tech, &[], &[]),
    ("Docker", SkillCategory::Tech, &[], &["containers"]),
    ("Kubernetes", SkillCategory::Tech, &["k8s"], &[]),
    ("AWS", SkillCategory::Tech, &["amazon web services"], &[]),
    ("Google Cloud", SkillCategory::Tech, &["gcp", "google cloud platform"], &[]),
    ("Azure", SkillCategory::Tech, &["microsoft azure"], &[]),
    ("Git", SkillCategory::Tech, &["github", "gitlab"], &[]),
    ("REST APIs", SkillCategory::Tech, &["rest api", "restful", "restful apis"], &["rest"]),
    ("GraphQL", SkillCategory::Tech, &[], &[]),
    ("C", SkillCategory::Tech, &[], &[]),
    ("C++", SkillCategory::Tech, &["cpp"], &[]),
    ("C#", SkillCategory::Tech, &["csharp", "c sharp"], &[]),
    ("Go", SkillCategory::Tech, &["golang"], &[]),
    ("Rust", SkillCategory::Tech, &[], &[]),
    ("Kotlin", SkillCategory::Tech, &[], &[]),
    ("Swift", SkillCategory::Tech, &[], &[]),
    ("Flutter", SkillCategory::Tech, &[], &["dart"]),
    ("Linux", SkillCategory::Tech, &["unix"], &["bash"]),
    ("Machine Learning", SkillCategory::Tech, &["ml"], &[]),
    ("Deep Learning", SkillCategory::Tech, &["neural networks"], &[]),
    ("TensorFlow", SkillCategory::Tech, &["tf"], &[]),
    ("PyTorch", SkillCategory::Tech, &[], &["torch"]),
    ("scikit-learn", SkillCategory::Tech, &["sklearn"], &[]),
    ("Pandas", SkillCategory::Tech, &[], &[]),
    ("NumPy", SkillCategory::Tech, &[], &[]),
    ("Data Analysis", SkillCategory::Tech, &["data analytics"], &[]),
    ("Figma", SkillCategory::Tech, &[], &[]),
    ("Communication", SkillCategory::Soft, &["communication skills"], &[]),
    ("Teamwork", SkillCategory::Soft, &["team work"], &["collaboration"]),
    ("Leadership", SkillCategory::Soft, &[], &[]),
    ("Problem Solving", SkillCategory::Soft, &["problem-solving"], &[]),
    ("Time Management", SkillCategory::Soft, &[], &[]),
    ("Agile", SkillCategory::Soft, &["scrum"], &[]),
];

const BUILTIN_FIELDS: &[(&str, &[&str])] = &[
    ("Computer Science", &["cs", "cse", "computer science and engineering", "computing"]),
    ("Software Engineering", &["se", "software engg"]),
    ("Information Technology", &["it", "information systems"]),
    ("Electronics and Communication", &["ece", "electronics", "electronics engineering"]),
    ("Electrical Engineering", &["ee", "eee", "electrical and electronics engineering"]),
    ("Mechanical Engineering", &["me", "mechanical"]),
    ("Data Science", &["ds", "data analytics", "analytics"]),
    ("Mathematics", &["math", "maths", "applied mathematics"]),
    ("Statistics", &["stats"]),
    ("Business Administration", &["business", "management"]),
    ("Design", &["ux design", "interaction design", "graphic design"]),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_builds() {
        let taxonomy = SkillTaxonomy::builtin();
        assert_eq!(taxonomy.entries().len(), BUILTIN_SKILLS.len());
        assert_eq!(taxonomy.version(), BUILTIN_VERSION);
    }

    #[test]
    fn test_lookup_exact_alias_and_case() {
        let taxonomy = SkillTaxonomy::builtin();
        assert!(matches!(
            taxonomy.lookup("react"),
            SkillMatch::Matched { ref canonical, kind: MatchKind::Exact, .. } if canonical == "React"
        ));
        assert!(matches!(
            taxonomy.lookup("NodeJS"),
            SkillMatch::Matched { ref canonical, kind: MatchKind::Alias, .. } if canonical == "Node.js"
        ));
        assert!(matches!(
            taxonomy.lookup("node js"),
            SkillMatch::Matched { ref canonical, .. } if canonical == "Node.js"
        ));
    }

    #[test]
    fn test_lookup_tolerates_one_typo() {
        let taxonomy = SkillTaxonomy::builtin();
        match taxonomy.lookup("Typescrpt") {
            SkillMatch::Matched { canonical, kind, .. } => {
                assert_eq!(canonical, "TypeScript");
                assert_eq!(kind, MatchKind::Fuzzy { distance: 1 });
            }
            other => panic!("expected match, got {:?}", other),
        }
        assert_eq!(taxonomy.lookup("Ruts").key(), "Rust");
        // below the minimum length nothing is fuzzed
        assert!(!taxonomy.lookup("sq").is_matched());
    }

    #[test]
    fn test_fuzzy_can_be_disabled() {
        let taxonomy = SkillTaxonomy::builtin().with_fuzzy(FuzzyConfig {
            max_edits: 0,
            min_len: 4,
        });
        assert!(!taxonomy.lookup("Typescrpt").is_matched());
    }

    #[test]
    fn test_unknown_terms_pass_through_as_other() {
        let taxonomy = SkillTaxonomy::builtin();
        let result = taxonomy.lookup("  Underwater Basket Weaving ");
        assert_eq!(
            result,
            SkillMatch::Unmatched {
                raw: "Underwater Basket Weaving".to_string()
            }
        );
        assert_eq!(result.key(), "underwater basket weaving");
        assert_eq!(taxonomy.categorize("Underwater Basket Weaving"), SkillCategory::Other);
        assert_eq!(taxonomy.categorize("teamwork"), SkillCategory::Soft);
    }

    #[test]
    fn test_resolve_splits_lists() {
        let taxonomy = SkillTaxonomy::builtin();
        let skills = taxonomy.resolve("React / node.js, Postgres");
        let expected: BTreeSet<String> = ["Node.js", "PostgreSQL", "React"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(skills, expected);
    }

    #[test]
    fn test_aliases_of() {
        let taxonomy = SkillTaxonomy::builtin();
        assert!(taxonomy.aliases_of("k8s").contains(&"k8s".to_string()));
        assert!(taxonomy.aliases_of("nonexistent").is_empty());
    }

    #[test]
    fn test_mentions_in_prose() {
        let taxonomy = SkillTaxonomy::builtin();
        let found = taxonomy.mentions("Built a dashboard in React Native and Node.js, deployed with Docker.");
        assert!(found.contains("React Native"));
        assert!(found.contains("Node.js"));
        assert!(found.contains("Docker"));
        assert!(!found.contains("React"));

        // lowercase "go" in prose is not the language
        assert!(!taxonomy.mentions("ready to go").contains("Go"));
    }

    #[test]
    fn test_everyday_words_are_not_skill_mentions() {
        let taxonomy = SkillTaxonomy::builtin();
        let found = taxonomy.mentions(
            "Helped the rest of the team plan the next release and express concerns in spring, \
             moving boxes into containers with great collaboration on each node",
        );
        assert!(found.is_empty(), "unexpected mentions: {:?}", found);

        // the same words still resolve inside a skill list
        assert_eq!(taxonomy.lookup("express").key(), "Express.js");
        assert_eq!(taxonomy.resolve("rest, spring").len(), 2);

        // written out, the skills are still found in prose
        let found = taxonomy.mentions("Shipped REST API endpoints on Express.js and Spring Boot");
        assert!(found.contains("REST APIs"));
        assert!(found.contains("Express.js"));
        assert!(found.contains("Spring Boot"));
    }

    #[test]
    fn test_list_only_aliases_from_toml() {
        let source = r#"
[[skills]]
name = "Ansible"
category = "tech"
list_only_aliases = ["playbooks"]
"#;
        let taxonomy = SkillTaxonomy::from_toml_str(source).unwrap();
        assert_eq!(taxonomy.lookup("playbooks").key(), "Ansible");
        assert!(taxonomy.mentions("wrote playbooks for the team").is_empty());
        assert!(taxonomy.mentions("wrote Ansible roles").contains("Ansible"));
    }

    #[test]
    fn test_field_synonyms() {
        let taxonomy = SkillTaxonomy::builtin();
        assert!(taxonomy.fields_match("CSE", "Computer Science"));
        assert!(!taxonomy.fields_match("Mechanical", "Computer Science"));
    }

    #[test]
    fn test_degree_levels() {
        assert_eq!(degree_level("Ph.D. in Physics"), Some(5));
        assert_eq!(degree_level("M.Tech"), Some(4));
        assert_eq!(degree_level("B.Tech in CSE"), Some(3));
        assert_eq!(degree_level("Bachelor of Science"), Some(3));
        assert_eq!(degree_level("Diploma in Engineering"), Some(2));
        assert_eq!(degree_level("Online certificate"), Some(1));
        assert_eq!(degree_level("High School"), None);
    }

    #[test]
    fn test_from_toml() {
        let source = r#"
version = "campus-1"

[[skills]]
name = "Verilog"
category = "tech"
aliases = ["vhdl-ish"]

[[fields]]
name = "VLSI"
aliases = ["vlsi design"]
"#;
        let taxonomy = SkillTaxonomy::from_toml_str(source).unwrap();
        assert_eq!(taxonomy.version(), "campus-1");
        assert_eq!(taxonomy.lookup("verilog").key(), "Verilog");
        assert!(taxonomy.fields_match("VLSI Design", "vlsi"));
    }

    #[test]
    fn test_from_toml_rejects_conflicting_alias() {
        let source = r#"
[[skills]]
name = "Alpha"
category = "tech"
aliases = ["shared"]

[[skills]]
name = "Beta"
category = "tech"
aliases = ["shared"]
"#;
        assert!(matches!(
            SkillTaxonomy::from_toml_str(source),
            Err(TaxonomyError::ConflictingAlias { .. })
        ));
    }
}
