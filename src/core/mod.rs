// Core algorithm exports
pub mod aggregate;
pub mod blind;
pub mod explain;
pub mod extraction;
pub mod fairness;
pub mod filters;
pub mod fingerprint;
pub mod flagging;
pub mod matcher;
pub mod proficiency;
pub mod scoring;
pub mod taxonomy;

pub use aggregate::{aggregate, tier, Aggregate};
pub use blind::redact;
pub use explain::{compare, next_steps, short_reason, summary_sentence};
pub use extraction::{extract_posting_skills, ExtractedSkill, SkillExtraction};
pub use fairness::{evaluate as evaluate_fairness, gini, FairnessThresholds};
pub use filters::matches_filters;
pub use flagging::{detect_duplicates, format_flag_reason};
pub use matcher::{RankedPage, Ranker, ScoredCandidate};
pub use proficiency::{ProficiencyConfig, ResumeSkillIndex};
pub use scoring::{ResolvedRequirements, SkillSplit};
pub use taxonomy::{FuzzyConfig, MatchKind, SkillMatch, SkillTaxonomy};
