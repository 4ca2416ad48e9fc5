//! skillmatch - candidate scoring and explainability engine
//!
//! Scores parsed student resumes against internship postings with a weighted
//! five-component rubric, explains every score with evidence, ranks and
//! compares candidates, and checks ranked results for group fairness.

pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::SkillTaxonomy;
pub use engine::{Engine, EngineConfig, ScoreOptions};
pub use error::EngineError;
pub use models::{MatchExplanation, PostingRequirements, RankRequest, RankingResult, ResumeProfile};
