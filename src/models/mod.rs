// Model exports
pub mod audit;
pub mod domain;
pub mod explanation;
pub mod requests;
pub mod responses;

pub use audit::{
    AuditAction, AuditRecord, FairnessCheckResult, FairnessMetric, FairnessReport, GenerationAttempt,
    GroupStats,
};
pub use domain::{
    Application, ApplicationStatus, CandidateIdentity, Certification, Education,
    EducationRequirement, PostingRequirements, Project, ResumeProfile, RubricWeights,
    SkillCategory, SkillEntry, StoredEmbedding, TierThresholds, WeightedSkill, WorkExperience,
};
pub use explanation::{
    AiRecommendation, Comparison, ComparisonSide, Component, ComponentScores, EducationAnalysis,
    EducationMatchLevel, EvidenceRef, EvidenceSource, ExperienceAnalysis, Impact, MatchExplanation,
    MatchedSkill, MissingSkill, Priority, ProficiencyLevel, ProjectAnalysis, Provenance,
    Recommendation, RequirementKind, RoleContribution, SkillProficiency,
};
pub use requests::{
    CompareQuery, ExplanationQuery, ExtractSkillsRequest, FairnessRequest, GroupAttribute,
    Pagination, PostingFilters, PostingSearch, PostingSort, PostingSortKey, RankRequest,
    RankingFilters, RankingMode, SkillFilter, SkillPresence, SortKey, SortOrder, SortSpec,
};
pub use responses::{
    CandidateFailure, DuplicateFlag, ErrorResponse, FlagReason, HealthResponse, PostingFailure,
    PostingMatch, PostingRecommendations, RankedCandidate, RankingResult,
};
