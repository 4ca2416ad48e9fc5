use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::fairness::FairnessThresholds;
use crate::core::proficiency::ProficiencyConfig;
use crate::core::scoring::SkillSplit;
use crate::core::taxonomy::{FuzzyConfig, SkillTaxonomy, TaxonomyError};
use crate::engine::{EngineConfig, SCORING_VERSION};
use crate::models::TierThresholds;
use crate::services::gemini::GeminiSettings;
use crate::services::keys::{ApiKey, KeyRing, KeySelectionPolicy};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
    #[serde(default)]
    pub providers: ProviderSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub ranking: RankingSettings,
    #[serde(default)]
    pub fairness: FairnessThresholds,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub taxonomy: TaxonomySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

/// Generation and embedding provider settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub gemini: GeminiSettings,
    /// Ordered key list; each key may be dedicated to one purpose
    #[serde(default)]
    pub keys: Vec<ApiKey>,
    #[serde(default)]
    pub key_policy: KeySelectionPolicy,
    #[serde(default = "default_key_cooldown_secs")]
    pub key_cooldown_secs: u64,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_timeout_secs: u64,
}

fn default_key_cooldown_secs() -> u64 { 60 }
fn default_generation_timeout_secs() -> u64 { 30 }
fn default_embedding_timeout_secs() -> u64 { 30 }

impl ProviderSettings {
    pub fn key_ring(&self) -> KeyRing {
        KeyRing::new(
            self.keys.clone(),
            self.key_policy,
            Duration::from_secs(self.key_cooldown_secs),
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringSettings {
    #[serde(default)]
    pub skill_split: SkillSplit,
    #[serde(default)]
    pub proficiency: ProficiencyConfig,
    #[serde(default)]
    pub tiers: TierThresholds,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RankingSettings {
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_max_concurrency() -> usize { 8 }

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_capacity")]
    pub capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> u64 { 10_000 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonomySettings {
    /// TOML taxonomy file; the built-in vocabulary is used when unset
    pub path: Option<String>,
    #[serde(default)]
    pub fuzzy: FuzzyConfig,
}

impl TaxonomySettings {
    pub fn load(&self) -> Result<SkillTaxonomy, TaxonomyError> {
        let taxonomy = match &self.path {
            Some(path) => {
                let source = std::fs::read_to_string(path)?;
                SkillTaxonomy::from_toml_str(&source)?
            }
            None => SkillTaxonomy::builtin(),
        };
        Ok(taxonomy.with_fuzzy(self.fuzzy))
    }
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SKILLMATCH__)
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SKILLMATCH__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("SKILLMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("SKILLMATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            skill_split: self.scoring.skill_split,
            proficiency: self.scoring.proficiency,
            default_tiers: self.scoring.tiers,
            generation_timeout: Duration::from_secs(self.providers.generation_timeout_secs),
            embedding_timeout: Duration::from_secs(self.providers.embedding_timeout_secs),
            max_concurrency: self.ranking.max_concurrency,
            fairness: self.fairness,
            scoring_version: SCORING_VERSION.to_string(),
            cache_capacity: self.cache.capacity,
        }
    }
}
