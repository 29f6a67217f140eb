//! Configuration management for Arogya.
//!
//! Loads settings from `$AROGYA_CONFIG`, /etc/arogya/config.toml or
//! ./arogya.toml, falling back to defaults for anything missing.

use crate::normalize::DEFAULT_STOPWORDS;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV: &str = "AROGYA_CONFIG";

/// System config file path
pub const CONFIG_PATH: &str = "/etc/arogya/config.toml";

/// Config file in the working directory
pub const LOCAL_CONFIG_PATH: &str = "arogya.toml";

/// Data sources for intents and records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Intent catalog JSON (`{"intents": [...]}`)
    #[serde(default = "default_intents_path")]
    pub intents_path: PathBuf,

    /// Structured records: SQLite database or `.json` array
    #[serde(default = "default_records_path")]
    pub records_path: PathBuf,

    /// Table holding records when `records_path` is SQLite
    #[serde(default = "default_records_table")]
    pub records_table: String,

    /// Attribute fields surfaced for a record, in display order
    #[serde(default = "default_record_fields")]
    pub record_fields: Vec<String>,
}

fn default_intents_path() -> PathBuf {
    PathBuf::from("data/intents.json")
}

fn default_records_path() -> PathBuf {
    PathBuf::from("data/records.json")
}

fn default_records_table() -> String {
    "diseases".to_string()
}

fn default_record_fields() -> Vec<String> {
    ["symptoms", "treatment", "side_effects", "precautions"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            intents_path: default_intents_path(),
            records_path: default_records_path(),
            records_table: default_records_table(),
            record_fields: default_record_fields(),
        }
    }
}

/// Composite score weights and acceptance thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringConfig {
    #[serde(default = "default_lexical_weight")]
    pub lexical_weight: f64,

    /// Points per word shared between query and pattern
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,

    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,

    /// Intent match accepted when score >= threshold
    #[serde(default = "default_threshold")]
    pub intent_threshold: f64,

    /// Record match accepted when score > threshold
    #[serde(default = "default_threshold")]
    pub record_threshold: f64,

    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: usize,

    /// Words ignored by the keyword signal and the hashed encoder
    #[serde(default = "default_stopwords")]
    pub stopwords: Vec<String>,

    /// ONNX sentence-embedding model; the hashed encoder is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    /// WordPiece vocabulary for the model, default `vocab.txt` beside it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vocab_path: Option<PathBuf>,

    /// Model input length limit, including the two special tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,
}

fn default_lexical_weight() -> f64 {
    1.0
}

fn default_keyword_weight() -> f64 {
    10.0
}

fn default_semantic_weight() -> f64 {
    100.0
}

fn default_threshold() -> f64 {
    70.0
}

fn default_embedding_dimensions() -> usize {
    1024
}

fn default_stopwords() -> Vec<String> {
    DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect()
}

fn default_max_tokens() -> usize {
    128
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            lexical_weight: default_lexical_weight(),
            keyword_weight: default_keyword_weight(),
            semantic_weight: default_semantic_weight(),
            intent_threshold: default_threshold(),
            record_threshold: default_threshold(),
            embedding_dimensions: default_embedding_dimensions(),
            stopwords: default_stopwords(),
            model_path: None,
            vocab_path: None,
            max_tokens: default_max_tokens(),
        }
    }
}

/// Sub-intent keywords: record field -> trigger words
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsConfig {
    #[serde(default = "default_field_keywords")]
    pub field_keywords: BTreeMap<String, Vec<String>>,
}

pub fn default_field_keywords() -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();
    let mut add = |field: &str, words: &[&str]| {
        map.insert(
            field.to_string(),
            words.iter().map(|w| w.to_string()).collect(),
        );
    };
    add("symptoms", &["symptom", "sign"]);
    add("precautions", &["precaution", "prevent", "avoid", "protect"]);
    add("treatment", &["treat", "cure", "medicine", "medication"]);
    add("side_effects", &["side effect", "side-effect", "adverse"]);
    map
}

impl Default for RecordsConfig {
    fn default() -> Self {
        Self {
            field_keywords: default_field_keywords(),
        }
    }
}

/// External summary service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalConfig {
    #[serde(default = "default_external_enabled")]
    pub enabled: bool,

    /// Base URL; the query is appended as one path segment
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_external_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Accepted summaries kept in memory (0 disables caching)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Phrases marking a topic-listing page instead of content
    #[serde(default = "default_disambiguation_markers")]
    pub disambiguation_markers: Vec<String>,

    /// Attribution appended to accepted summaries
    #[serde(default = "default_source_name")]
    pub source_name: String,
}

fn default_external_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "https://en.wikipedia.org/api/rest_v1/page/summary".to_string()
}

fn default_external_timeout() -> u64 {
    5
}

fn default_user_agent() -> String {
    format!(
        "Arogya/{} (health awareness assistant)",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_cache_capacity() -> usize {
    256
}

fn default_disambiguation_markers() -> Vec<String> {
    vec!["may refer to".to_string(), "is a list of".to_string()]
}

fn default_source_name() -> String {
    "Wikipedia".to_string()
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self {
            enabled: default_external_enabled(),
            endpoint: default_endpoint(),
            timeout_secs: default_external_timeout(),
            user_agent: default_user_agent(),
            cache_capacity: default_cache_capacity(),
            disambiguation_markers: default_disambiguation_markers(),
            source_name: default_source_name(),
        }
    }
}

/// Interaction log storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogBackend {
    Sqlite,
    Jsonl,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_backend")]
    pub backend: LogBackend,

    #[serde(default = "default_log_path")]
    pub path: PathBuf,
}

fn default_log_enabled() -> bool {
    true
}

fn default_log_backend() -> LogBackend {
    LogBackend::Sqlite
}

fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("arogya")
        .join("interactions.db")
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            enabled: default_log_enabled(),
            backend: default_log_backend(),
            path: default_log_path(),
        }
    }
}

/// Canned text and randomness for the response composer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponsesConfig {
    /// Replaces the built-in apology when set and non-blank
    #[serde(default)]
    pub apology: Option<String>,

    /// Fixed seed for response choice (reproducible runs)
    #[serde(default)]
    pub seed: Option<u64>,
}

/// HTTP daemon settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_bind() -> String {
    "127.0.0.1:7870".to_string()
}

fn default_request_timeout() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Full configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub records: RecordsConfig,

    #[serde(default)]
    pub external: ExternalConfig,

    #[serde(default)]
    pub log: LogConfig,

    #[serde(default)]
    pub responses: ResponsesConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Load config from the first file found, or return defaults
    pub fn load() -> Self {
        Self::candidate_paths()
            .into_iter()
            .filter(|p| p.exists())
            .find_map(|p| match Self::load_from_path(&p) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Ignoring config {:?}: {:#}", p, e);
                    None
                }
            })
            .unwrap_or_else(|| {
                info!("No config file found, using defaults");
                Config::default()
            })
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            paths.push(PathBuf::from(p));
        }
        paths.push(PathBuf::from(CONFIG_PATH));
        paths.push(PathBuf::from(LOCAL_CONFIG_PATH));
        paths
    }

    /// Load config from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Write the default config (for `arogyactl config --init`)
    pub fn save_default(path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        info!("Saved default config to {:?}", path);
        Ok(())
    }
}
