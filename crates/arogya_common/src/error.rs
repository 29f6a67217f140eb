//! Error types for Arogya.
//!
//! Only `StartupDataError` may stop the process. Per-request conditions are
//! resolved inside the fallback chain and never surface as errors.

use std::path::PathBuf;
use thiserror::Error;

/// Catalog or record store could not be loaded. Fatal at startup.
#[derive(Error, Debug)]
pub enum StartupDataError {
    #[error("Cannot read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("SQLite error in {path:?}: {source}")]
    Sqlite {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Duplicate intent tag '{0}'")]
    DuplicateTag(String),

    #[error("Intent '{0}' has no patterns")]
    EmptyPatterns(String),

    #[error("Intent '{0}' has no responses")]
    EmptyResponses(String),

    #[error("Duplicate record name '{0}'")]
    DuplicateRecord(String),

    #[error("Record table '{table}' has none of the configured fields {fields:?}")]
    NoRecordFields { table: String, fields: Vec<String> },

    #[error("Intent catalog is empty")]
    EmptyCatalog,

    #[error("Cannot load embedding model {path:?}: {reason}")]
    Model { path: PathBuf, reason: String },
}

/// Interaction log write failed. Never reaches the caller of `resolve`.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Log connection lock poisoned")]
    Poisoned,
}

impl StartupDataError {
    /// Short machine-readable kind for startup logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io { .. } => "io",
            Self::Json { .. } => "json",
            Self::Sqlite { .. } => "sqlite",
            Self::DuplicateTag(_) => "duplicate_tag",
            Self::EmptyPatterns(_) => "empty_patterns",
            Self::EmptyResponses(_) => "empty_responses",
            Self::DuplicateRecord(_) => "duplicate_record",
            Self::NoRecordFields { .. } => "no_record_fields",
            Self::EmptyCatalog => "empty_catalog",
            Self::Model { .. } => "model",
        }
    }
}
