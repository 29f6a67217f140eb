//! Intent catalog.
//!
//! Loaded once from JSON (`{"intents": [...]}`), validated, then read-only.
//! Intents keep file order; that order is the tie-break order for scoring.

use crate::error::StartupDataError;
use crate::normalize::normalize;
use crate::types::Intent;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

#[derive(Deserialize)]
struct IntentFile {
    intents: Vec<Intent>,
}

/// Immutable, indexed set of intents.
#[derive(Debug, Clone)]
pub struct IntentCatalog {
    intents: Vec<Intent>,
    by_tag: HashMap<String, usize>,
    /// normalized pattern -> first intent declaring it
    exact: HashMap<String, usize>,
}

impl IntentCatalog {
    /// Load and validate the catalog file.
    pub fn load_intents(path: &Path) -> Result<Self, StartupDataError> {
        let content = std::fs::read_to_string(path).map_err(|source| StartupDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: IntentFile =
            serde_json::from_str(&content).map_err(|source| StartupDataError::Json {
                path: path.to_path_buf(),
                source,
            })?;
        let catalog = Self::from_intents(file.intents)?;
        info!(
            "Loaded {} intents ({} patterns) from {:?}",
            catalog.len(),
            catalog.pattern_count(),
            path
        );
        Ok(catalog)
    }

    /// Build from in-memory intents, enforcing the catalog invariants:
    /// unique tags, at least one non-blank pattern and response each.
    pub fn from_intents(intents: Vec<Intent>) -> Result<Self, StartupDataError> {
        if intents.is_empty() {
            return Err(StartupDataError::EmptyCatalog);
        }

        let mut cleaned = Vec::with_capacity(intents.len());
        let mut by_tag = HashMap::new();
        let mut exact = HashMap::new();

        for mut intent in intents {
            intent.patterns.retain(|p| !p.trim().is_empty());
            intent.responses.retain(|r| !r.trim().is_empty());
            if intent.patterns.is_empty() {
                return Err(StartupDataError::EmptyPatterns(intent.tag));
            }
            if intent.responses.is_empty() {
                return Err(StartupDataError::EmptyResponses(intent.tag));
            }

            let idx = cleaned.len();
            if by_tag.insert(intent.tag.clone(), idx).is_some() {
                return Err(StartupDataError::DuplicateTag(intent.tag));
            }
            for pattern in &intent.patterns {
                let key = normalize(pattern);
                if let Some(prev) = exact.get(&key) {
                    debug!("Pattern '{}' already owned by intent #{}", key, prev);
                    continue;
                }
                exact.insert(key, idx);
            }
            cleaned.push(intent);
        }

        Ok(Self {
            intents: cleaned,
            by_tag,
            exact,
        })
    }

    /// Intents in catalog order
    pub fn intents(&self) -> &[Intent] {
        &self.intents
    }

    pub fn get(&self, tag: &str) -> Option<&Intent> {
        self.by_tag.get(tag).map(|&i| &self.intents[i])
    }

    /// Intent owning a pattern equal to the normalized query.
    pub fn exact_match(&self, normalized_query: &str) -> Option<&Intent> {
        self.exact.get(normalized_query).map(|&i| &self.intents[i])
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn pattern_count(&self) -> usize {
        self.intents.iter().map(|i| i.patterns.len()).sum()
    }

    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.intents.iter().map(|i| i.tag.as_str())
    }
}
