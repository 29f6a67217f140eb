//! Fallback resolver: the ordered resolution chain.
//!
//! 1. exact pattern match
//! 2. scored intent match (`score >= intent_threshold`)
//! 3. structured record match (`score > record_threshold`)
//! 4. external summary, screened by the disambiguation filter
//! 5. apology
//!
//! Each stage runs only when every earlier stage missed. Misses are values,
//! not errors; the chain always ends with a non-empty answer.

use crate::catalog::IntentCatalog;
use crate::composer::{
    format_record, pick_response, screen_external, ResponseChooser, SeededChooser, APOLOGY,
};
use crate::config::Config;
use crate::external::{LookupOutcome, SummaryLookup, WikipediaSummary};
use crate::interaction_log::InteractionLogger;
use crate::records::RecordStore;
use crate::selector::{MatchSelector, RankedCandidate};
use crate::similarity::SimilarityScorer;
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Which stage produced the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Exact,
    Intent,
    Record,
    External,
    Apology,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::Intent => "intent",
            Self::Record => "record",
            Self::External => "external",
            Self::Apology => "apology",
        };
        write!(f, "{}", s)
    }
}

/// Answer plus where it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub answer: String,
    pub stage: Stage,
    /// Intent tag, record name or external page title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Resolution {
    fn new(answer: String, stage: Stage, source: Option<String>, score: Option<f64>) -> Self {
        Self {
            answer,
            stage,
            source,
            score,
        }
    }
}

/// Tunables that do not come from the data files
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    pub intent_threshold: f64,
    pub record_threshold: f64,
    pub disambiguation_markers: Vec<String>,
    pub apology: String,
}

impl ResolverSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            intent_threshold: config.scoring.intent_threshold,
            record_threshold: config.scoring.record_threshold,
            disambiguation_markers: config.external.disambiguation_markers.clone(),
            apology: config
                .responses
                .apology
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .unwrap_or(APOLOGY)
                .to_string(),
        }
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

pub struct FallbackResolver {
    catalog: Arc<IntentCatalog>,
    selector: MatchSelector,
    records: Arc<RecordStore>,
    lookup: Arc<dyn SummaryLookup>,
    chooser: Arc<dyn ResponseChooser>,
    logger: InteractionLogger,
    settings: ResolverSettings,
}

impl FallbackResolver {
    pub fn new(
        catalog: Arc<IntentCatalog>,
        records: Arc<RecordStore>,
        scorer: SimilarityScorer,
        lookup: Arc<dyn SummaryLookup>,
        settings: ResolverSettings,
    ) -> Self {
        let selector = MatchSelector::new(catalog.clone(), scorer, settings.intent_threshold);
        Self {
            catalog,
            selector,
            records,
            lookup,
            chooser: Arc::new(SeededChooser::new(None)),
            logger: InteractionLogger::disabled(),
            settings,
        }
    }

    /// Load data files and wire every collaborator from config. Data load
    /// failures are fatal.
    pub fn from_config(config: &Config) -> Result<Self> {
        let catalog = IntentCatalog::load_intents(&config.catalog.intents_path)
            .context("Failed to load intent catalog")?;
        let records = RecordStore::load_records(
            &config.catalog.records_path,
            &config.catalog.records_table,
            &config.catalog.record_fields,
            config.records.field_keywords.clone(),
        )
        .context("Failed to load topic records")?;
        let scorer = SimilarityScorer::from_config(
            &config.scoring,
            catalog.intents().iter().flat_map(|i| i.patterns.iter().map(String::as_str)),
        )
        .context("Failed to load the semantic encoder")?;
        let lookup = WikipediaSummary::new(&config.external)?;

        Ok(Self::new(
            Arc::new(catalog),
            Arc::new(records),
            scorer,
            Arc::new(lookup),
            ResolverSettings::from_config(config),
        )
        .with_chooser(Arc::new(SeededChooser::new(config.responses.seed)))
        .with_logger(InteractionLogger::from_config(&config.log)))
    }

    pub fn with_chooser(mut self, chooser: Arc<dyn ResponseChooser>) -> Self {
        self.chooser = chooser;
        self
    }

    pub fn with_logger(mut self, logger: InteractionLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn catalog(&self) -> &IntentCatalog {
        &self.catalog
    }

    pub fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Name of the semantic encoder behind intent scoring
    pub fn encoder_name(&self) -> &str {
        self.selector.scorer().encoder_name()
    }

    /// Answer text for a query. Never fails, never empty.
    pub async fn resolve(&self, query: &str) -> String {
        self.resolve_detailed(query).await.answer
    }

    /// Answer with its stage, then hand the pair to the interaction log.
    pub async fn resolve_detailed(&self, query: &str) -> Resolution {
        let resolution = self.run_chain(query).await;
        info!(
            "Resolved via {} ({})",
            resolution.stage,
            resolution.source.as_deref().unwrap_or("-")
        );
        self.logger.log(query, &resolution.answer);
        resolution
    }

    /// Top `n` intent candidates with per-signal scores.
    pub fn explain(&self, query: &str, n: usize) -> Vec<RankedCandidate> {
        let prepared = self.selector.scorer().prepare(query);
        self.selector.rank(&prepared, n)
    }

    async fn run_chain(&self, raw: &str) -> Resolution {
        let query = self.selector.scorer().prepare(raw);
        if query.text.is_empty() {
            debug!("Empty query");
            return self.apologize();
        }

        if let Some(intent) = self.catalog.exact_match(query.text.as_str()) {
            debug!("Exact pattern match for intent '{}'", intent.tag);
            let answer = pick_response(intent, self.chooser.as_ref()).to_string();
            return Resolution::new(answer, Stage::Exact, Some(intent.tag.clone()), None);
        }

        match self.selector.select(&query) {
            Some((intent, candidate)) => {
                debug!(
                    "Intent '{}' accepted via '{}' with score {:.1}",
                    intent.tag, candidate.pattern_text, candidate.score
                );
                let answer = pick_response(intent, self.chooser.as_ref()).to_string();
                return Resolution::new(
                    answer,
                    Stage::Intent,
                    Some(intent.tag.clone()),
                    Some(candidate.score),
                );
            }
            None => debug!("No intent at or above {:.1}", self.selector.threshold()),
        }

        if let Some(found) = self
            .records
            .match_query(&query.text, self.settings.record_threshold)
        {
            let answer = format_record(found.record, self.records.fields(), &found.requested);
            return Resolution::new(
                answer,
                Stage::Record,
                Some(found.record.name.clone()),
                Some(found.score),
            );
        }

        match self.lookup.lookup(query.text.as_str()).await {
            LookupOutcome::Hit(summary) => {
                match screen_external(&summary, &self.settings.disambiguation_markers) {
                    Ok(answer) => {
                        return Resolution::new(answer, Stage::External, Some(summary.title), None);
                    }
                    Err(miss) => debug!("External summary rejected: {}", miss),
                }
            }
            LookupOutcome::Miss(miss) => {
                debug!("External lookup ({}) missed: {}", self.lookup.name(), miss)
            }
        }

        self.apologize()
    }

    fn apologize(&self) -> Resolution {
        Resolution::new(self.settings.apology.clone(), Stage::Apology, None, None)
    }
}
