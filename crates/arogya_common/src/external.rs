//! External summary lookup.
//!
//! Fetches a short encyclopedia summary for the normalized query. Every
//! failure (disabled, network, non-success status, timeout, bad payload) is
//! an explicit `LookupOutcome::Miss`; nothing here returns an error to the
//! resolver. Accepted summaries are cached in a bounded LRU.

use crate::config::ExternalConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use lru::LruCache;
use serde::Deserialize;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Summary text returned by the external service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub title: String,
    pub extract: String,
    pub url: Option<String>,
    /// Attribution name, e.g. "Wikipedia"
    pub source: String,
}

/// Why a lookup produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupMiss {
    #[error("external lookup disabled")]
    Disabled,

    #[error("empty query")]
    EmptyQuery,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("timed out after {0} seconds")]
    Timeout(u64),

    #[error("unreadable response: {0}")]
    Parse(String),

    #[error("empty extract")]
    EmptyExtract,

    #[error("disambiguation page ({0})")]
    Disambiguation(String),
}

/// Result of the external stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Hit(Summary),
    Miss(LookupMiss),
}

/// External summary service
#[async_trait]
pub trait SummaryLookup: Send + Sync {
    async fn lookup(&self, query: &str) -> LookupOutcome;

    /// Service name for diagnostics
    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    title: String,
    #[serde(default)]
    extract: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: Option<String>,
}

/// Client for a Wikipedia-style REST summary endpoint
/// (`GET {endpoint}/{title}` -> `{title, extract, type, content_urls}`).
pub struct WikipediaSummary {
    http: reqwest::Client,
    endpoint: String,
    timeout: Duration,
    enabled: bool,
    source_name: String,
    cache: Option<Mutex<LruCache<String, Summary>>>,
}

impl WikipediaSummary {
    pub fn new(config: &ExternalConfig) -> Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs.max(1));
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        let cache = NonZeroUsize::new(config.cache_capacity).map(|cap| Mutex::new(LruCache::new(cap)));

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            timeout,
            enabled: config.enabled,
            source_name: config.source_name.clone(),
            cache,
        })
    }

    fn cached(&self, query: &str) -> Option<Summary> {
        let cache = self.cache.as_ref()?;
        let mut guard = cache.lock().ok()?;
        guard.get(query).cloned()
    }

    fn remember(&self, query: &str, summary: &Summary) {
        if let Some(cache) = &self.cache {
            if let Ok(mut guard) = cache.lock() {
                guard.put(query.to_string(), summary.clone());
            }
        }
    }

    fn page_url(&self, query: &str) -> Result<reqwest::Url, LookupMiss> {
        let mut url = reqwest::Url::parse(&self.endpoint)
            .map_err(|e| LookupMiss::Parse(format!("bad endpoint: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| LookupMiss::Parse("endpoint cannot take a path".to_string()))?
            .push(query);
        Ok(url)
    }

    async fn fetch(&self, query: &str) -> Result<Summary, LookupMiss> {
        let url = self.page_url(query)?;
        debug!("Fetching summary: {}", url);

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(LookupMiss::Status(response.status().as_u16()));
        }

        let body: SummaryResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                LookupMiss::Timeout(self.timeout.as_secs())
            } else {
                LookupMiss::Parse(e.to_string())
            }
        })?;

        if body.kind.as_deref() == Some("disambiguation") {
            return Err(LookupMiss::Disambiguation("type=disambiguation".to_string()));
        }
        let extract = body.extract.trim().to_string();
        if extract.is_empty() {
            return Err(LookupMiss::EmptyExtract);
        }

        Ok(Summary {
            title: body.title,
            extract,
            url: body.content_urls.and_then(|c| c.desktop).and_then(|d| d.page),
            source: self.source_name.clone(),
        })
    }

    fn classify(&self, e: reqwest::Error) -> LookupMiss {
        if e.is_timeout() {
            LookupMiss::Timeout(self.timeout.as_secs())
        } else {
            LookupMiss::Network(e.to_string())
        }
    }
}

#[async_trait]
impl SummaryLookup for WikipediaSummary {
    async fn lookup(&self, query: &str) -> LookupOutcome {
        if !self.enabled {
            return LookupOutcome::Miss(LookupMiss::Disabled);
        }
        let query = query.trim();
        if query.is_empty() {
            return LookupOutcome::Miss(LookupMiss::EmptyQuery);
        }
        if let Some(hit) = self.cached(query) {
            debug!("Summary cache hit for '{}'", query);
            return LookupOutcome::Hit(hit);
        }

        // Outer bound covers DNS and connect stalls the client timeout misses.
        let result = match tokio::time::timeout(self.timeout, self.fetch(query)).await {
            Ok(result) => result,
            Err(_) => Err(LookupMiss::Timeout(self.timeout.as_secs())),
        };

        match result {
            Ok(summary) => {
                self.remember(query, &summary);
                LookupOutcome::Hit(summary)
            }
            Err(miss) => {
                warn!("Summary lookup for '{}' missed: {}", query, miss);
                LookupOutcome::Miss(miss)
            }
        }
    }

    fn name(&self) -> &str {
        "wikipedia"
    }
}

/// In-memory lookup with canned outcomes, for tests and offline runs.
pub struct FakeSummaryLookup {
    outcomes: HashMap<String, LookupOutcome>,
    fallback: LookupOutcome,
    calls: Mutex<Vec<String>>,
}

impl FakeSummaryLookup {
    /// Every query misses with `reason`.
    pub fn missing(reason: LookupMiss) -> Self {
        Self {
            outcomes: HashMap::new(),
            fallback: LookupOutcome::Miss(reason),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Register a summary returned for `query`.
    pub fn with_hit(mut self, query: &str, extract: &str) -> Self {
        self.outcomes.insert(
            query.to_string(),
            LookupOutcome::Hit(Summary {
                title: query.to_string(),
                extract: extract.to_string(),
                url: None,
                source: "Wikipedia".to_string(),
            }),
        );
        self
    }

    /// Queries received so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl SummaryLookup for FakeSummaryLookup {
    async fn lookup(&self, query: &str) -> LookupOutcome {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.to_string());
        }
        self.outcomes
            .get(query)
            .cloned()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn name(&self) -> &str {
        "fake"
    }
}
