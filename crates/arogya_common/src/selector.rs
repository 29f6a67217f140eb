//! Match selector: best (intent, pattern) pair under the composite score.
//!
//! Pattern embeddings are computed once at construction. A later candidate
//! replaces the current best only with a strictly higher score, so ties go
//! to the first pattern in catalog order. Acceptance is `score >= threshold`.

use crate::catalog::IntentCatalog;
use crate::similarity::{Prepared, ScoreBreakdown, SimilarityScorer};
use crate::types::{Intent, ScoredCandidate};
use serde::Serialize;
use std::sync::Arc;

struct PreparedPattern {
    intent: usize,
    pattern: String,
    prepared: Prepared,
}

/// Candidate with its per-signal breakdown (for `explain`).
#[derive(Debug, Clone, Serialize)]
pub struct RankedCandidate {
    pub intent_tag: String,
    pub pattern_text: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

pub struct MatchSelector {
    catalog: Arc<IntentCatalog>,
    scorer: SimilarityScorer,
    patterns: Vec<PreparedPattern>,
    threshold: f64,
}

impl MatchSelector {
    pub fn new(catalog: Arc<IntentCatalog>, scorer: SimilarityScorer, threshold: f64) -> Self {
        let patterns = catalog
            .intents()
            .iter()
            .enumerate()
            .flat_map(|(idx, intent)| {
                intent.patterns.iter().map(move |p| (idx, p))
            })
            .map(|(idx, p)| PreparedPattern {
                intent: idx,
                pattern: p.clone(),
                prepared: scorer.prepare(p),
            })
            .collect();

        Self {
            catalog,
            scorer,
            patterns,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn scorer(&self) -> &SimilarityScorer {
        &self.scorer
    }

    /// Highest-scoring candidate regardless of threshold.
    pub fn best(&self, query: &Prepared) -> Option<ScoredCandidate> {
        let mut best: Option<(usize, f64)> = None;
        for (i, p) in self.patterns.iter().enumerate() {
            let score = self.scorer.breakdown(query, &p.prepared).total();
            match best {
                Some((_, top)) if score <= top => {}
                _ => best = Some((i, score)),
            }
        }
        best.map(|(i, score)| self.candidate(i, score))
    }

    /// Best candidate if it clears the threshold, with its intent.
    pub fn select(&self, query: &Prepared) -> Option<(&Intent, ScoredCandidate)> {
        let candidate = self.best(query)?;
        if candidate.score >= self.threshold {
            let intent = self.catalog.get(&candidate.intent_tag)?;
            Some((intent, candidate))
        } else {
            None
        }
    }

    /// Top `n` candidates, best first, ties in catalog order.
    pub fn rank(&self, query: &Prepared, n: usize) -> Vec<RankedCandidate> {
        let mut ranked: Vec<RankedCandidate> = self
            .patterns
            .iter()
            .map(|p| {
                let breakdown = self.scorer.breakdown(query, &p.prepared);
                RankedCandidate {
                    intent_tag: self.catalog.intents()[p.intent].tag.clone(),
                    pattern_text: p.pattern.clone(),
                    score: breakdown.total(),
                    breakdown,
                }
            })
            .collect();
        // Stable sort keeps catalog order among equal scores.
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(n);
        ranked
    }

    fn candidate(&self, i: usize, score: f64) -> ScoredCandidate {
        let p = &self.patterns[i];
        ScoredCandidate {
            intent_tag: self.catalog.intents()[p.intent].tag.clone(),
            pattern_text: p.pattern.clone(),
            score,
        }
    }
}
