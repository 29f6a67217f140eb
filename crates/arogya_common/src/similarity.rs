//! Composite similarity scoring.
//!
//! Three signals are summed, each scaled by a configured weight:
//! - lexical: normalized Levenshtein ratio of the full strings, 0-100
//! - keyword: number of shared words, stopwords excluded
//! - semantic: embedding similarity in [0, 1]
//!
//! Each signal alone misses a class of matches (paraphrase, bare keywords,
//! very short strings); the sum separates true matches from noise.

use crate::config::ScoringConfig;
use crate::error::StartupDataError;
use crate::normalize::{NormalizedText, Stopwords};
use crate::semantic::{encoder_from_config, Embedding, HashedEncoder, SemanticEncoder};
use serde::Serialize;
use std::sync::Arc;

/// Signal weights of the composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Weights {
    pub lexical: f64,
    pub keyword: f64,
    pub semantic: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            lexical: 1.0,
            keyword: 10.0,
            semantic: 100.0,
        }
    }
}

impl From<&ScoringConfig> for Weights {
    fn from(cfg: &ScoringConfig) -> Self {
        Self {
            lexical: cfg.lexical_weight,
            keyword: cfg.keyword_weight,
            semantic: cfg.semantic_weight,
        }
    }
}

/// Weighted contribution of each signal.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub lexical: f64,
    pub keyword: f64,
    pub semantic: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.lexical + self.keyword + self.semantic
    }
}

/// Normalized text plus its embedding, computed once.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub text: NormalizedText,
    pub embedding: Embedding,
}

/// Normalized edit-distance ratio scaled to [0, 100].
pub fn lexical_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    strsim::normalized_levenshtein(a, b) * 100.0
}

/// Number of non-stopword words present in both sets.
pub fn shared_words(a: &NormalizedText, b: &NormalizedText, stopwords: &Stopwords) -> usize {
    a.words()
        .intersection(b.words())
        .filter(|w| !stopwords.contains(w))
        .count()
}

/// Scores queries against patterns with fixed weights and encoder.
#[derive(Clone)]
pub struct SimilarityScorer {
    weights: Weights,
    encoder: Arc<dyn SemanticEncoder>,
    stopwords: Arc<Stopwords>,
}

impl SimilarityScorer {
    pub fn new(weights: Weights, encoder: Arc<dyn SemanticEncoder>) -> Self {
        Self {
            weights,
            encoder,
            stopwords: Arc::new(Stopwords::english()),
        }
    }

    pub fn with_stopwords(mut self, stopwords: Stopwords) -> Self {
        self.stopwords = Arc::new(stopwords);
        self
    }

    /// Scorer for a catalog: the configured encoder, fitted on `patterns`
    /// when it is the hashed one.
    pub fn from_config<'a, I>(cfg: &ScoringConfig, patterns: I) -> Result<Self, StartupDataError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let encoder = encoder_from_config(cfg, patterns)?;
        Ok(Self::new(Weights::from(cfg), encoder).with_stopwords(Stopwords::new(&cfg.stopwords)))
    }

    pub fn encoder_name(&self) -> &str {
        self.encoder.name()
    }

    /// Normalize and embed a text once so it can be scored many times.
    pub fn prepare(&self, raw: &str) -> Prepared {
        let text = NormalizedText::new(raw);
        let embedding = self.encoder.encode(text.as_str());
        Prepared { text, embedding }
    }

    /// Composite score of a query against one pattern.
    pub fn score(&self, query: &NormalizedText, pattern: &str) -> f64 {
        let query = Prepared {
            embedding: self.encoder.encode(query.as_str()),
            text: query.clone(),
        };
        self.breakdown(&query, &self.prepare(pattern)).total()
    }

    /// Per-signal contributions for prepared inputs.
    pub fn breakdown(&self, query: &Prepared, pattern: &Prepared) -> ScoreBreakdown {
        let lexical = lexical_ratio(query.text.as_str(), pattern.text.as_str());
        let keyword = shared_words(&query.text, &pattern.text, &self.stopwords) as f64;
        let semantic = query.embedding.similarity(&pattern.embedding);

        ScoreBreakdown {
            lexical: sanitize(lexical * self.weights.lexical),
            keyword: sanitize(keyword * self.weights.keyword),
            semantic: sanitize(semantic * self.weights.semantic),
        }
    }
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self::new(Weights::default(), Arc::new(HashedEncoder::default()))
    }
}

/// Scores are finite and non-negative.
fn sanitize(v: f64) -> f64 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexical_ratio_bounds() {
        assert_eq!(lexical_ratio("malaria", "malaria"), 100.0);
        assert_eq!(lexical_ratio("", ""), 0.0);
        let r = lexical_ratio("malaria", "malaira");
        assert!(r > 60.0 && r < 100.0);
    }

    #[test]
    fn test_keyword_overlap_weight() {
        let scorer = SimilarityScorer::default();
        let q = scorer.prepare("what are malaria symptoms");
        let p = scorer.prepare("malaria symptoms");
        let b = scorer.breakdown(&q, &p);
        assert_eq!(b.keyword, 20.0);
    }

    #[test]
    fn test_stopwords_score_nothing() {
        let scorer = SimilarityScorer::default();
        let q = scorer.prepare("what is cholera");
        let p = scorer.prepare("what is dengue");
        let b = scorer.breakdown(&q, &p);
        assert_eq!(b.keyword, 0.0);
        assert_eq!(b.semantic, 0.0);
        assert!(b.total() < 70.0);

        let q = scorer.prepare("what is the capital of france");
        let p = scorer.prepare("what is dengue");
        assert!(scorer.breakdown(&q, &p).total() < 70.0);
    }

    #[test]
    fn test_from_config_fits_catalog() {
        let cfg = ScoringConfig {
            stopwords: vec!["malaria".to_string()],
            ..ScoringConfig::default()
        };
        let scorer = SimilarityScorer::from_config(&cfg, ["malaria symptoms"]).unwrap();
        assert_eq!(scorer.encoder_name(), "hashed-terms");
        let q = scorer.prepare("malaria");
        let b = scorer.breakdown(&q, &scorer.prepare("malaria symptoms"));
        assert_eq!(b.keyword, 0.0);
        assert_eq!(b.semantic, 0.0);
    }

    #[test]
    fn test_score_is_deterministic() {
        let scorer = SimilarityScorer::default();
        let q = NormalizedText::new("How do I prevent dengue?");
        let a = scorer.score(&q, "dengue prevention");
        let b = scorer.score(&q, "dengue prevention");
        assert_eq!(a, b);
    }

    #[test]
    fn test_score_non_negative_and_finite() {
        let scorer = SimilarityScorer::default();
        for (q, p) in [("", "hello"), ("xyzzycorp", "malaria"), ("a", "a")] {
            let s = scorer.score(&NormalizedText::new(q), p);
            assert!(s.is_finite());
            assert!(s >= 0.0);
        }
    }

    #[test]
    fn test_weights_are_applied() {
        let weights = Weights {
            lexical: 0.0,
            keyword: 1.0,
            semantic: 0.0,
        };
        let scorer = SimilarityScorer::new(weights, Arc::new(HashedEncoder::default()));
        let q = NormalizedText::new("fever and chills");
        assert_eq!(scorer.score(&q, "chills with fever"), 2.0);
    }

    #[test]
    fn test_malaria_symptoms_scenario_over_threshold() {
        let scorer = SimilarityScorer::default();
        let q = NormalizedText::new("what are malaria symptoms");
        assert!(scorer.score(&q, "malaria symptoms") >= 70.0);
    }
}
