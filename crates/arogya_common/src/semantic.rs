//! Sentence-level similarity.
//!
//! `SemanticEncoder` turns text into a dense vector; similarity is the cosine
//! clamped to [0, 1]. The bundled `HashedEncoder` hashes lightly stemmed
//! content words into fixed buckets, weighted by how rare each word is among
//! the catalog patterns. It needs no model files and is fully deterministic.
//! With the `onnx` feature a transformer model can be configured instead.

use crate::config::ScoringConfig;
use crate::error::StartupDataError;
use crate::normalize::{tokenize, Stopwords};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Dense sentence representation.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Cosine similarity clamped to [0, 1]. Zero vectors and mismatched
    /// dimensions score 0.
    pub fn similarity(&self, other: &Embedding) -> f64 {
        if self.0.len() != other.0.len() {
            return 0.0;
        }
        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;
        for (a, b) in self.0.iter().zip(&other.0) {
            let (a, b) = (*a as f64, *b as f64);
            dot += a * b;
            norm_a += a * a;
            norm_b += b * b;
        }
        if norm_a <= f64::EPSILON || norm_b <= f64::EPSILON {
            return 0.0;
        }
        let cos = dot / (norm_a.sqrt() * norm_b.sqrt());
        if cos.is_finite() {
            cos.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Produces sentence embeddings.
pub trait SemanticEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Embedding;

    /// Encoder identifier for diagnostics
    fn name(&self) -> &str;
}

/// Feature-hashing encoder over weighted content words.
#[derive(Debug, Clone)]
pub struct HashedEncoder {
    dimensions: usize,
    stopwords: Stopwords,
    /// Patterns containing each stemmed term
    document_freq: HashMap<String, usize>,
    documents: usize,
}

impl HashedEncoder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            stopwords: Stopwords::english(),
            document_freq: HashMap::new(),
            documents: 0,
        }
    }

    pub fn with_stopwords(mut self, stopwords: Stopwords) -> Self {
        self.stopwords = stopwords;
        self
    }

    /// Count document frequencies over a corpus, one document per text.
    /// Terms found in many patterns then weigh less than rare ones.
    pub fn fit<'a, I>(mut self, documents: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.document_freq.clear();
        self.documents = 0;
        for doc in documents {
            let tokens = tokenize(doc);
            let terms: HashSet<String> = self.terms(&tokens).map(String::from).collect();
            for term in terms {
                *self.document_freq.entry(term).or_default() += 1;
            }
            self.documents += 1;
        }
        self
    }

    /// Stemmed content words of a token list.
    fn terms<'t>(&'t self, tokens: &'t [String]) -> impl Iterator<Item = &'t str> + 't {
        tokens
            .iter()
            .filter(|t| !self.stopwords.contains(t))
            .map(|t| stem(t))
    }

    /// Smoothed inverse document frequency; 1.0 for every term when unfitted.
    fn idf(&self, term: &str) -> f32 {
        let df = self.document_freq.get(term).copied().unwrap_or(0) as f32;
        ((self.documents as f32 + 1.0) / (df + 1.0)).ln() + 1.0
    }

    /// FNV-1a bucket for a term.
    fn bucket(&self, term: &str) -> usize {
        let mut h: u64 = 0xcbf29ce484222325;
        for b in term.as_bytes() {
            h ^= *b as u64;
            h = h.wrapping_mul(0x100000001b3);
        }
        (h % self.dimensions as u64) as usize
    }
}

impl Default for HashedEncoder {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Fold simple English plurals so "symptom" and "symptoms" share a term.
fn stem(word: &str) -> &str {
    if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
        &word[..word.len() - 1]
    } else {
        word
    }
}

impl SemanticEncoder for HashedEncoder {
    fn encode(&self, text: &str) -> Embedding {
        let tokens = tokenize(text);
        let mut values = vec![0.0f32; self.dimensions];

        let mut tf: HashMap<&str, f32> = HashMap::new();
        for term in self.terms(&tokens) {
            *tf.entry(term).or_default() += 1.0;
        }
        if tf.is_empty() {
            return Embedding(values);
        }

        let total: f32 = tf.values().sum();
        for (term, count) in tf {
            let weight = (1.0 + (term.len() as f32).ln()) * self.idf(term);
            values[self.bucket(term)] += (count / total) * weight;
        }

        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut values {
                *v /= norm;
            }
        }
        Embedding(values)
    }

    fn name(&self) -> &str {
        "hashed-terms"
    }
}

/// Pick the encoder named by `[scoring]`: the ONNX model when `model_path`
/// is set and supported, otherwise `HashedEncoder` fitted on `patterns`.
pub fn encoder_from_config<'a, I>(
    cfg: &ScoringConfig,
    patterns: I,
) -> Result<Arc<dyn SemanticEncoder>, StartupDataError>
where
    I: IntoIterator<Item = &'a str>,
{
    if let Some(model) = &cfg.model_path {
        if let Some(encoder) = model_encoder(cfg, model)? {
            info!(encoder = %encoder.name(), "Semantic encoder loaded");
            return Ok(encoder);
        }
    }
    let encoder = HashedEncoder::new(cfg.embedding_dimensions)
        .with_stopwords(Stopwords::new(&cfg.stopwords))
        .fit(patterns);
    Ok(Arc::new(encoder))
}

#[cfg(feature = "onnx")]
fn model_encoder(
    cfg: &ScoringConfig,
    model: &Path,
) -> Result<Option<Arc<dyn SemanticEncoder>>, StartupDataError> {
    let vocab = cfg
        .vocab_path
        .clone()
        .unwrap_or_else(|| model.with_file_name("vocab.txt"));
    let encoder: Arc<dyn SemanticEncoder> = Arc::new(crate::onnx_encoder::OnnxEncoder::load(
        model,
        &vocab,
        cfg.max_tokens,
    )?);
    Ok(Some(encoder))
}

#[cfg(not(feature = "onnx"))]
fn model_encoder(
    _cfg: &ScoringConfig,
    model: &Path,
) -> Result<Option<Arc<dyn SemanticEncoder>>, StartupDataError> {
    tracing::warn!(
        model = %model.display(),
        "Built without the onnx feature, using the hashed-terms encoder"
    );
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_scores_one() {
        let enc = HashedEncoder::default();
        let a = enc.encode("malaria symptoms");
        let b = enc.encode("Malaria   Symptoms");
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_plural_folding() {
        let enc = HashedEncoder::default();
        let a = enc.encode("symptom");
        let b = enc.encode("symptoms");
        assert!((a.similarity(&b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_text_scores_zero() {
        let enc = HashedEncoder::new(64);
        let a = enc.encode("");
        let b = enc.encode("fever");
        assert_eq!(a.dimensions(), 64);
        assert_eq!(a.similarity(&b), 0.0);
    }

    #[test]
    fn test_related_beats_unrelated() {
        let enc = HashedEncoder::default();
        let q = enc.encode("how to prevent dengue");
        let related = enc.encode("dengue prevention tips");
        let unrelated = enc.encode("vaccination schedule for children");
        assert!(q.similarity(&related) > q.similarity(&unrelated));
    }

    #[test]
    fn test_similarity_bounded() {
        let enc = HashedEncoder::new(8);
        let a = enc.encode("one two three four five six seven eight nine");
        let b = enc.encode("ten eleven twelve thirteen");
        let s = a.similarity(&b);
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn test_question_words_carry_no_meaning() {
        let enc = HashedEncoder::default();
        let a = enc.encode("what is cholera");
        let b = enc.encode("what is dengue");
        assert_eq!(a.similarity(&b), 0.0);
        assert_eq!(enc.encode("what is it").similarity(&b), 0.0);
    }

    #[test]
    fn test_custom_stopwords() {
        let enc = HashedEncoder::default().with_stopwords(Stopwords::new(["fever"]));
        let a = enc.encode("fever");
        assert_eq!(a.similarity(&enc.encode("fever")), 0.0);
        let b = enc.encode("dengue fever");
        assert!((b.similarity(&enc.encode("dengue")) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_favours_rare_terms() {
        let corpus = [
            "malaria symptoms",
            "malaria prevention",
            "how to prevent malaria",
            "signs of malaria",
            "dengue fever",
        ];
        let plain = HashedEncoder::default();
        let fitted = HashedEncoder::default().fit(corpus);

        let closer = |enc: &HashedEncoder| {
            let q = enc.encode("malaria fever");
            q.similarity(&enc.encode("dengue fever")) > q.similarity(&enc.encode("malaria cough"))
        };
        assert!(!closer(&plain));
        assert!(closer(&fitted));
    }

    #[test]
    fn test_fit_keeps_identity() {
        let fitted = HashedEncoder::default().fit(["dengue fever", "malaria symptoms"]);
        let a = fitted.encode("Dengue fever");
        assert!((a.similarity(&fitted.encode("dengue   FEVER")) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_config_without_model_uses_hashed_encoder() {
        let cfg = ScoringConfig::default();
        let enc = encoder_from_config(&cfg, ["what is dengue"]).unwrap();
        assert_eq!(enc.name(), "hashed-terms");
        assert_eq!(enc.encode("dengue").dimensions(), cfg.embedding_dimensions);
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_model_path_without_onnx_support_falls_back() {
        let cfg = ScoringConfig {
            model_path: Some("models/does-not-exist.onnx".into()),
            ..ScoringConfig::default()
        };
        let enc = encoder_from_config(&cfg, ["dengue fever"]).unwrap();
        assert_eq!(enc.name(), "hashed-terms");
    }

    #[cfg(feature = "onnx")]
    #[test]
    fn test_missing_model_is_startup_error() {
        let cfg = ScoringConfig {
            model_path: Some("models/does-not-exist.onnx".into()),
            ..ScoringConfig::default()
        };
        let err = encoder_from_config(&cfg, ["dengue fever"]).err().unwrap();
        assert_eq!(err.kind(), "model");
    }

    #[test]
    fn test_dimension_mismatch_scores_zero() {
        let a = Embedding::new(vec![1.0, 0.0]);
        let b = Embedding::new(vec![1.0, 0.0, 0.0]);
        assert_eq!(a.similarity(&b), 0.0);
    }
}
