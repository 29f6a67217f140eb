//! Query normalization.
//!
//! Lowercase, trim, collapse internal whitespace. Tokens are the maximal
//! alphanumeric runs of the normalized text.

use std::collections::{BTreeSet, HashSet};

/// Function words that say nothing about the topic of a question.
/// Greetings are deliberately absent so small-talk intents keep their words.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "a", "about", "am", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by", "can",
    "could", "did", "do", "does", "for", "from", "get", "had", "has", "have", "he", "her", "here",
    "him", "his", "how", "i", "if", "in", "is", "it", "its", "may", "me", "might", "must", "my",
    "of", "on", "or", "our", "please", "shall", "she", "should", "so", "some", "tell", "that",
    "the", "their", "them", "there", "these", "they", "this", "those", "to", "was", "we", "were",
    "what", "when", "where", "which", "who", "whom", "whose", "why", "will", "with", "would",
    "you", "your",
];

/// Normalized query or pattern text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedText {
    text: String,
    words: BTreeSet<String>,
}

impl NormalizedText {
    pub fn new(raw: &str) -> Self {
        let text = normalize(raw);
        let words = tokenize(&text).into_iter().collect();
        Self { text, words }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn words(&self) -> &BTreeSet<String> {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl std::fmt::Display for NormalizedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Words ignored by the keyword and hashed semantic signals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stopwords(HashSet<String>);

impl Stopwords {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            words
                .into_iter()
                .map(|w| w.as_ref().trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect(),
        )
    }

    /// The built-in English list
    pub fn english() -> Self {
        Self::new(DEFAULT_STOPWORDS)
    }

    pub fn contains(&self, word: &str) -> bool {
        self.0.contains(word)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Lowercase, trim, and collapse runs of whitespace to one space.
pub fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split into lowercase alphanumeric words, in order, duplicates kept.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_case_and_whitespace() {
        assert_eq!(normalize("  What ARE   Malaria\tSymptoms \n"), "what are malaria symptoms");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        let tokens = tokenize("Dengue? fever, (high) - care!");
        assert_eq!(tokens, vec!["dengue", "fever", "high", "care"]);
    }

    #[test]
    fn test_word_set_dedups() {
        let text = NormalizedText::new("fever fever FEVER chills");
        assert_eq!(text.words().len(), 2);
        assert!(text.words().contains("chills"));
    }

    #[test]
    fn test_stopwords_are_case_insensitive() {
        let stop = Stopwords::new(["What", " IS ", ""]);
        assert_eq!(stop.len(), 2);
        assert!(stop.contains("what"));
        assert!(stop.contains("is"));
        assert!(!stop.contains("cholera"));
    }

    #[test]
    fn test_english_list_keeps_greetings() {
        let stop = Stopwords::english();
        assert!(stop.contains("what"));
        for word in ["hello", "hi", "hey", "bye", "thanks"] {
            assert!(!stop.contains(word), "{} must stay matchable", word);
        }
    }

    #[test]
    fn test_empty_input() {
        let text = NormalizedText::new(" \t ");
        assert!(text.is_empty());
        assert!(text.words().is_empty());
    }
}
