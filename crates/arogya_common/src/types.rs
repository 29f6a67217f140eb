//! Plain value types shared by the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named topic with example phrasings and canned responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    pub tag: String,
    pub patterns: Vec<String>,
    pub responses: Vec<String>,
}

impl Intent {
    pub fn new(tag: &str, patterns: &[&str], responses: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            responses: responses.iter().map(|r| r.to_string()).collect(),
        }
    }
}

/// Structured topic entry keyed by name, with free-text attribute fields
/// (symptoms, treatment, ...). Which fields exist is configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicRecord {
    pub name: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl TopicRecord {
    pub fn new(name: &str, fields: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Field value, `None` when absent or blank.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Best candidate of one scoring pass. Never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredCandidate {
    pub intent_tag: String,
    pub pattern_text: String,
    pub score: f64,
}

/// One (query, response) pair written to the interaction log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InteractionLogEntry {
    pub query: String,
    pub response: String,
}

impl InteractionLogEntry {
    pub fn new(query: &str, response: &str) -> Self {
        Self {
            query: query.to_string(),
            response: response.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_field_blank_is_absent() {
        let record = TopicRecord::new("Malaria", &[("symptoms", "Fever"), ("treatment", "  ")]);
        assert_eq!(record.field("symptoms"), Some("Fever"));
        assert_eq!(record.field("treatment"), None);
        assert_eq!(record.field("precautions"), None);
    }

    #[test]
    fn test_record_json_flattens_fields() {
        let json = r#"{"name": "Diabetes", "symptoms": "Increased thirst", "treatment": "Insulin"}"#;
        let record: TopicRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.name, "Diabetes");
        assert_eq!(record.fields.len(), 2);
        assert_eq!(record.field("treatment"), Some("Insulin"));
    }
}
