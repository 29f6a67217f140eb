//! Response composition.
//!
//! Turns whatever stage accepted into user-facing text: a random canned
//! response for intents, labelled fields for records, and attributed
//! passthrough for external summaries.

use crate::external::{LookupMiss, Summary};
use crate::types::{Intent, TopicRecord};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Terminal answer when no stage accepts.
pub const APOLOGY: &str = "I am sorry, I am not trained to answer that question. \
Please try rephrasing or ask about a different topic. \
For medical emergencies, please contact a healthcare professional.";

/// Picks an index in `0..len` for the response list. `len` is never zero.
pub trait ResponseChooser: Send + Sync {
    fn choose(&self, len: usize) -> usize;
}

/// Uniform choice from a seedable generator.
pub struct SeededChooser {
    rng: Mutex<StdRng>,
}

impl SeededChooser {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
        }
    }
}

impl ResponseChooser for SeededChooser {
    fn choose(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..len),
            Err(poisoned) => poisoned.into_inner().gen_range(0..len),
        }
    }
}

/// Always the same index (wrapped into range).
#[derive(Debug, Clone, Copy)]
pub struct FixedChooser(pub usize);

impl ResponseChooser for FixedChooser {
    fn choose(&self, len: usize) -> usize {
        if len == 0 {
            0
        } else {
            self.0 % len
        }
    }
}

/// One of the intent's responses, chosen by `chooser`.
pub fn pick_response<'a>(intent: &'a Intent, chooser: &dyn ResponseChooser) -> &'a str {
    let idx = chooser.choose(intent.responses.len());
    intent
        .responses
        .get(idx)
        .or_else(|| intent.responses.first())
        .map(String::as_str)
        .unwrap_or(APOLOGY)
}

/// "side_effects" -> "Side effects"
pub fn field_label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Render a record. `requested` empty means every configured field.
pub fn format_record(record: &TopicRecord, fields: &[String], requested: &[String]) -> String {
    let wanted = if requested.is_empty() { fields } else { requested };

    let mut lines = vec![record.name.clone()];
    let mut missing = Vec::new();
    for field in wanted {
        match record.field(field) {
            Some(value) => lines.push(format!("{}: {}", field_label(field), value)),
            None => missing.push(field_label(field).to_lowercase()),
        }
    }

    if lines.len() == 1 {
        if requested.is_empty() {
            return format!("I have no further details about {}.", record.name);
        }
        return format!(
            "I have no {} information about {}.",
            missing.join(" or "),
            record.name
        );
    }
    lines.join("\n")
}

/// Disambiguation filter plus attribution. A summary that looks like a
/// topic-listing page is rejected.
pub fn screen_external(summary: &Summary, markers: &[String]) -> Result<String, LookupMiss> {
    let extract = summary.extract.trim();
    if extract.is_empty() {
        return Err(LookupMiss::EmptyExtract);
    }
    let lower = extract.to_lowercase();
    if let Some(marker) = markers
        .iter()
        .find(|m| !m.is_empty() && lower.contains(&m.to_lowercase()))
    {
        return Err(LookupMiss::Disambiguation(marker.clone()));
    }

    let attribution = match &summary.url {
        Some(url) => format!("(Source: {}, {})", summary.source, url),
        None => format!("(Source: {})", summary.source),
    };
    Ok(format!("{}\n\n{}", extract, attribution))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> Vec<String> {
        vec!["may refer to".to_string(), "is a list of".to_string()]
    }

    fn summary(extract: &str) -> Summary {
        Summary {
            title: "Test".to_string(),
            extract: extract.to_string(),
            url: None,
            source: "Wikipedia".to_string(),
        }
    }

    #[test]
    fn test_seeded_chooser_is_reproducible() {
        let a = SeededChooser::new(Some(42));
        let b = SeededChooser::new(Some(42));
        let xs: Vec<usize> = (0..20).map(|_| a.choose(5)).collect();
        let ys: Vec<usize> = (0..20).map(|_| b.choose(5)).collect();
        assert_eq!(xs, ys);
        assert!(xs.iter().all(|&i| i < 5));
    }

    #[test]
    fn test_pick_response_membership() {
        let intent = Intent::new("flu", &["flu"], &["Rest.", "Drink fluids.", "See a doctor."]);
        let chooser = SeededChooser::new(None);
        for _ in 0..50 {
            let r = pick_response(&intent, &chooser);
            assert!(intent.responses.iter().any(|x| x == r));
        }
        assert_eq!(pick_response(&intent, &FixedChooser(4)), "Drink fluids.");
    }

    #[test]
    fn test_field_label() {
        assert_eq!(field_label("side_effects"), "Side effects");
        assert_eq!(field_label("symptoms"), "Symptoms");
        assert_eq!(field_label(""), "");
    }

    #[test]
    fn test_format_record_all_fields() {
        let record = TopicRecord::new(
            "Malaria",
            &[("symptoms", "Fever, chills"), ("treatment", "Antimalarial drugs")],
        );
        let fields = vec!["symptoms".to_string(), "treatment".to_string(), "side_effects".to_string()];
        let text = format_record(&record, &fields, &[]);
        assert_eq!(text, "Malaria\nSymptoms: Fever, chills\nTreatment: Antimalarial drugs");
    }

    #[test]
    fn test_format_record_requested_field() {
        let record = TopicRecord::new(
            "Malaria",
            &[("symptoms", "Fever, chills"), ("treatment", "Antimalarial drugs")],
        );
        let fields = vec!["symptoms".to_string(), "treatment".to_string()];
        let text = format_record(&record, &fields, &["symptoms".to_string()]);
        assert_eq!(text, "Malaria\nSymptoms: Fever, chills");

        let text = format_record(&record, &fields, &["precautions".to_string()]);
        assert_eq!(text, "I have no precautions information about Malaria.");
    }

    #[test]
    fn test_screen_rejects_disambiguation() {
        let s = summary("Mercury may refer to: a planet, an element, a god.");
        assert_eq!(
            screen_external(&s, &markers()),
            Err(LookupMiss::Disambiguation("may refer to".to_string()))
        );
        let s = summary("This IS A LIST OF tropical diseases.");
        assert!(screen_external(&s, &markers()).is_err());
    }

    #[test]
    fn test_screen_attributes_source() {
        let mut s = summary("Cholera is an infection of the small intestine.");
        let text = screen_external(&s, &markers()).unwrap();
        assert!(text.starts_with("Cholera is an infection"));
        assert!(text.ends_with("(Source: Wikipedia)"));

        s.url = Some("https://en.wikipedia.org/wiki/Cholera".to_string());
        let text = screen_external(&s, &markers()).unwrap();
        assert!(text.ends_with("(Source: Wikipedia, https://en.wikipedia.org/wiki/Cholera)"));
    }

    #[test]
    fn test_screen_empty_extract() {
        assert_eq!(
            screen_external(&summary("  "), &markers()),
            Err(LookupMiss::EmptyExtract)
        );
    }
}
