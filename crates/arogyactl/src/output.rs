//! Output formatting - plain ASCII terminal output

use arogya_common::selector::RankedCandidate;
use arogya_common::{Resolution, Stage};
use owo_colors::OwoColorize;

/// Bracketed stage tag, colored by how confident the stage is
pub fn stage_tag(stage: Stage) -> String {
    let tag = format!("[{}]", stage.to_string().to_uppercase());
    match stage {
        Stage::Exact | Stage::Intent => tag.bright_green().to_string(),
        Stage::Record => tag.cyan().to_string(),
        Stage::External => tag.yellow().to_string(),
        Stage::Apology => tag.bright_red().to_string(),
    }
}

/// Display a resolution to the user
pub fn display_resolution(resolution: &Resolution) {
    println!("{}", resolution.answer);

    let mut meta = stage_tag(resolution.stage);
    if let Some(source) = &resolution.source {
        meta.push_str(&format!(" {}", source.dimmed()));
    }
    if let Some(score) = resolution.score {
        meta.push_str(&format!(" ({:.1})", score));
    }
    println!();
    println!("{}", meta);
}

/// Render ranked candidates as an aligned table
pub fn format_ranked(ranked: &[RankedCandidate], threshold: f64) -> String {
    let mut out = format!(
        "{:>3}  {:<24} {:<32} {:>7} {:>7} {:>7} {:>7}\n",
        "#", "INTENT", "PATTERN", "LEX", "KEY", "SEM", "TOTAL"
    );
    for (i, c) in ranked.iter().enumerate() {
        let marker = if c.score >= threshold { "*" } else { " " };
        out.push_str(&format!(
            "{:>3}{} {:<24} {:<32} {:>7.1} {:>7.1} {:>7.1} {:>7.1}\n",
            i + 1,
            marker,
            truncate(&c.intent_tag, 24),
            truncate(&c.pattern_text, 32),
            c.breakdown.lexical,
            c.breakdown.keyword,
            c.breakdown.semantic,
            c.score
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let mut t: String = s.chars().take(max.saturating_sub(3)).collect();
        t.push_str("...");
        t
    }
}
