//! Command implementations

use crate::output::{display_resolution, format_ranked};
use anyhow::{bail, Context, Result};
use arogya_common::transcript::Transcript;
use arogya_common::{Config, FallbackResolver, IntentCatalog, RecordStore, StartupDataError};
use owo_colors::OwoColorize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

/// Words that end a chat session
const QUIT_WORDS: &[&str] = &["quit", "exit"];

/// Effective config: explicit file, else the usual search order.
pub fn load_config(path: Option<&Path>, offline: bool) -> Result<Config> {
    let mut config = match path {
        Some(p) => Config::load_from_path(p)?,
        None => Config::load(),
    };
    if offline {
        config.external.enabled = false;
    }
    Ok(config)
}

fn build_resolver(config: &Config) -> Result<FallbackResolver> {
    FallbackResolver::from_config(config).context("Failed to start the resolver")
}

pub async fn ask(config: &Config, question: &str, json: bool) -> Result<()> {
    let resolver = build_resolver(config)?;
    let resolution = resolver.resolve_detailed(question).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&resolution)?);
    } else {
        display_resolution(&resolution);
    }
    Ok(())
}

pub async fn chat(config: &Config, save: Option<PathBuf>) -> Result<()> {
    let resolver = build_resolver(config)?;
    println!(
        "{} Ask a health question. Type \"quit\" to leave.",
        "[AROGYA]".bright_green()
    );

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut transcript = Transcript::new();
    run_chat(&resolver, stdin.lock(), &mut stdout, &mut transcript).await?;

    if let Some(path) = save {
        transcript
            .save(&path)
            .with_context(|| format!("Failed to save transcript to {:?}", path))?;
        println!("Transcript saved to {}", path.display());
    }
    Ok(())
}

/// REPL body: one line in, one answer out, until EOF or a quit word.
/// Blank lines are skipped and never reach the resolver.
pub async fn run_chat<R: BufRead, W: Write>(
    resolver: &FallbackResolver,
    input: R,
    out: &mut W,
    transcript: &mut Transcript,
) -> Result<()> {
    write!(out, "you> ")?;
    out.flush()?;
    for line in input.lines() {
        let line = line?;
        let question = line.trim();
        if QUIT_WORDS.contains(&question.to_lowercase().as_str()) {
            break;
        }
        if !question.is_empty() {
            let answer = resolver.resolve(question).await;
            writeln!(out, "arogya> {}", answer)?;
            transcript.push_turn(question, &answer);
        }
        write!(out, "you> ")?;
        out.flush()?;
    }
    writeln!(out)?;
    Ok(())
}

/// Outcome of loading one data file
#[derive(Debug)]
pub struct CheckItem {
    pub name: &'static str,
    pub path: PathBuf,
    /// Summary on success, `(kind, message)` on failure
    pub result: std::result::Result<String, (&'static str, String)>,
}

fn failure(e: StartupDataError) -> (&'static str, String) {
    (e.kind(), e.to_string())
}

/// Load both data files the way the resolver does, without stopping at
/// the first failure.
pub fn check_data(config: &Config) -> Vec<CheckItem> {
    let intents = IntentCatalog::load_intents(&config.catalog.intents_path)
        .map(|c| format!("{} intents, {} patterns", c.len(), c.pattern_count()))
        .map_err(failure);

    let records = RecordStore::load_records(
        &config.catalog.records_path,
        &config.catalog.records_table,
        &config.catalog.record_fields,
        config.records.field_keywords.clone(),
    )
    .map(|r| format!("{} records, fields {}", r.len(), r.fields().join(", ")))
    .map_err(failure);

    vec![
        CheckItem {
            name: "intents",
            path: config.catalog.intents_path.clone(),
            result: intents,
        },
        CheckItem {
            name: "records",
            path: config.catalog.records_path.clone(),
            result: records,
        },
    ]
}

pub fn check(config: &Config) -> Result<()> {
    let items = check_data(config);
    let mut failed = 0;
    for item in &items {
        match &item.result {
            Ok(summary) => println!(
                "{} {:<8} {} ({})",
                "[OK]".bright_green(),
                item.name,
                summary,
                item.path.display()
            ),
            Err((kind, message)) => {
                failed += 1;
                println!(
                    "{} {:<8} {}: {}",
                    "[FAIL]".bright_red(),
                    item.name,
                    kind,
                    message
                );
            }
        }
    }
    if failed > 0 {
        bail!("{} of {} data files failed to load", failed, items.len());
    }
    Ok(())
}

pub fn explain(config: &Config, question: &str, top: usize) -> Result<()> {
    if top == 0 {
        bail!("--top must be at least 1");
    }
    let resolver = build_resolver(config)?;
    let ranked = resolver.explain(question, top);
    print!("{}", format_ranked(&ranked, config.scoring.intent_threshold));
    println!(
        "\n* at or above the intent threshold ({:.1})",
        config.scoring.intent_threshold
    );
    Ok(())
}

pub fn config(config: &Config, init: Option<PathBuf>) -> Result<()> {
    match init {
        Some(path) => {
            if path.exists() {
                bail!("{} already exists", path.display());
            }
            Config::save_default(&path)?;
            println!("Wrote default configuration to {}", path.display());
        }
        None => print!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}
