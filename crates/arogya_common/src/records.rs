//! Structured topic records.
//!
//! Records come from a SQLite table (one row per topic, one column per
//! attribute) or from a JSON array. They are loaded once, indexed by
//! lowercase name and never written at request time.

use crate::error::StartupDataError;
use crate::normalize::{tokenize, NormalizedText};
use crate::similarity::lexical_ratio;
use crate::types::TopicRecord;
use rusqlite::{Connection, OpenFlags};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info, warn};

/// Accepted record with its lexical score and the fields to surface.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMatch<'a> {
    pub record: &'a TopicRecord,
    pub score: f64,
    /// Fields named by sub-intent keywords; empty means all fields.
    pub requested: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<TopicRecord>,
    by_name: HashMap<String, usize>,
    fields: Vec<String>,
    field_keywords: BTreeMap<String, Vec<String>>,
}

impl RecordStore {
    /// Build from in-memory records. Names are unique case-insensitively.
    pub fn from_records(
        records: Vec<TopicRecord>,
        fields: Vec<String>,
        field_keywords: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, StartupDataError> {
        let mut by_name = HashMap::new();
        let mut kept = Vec::with_capacity(records.len());
        for record in records {
            let key = record.name.trim().to_lowercase();
            if key.is_empty() {
                warn!("Skipping record with blank name");
                continue;
            }
            if by_name.insert(key, kept.len()).is_some() {
                return Err(StartupDataError::DuplicateRecord(record.name));
            }
            kept.push(record);
        }
        Ok(Self {
            records: kept,
            by_name,
            fields,
            field_keywords,
        })
    }

    /// Load records from `path`: `.json` files are parsed as an array of
    /// records, anything else is opened read-only as SQLite.
    pub fn load_records(
        path: &Path,
        table: &str,
        fields: &[String],
        field_keywords: BTreeMap<String, Vec<String>>,
    ) -> Result<Self, StartupDataError> {
        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let (records, fields) = if is_json {
            (load_json(path)?, fields.to_vec())
        } else {
            load_sqlite(path, table, fields)?
        };

        let store = Self::from_records(records, fields, field_keywords)?;
        info!(
            "Loaded {} records with fields {:?} from {:?}",
            store.len(),
            store.fields,
            path
        );
        Ok(store)
    }

    /// Case-insensitive lookup by name.
    pub fn find_record(&self, name: &str) -> Option<&TopicRecord> {
        self.by_name
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.records[i])
    }

    pub fn records(&self) -> &[TopicRecord] {
        &self.records
    }

    /// Configured fields, in display order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Best record by lexical similarity between its name and a run of
    /// query words of the same length. Names and queries are tokenized the
    /// same way, so "COVID-19" and "covid 19" compare equal. Accepted when
    /// `score > threshold`.
    pub fn match_query(&self, query: &NormalizedText, threshold: f64) -> Option<RecordMatch<'_>> {
        let words = tokenize(query.as_str());
        if words.is_empty() {
            return None;
        }

        let mut best: Option<(usize, f64)> = None;
        for (idx, record) in self.records.iter().enumerate() {
            let name_words = tokenize(&record.name);
            if name_words.is_empty() {
                continue;
            }
            let name = name_words.join(" ");
            let width = name_words.len().min(words.len());
            for window in words.windows(width) {
                let score = lexical_ratio(&window.join(" "), &name);
                match best {
                    Some((_, top)) if score <= top => {}
                    _ => best = Some((idx, score)),
                }
            }
        }

        let (idx, score) = best?;
        let record = &self.records[idx];
        if score > threshold {
            debug!("Record '{}' matched with score {:.1}", record.name, score);
            Some(RecordMatch {
                record,
                score,
                requested: self.requested_fields(query),
            })
        } else {
            debug!(
                "Best record '{}' scored {:.1}, not above {:.1}",
                record.name, score, threshold
            );
            None
        }
    }

    /// Fields whose trigger keywords appear in the query, in field order.
    pub fn requested_fields(&self, query: &NormalizedText) -> Vec<String> {
        let words = tokenize(query.as_str());
        self.fields
            .iter()
            .filter(|field| {
                self.field_keywords
                    .get(*field)
                    .map(|kws| kws.iter().any(|kw| mentions(&words, kw)))
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }
}

/// Whether a keyword occurs as consecutive query words. Each keyword word
/// must start a query word, so "treat" covers "treatment" but not "retreat".
fn mentions(words: &[String], keyword: &str) -> bool {
    let phrase = tokenize(keyword);
    if phrase.is_empty() || phrase.len() > words.len() {
        return false;
    }
    words.windows(phrase.len()).any(|window| {
        window
            .iter()
            .zip(&phrase)
            .all(|(word, part)| word.starts_with(part.as_str()))
    })
}

fn load_json(path: &Path) -> Result<Vec<TopicRecord>, StartupDataError> {
    let content = std::fs::read_to_string(path).map_err(|source| StartupDataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StartupDataError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Read every row of `table`. Configured fields missing from the table
/// are dropped; at least one must remain.
fn load_sqlite(
    path: &Path,
    table: &str,
    fields: &[String],
) -> Result<(Vec<TopicRecord>, Vec<String>), StartupDataError> {
    let sql_err = |source: rusqlite::Error| StartupDataError::Sqlite {
        path: path.to_path_buf(),
        source,
    };

    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .map_err(sql_err)?;
    let table_ident = quote_ident(table);

    let columns: Vec<String> = {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({})", table_ident))
            .map_err(sql_err)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(sql_err)?;
        rows.collect::<Result<_, _>>().map_err(sql_err)?
    };

    let present: Vec<String> = fields
        .iter()
        .filter(|f| columns.iter().any(|c| c.eq_ignore_ascii_case(f)))
        .cloned()
        .collect();
    if present.is_empty() || !columns.iter().any(|c| c.eq_ignore_ascii_case("name")) {
        return Err(StartupDataError::NoRecordFields {
            table: table.to_string(),
            fields: fields.to_vec(),
        });
    }
    for missing in fields.iter().filter(|f| !present.contains(*f)) {
        debug!("Record table '{}' has no column '{}'", table, missing);
    }

    let select = std::iter::once("name".to_string())
        .chain(present.iter().map(|f| quote_ident(f)))
        .collect::<Vec<_>>()
        .join(", ");
    let mut stmt = conn
        .prepare(&format!("SELECT {} FROM {} ORDER BY rowid", select, table_ident))
        .map_err(sql_err)?;

    let rows = stmt
        .query_map([], |row| {
            let name: String = row.get(0)?;
            let mut values = BTreeMap::new();
            for (i, field) in present.iter().enumerate() {
                if let Some(v) = row.get::<_, Option<String>>(i + 1)? {
                    values.insert(field.clone(), v);
                }
            }
            Ok(TopicRecord {
                name,
                fields: values,
            })
        })
        .map_err(sql_err)?;
    let records = rows.collect::<Result<Vec<_>, _>>().map_err(sql_err)?;

    Ok((records, present))
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
