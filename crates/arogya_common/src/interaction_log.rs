//! Interaction log: append-only (query, response) records.
//!
//! Two sinks: a SQLite `chat_logs` table and a JSONL file. Writers are
//! serialized by a mutex per sink. `InteractionLogger` is the
//! fire-and-forget front: failures are reported through `tracing` and never
//! reach the caller.

use crate::config::{LogBackend, LogConfig};
use crate::error::LogError;
use crate::types::InteractionLogEntry;
use chrono::Utc;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Append-only store of interactions
pub trait InteractionLog: Send + Sync {
    fn append(&self, entry: &InteractionLogEntry) -> Result<(), LogError>;

    /// Sink name for diagnostics
    fn name(&self) -> &str;
}

fn ensure_parent(path: &Path) -> Result<(), LogError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// SQLite-backed log
pub struct SqliteInteractionLog {
    conn: Mutex<Connection>,
}

impl SqliteInteractionLog {
    pub fn open(path: &Path) -> Result<Self, LogError> {
        ensure_parent(path)?;
        let conn = Connection::open(path)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS chat_logs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                query TEXT NOT NULL,
                response TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
            [],
        )?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Most recent `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Result<Vec<InteractionLogEntry>, LogError> {
        let conn = self.conn.lock().map_err(|_| LogError::Poisoned)?;
        let mut stmt = conn.prepare(
            "SELECT query, response FROM (
                SELECT id, query, response FROM chat_logs ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok(InteractionLogEntry {
                query: row.get(0)?,
                response: row.get(1)?,
            })
        })?;
        let entries = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

impl InteractionLog for SqliteInteractionLog {
    fn append(&self, entry: &InteractionLogEntry) -> Result<(), LogError> {
        let conn = self.conn.lock().map_err(|_| LogError::Poisoned)?;
        conn.execute(
            "INSERT INTO chat_logs (query, response, created_at) VALUES (?1, ?2, ?3)",
            params![&entry.query, &entry.response, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonlLine {
    timestamp: String,
    query: String,
    response: String,
}

/// JSON-lines file log
pub struct JsonlInteractionLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlInteractionLog {
    pub fn open(path: &Path) -> Result<Self, LogError> {
        ensure_parent(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    /// All entries in file order; unreadable lines are skipped
    pub fn read_all(&self) -> Result<Vec<InteractionLogEntry>, LogError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let file = fs::File::open(&self.path)?;
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if let Ok(parsed) = serde_json::from_str::<JsonlLine>(&line) {
                entries.push(InteractionLogEntry {
                    query: parsed.query,
                    response: parsed.response,
                });
            }
        }
        Ok(entries)
    }
}

impl InteractionLog for JsonlInteractionLog {
    fn append(&self, entry: &InteractionLogEntry) -> Result<(), LogError> {
        let line = serde_json::to_string(&JsonlLine {
            timestamp: Utc::now().to_rfc3339(),
            query: entry.query.clone(),
            response: entry.response.clone(),
        })?;
        let _guard = self.lock.lock().map_err(|_| LogError::Poisoned)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    fn name(&self) -> &str {
        "jsonl"
    }
}

/// Best-effort front for an optional sink
#[derive(Clone, Default)]
pub struct InteractionLogger {
    sink: Option<Arc<dyn InteractionLog>>,
}

impl InteractionLogger {
    pub fn new(sink: Arc<dyn InteractionLog>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Logger that drops everything
    pub fn disabled() -> Self {
        Self { sink: None }
    }

    /// Build from config. A sink that cannot be opened disables logging
    /// instead of failing startup.
    pub fn from_config(config: &LogConfig) -> Self {
        if !config.enabled {
            return Self::disabled();
        }
        let opened: Result<Arc<dyn InteractionLog>, LogError> = match config.backend {
            LogBackend::Sqlite => {
                SqliteInteractionLog::open(&config.path).map(|l| Arc::new(l) as Arc<dyn InteractionLog>)
            }
            LogBackend::Jsonl => {
                JsonlInteractionLog::open(&config.path).map(|l| Arc::new(l) as Arc<dyn InteractionLog>)
            }
        };
        match opened {
            Ok(sink) => {
                debug!("Interaction log: {} at {:?}", sink.name(), config.path);
                Self::new(sink)
            }
            Err(e) => {
                warn!("Interaction log unavailable ({:?}): {}", config.path, e);
                Self::disabled()
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    /// Record an interaction without blocking the caller. Inside a tokio
    /// runtime the write runs on the blocking pool and the handle is
    /// returned; outside one it is written inline.
    pub fn log(&self, query: &str, response: &str) -> Option<tokio::task::JoinHandle<()>> {
        let sink = self.sink.clone()?;
        let entry = InteractionLogEntry::new(query, response);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn_blocking(move || write_entry(sink.as_ref(), &entry))),
            Err(_) => {
                write_entry(sink.as_ref(), &entry);
                None
            }
        }
    }
}

fn write_entry(sink: &dyn InteractionLog, entry: &InteractionLogEntry) {
    if let Err(e) = sink.append(entry) {
        warn!("Failed to write interaction log ({}): {}", sink.name(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenLog;

    impl InteractionLog for BrokenLog {
        fn append(&self, _entry: &InteractionLogEntry) -> Result<(), LogError> {
            Err(LogError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "disk full",
            )))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[test]
    fn test_sqlite_append_and_recent() {
        let dir = tempfile::tempdir().unwrap();
        let log = SqliteInteractionLog::open(&dir.path().join("logs").join("chat.db")).unwrap();
        for i in 0..5 {
            log.append(&InteractionLogEntry::new(&format!("q{}", i), "a")).unwrap();
        }
        let recent = log.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].query, "q3");
        assert_eq!(recent[1].query, "q4");
    }

    #[test]
    fn test_jsonl_append_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let log = JsonlInteractionLog::open(&dir.path().join("chat.jsonl")).unwrap();
        assert!(log.read_all().unwrap().is_empty());
        log.append(&InteractionLogEntry::new("hi", "Hello!")).unwrap();
        log.append(&InteractionLogEntry::new("bye", "Take care.")).unwrap();
        let entries = log.read_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], InteractionLogEntry::new("bye", "Take care."));
    }

    #[test]
    fn test_logger_outside_runtime_writes_inline() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(JsonlInteractionLog::open(&dir.path().join("chat.jsonl")).unwrap());
        let logger = InteractionLogger::new(sink.clone());
        assert!(logger.log("q", "a").is_none());
        assert_eq!(sink.read_all().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_logger_in_runtime_spawns() {
        let dir = tempfile::tempdir().unwrap();
        let sink = Arc::new(SqliteInteractionLog::open(&dir.path().join("chat.db")).unwrap());
        let logger = InteractionLogger::new(sink.clone());
        logger.log("q", "a").unwrap().await.unwrap();
        assert_eq!(sink.recent(10).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let logger = InteractionLogger::new(Arc::new(BrokenLog));
        // The task completes normally even though the write failed
        logger.log("q", "a").unwrap().await.unwrap();
    }

    #[test]
    fn test_disabled_logger_is_noop() {
        let logger = InteractionLogger::from_config(&LogConfig {
            enabled: false,
            ..LogConfig::default()
        });
        assert!(!logger.is_enabled());
        assert!(logger.log("q", "a").is_none());
    }

    #[test]
    fn test_unopenable_sink_disables_logging() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let logger = InteractionLogger::from_config(&LogConfig {
            enabled: true,
            backend: LogBackend::Sqlite,
            path: blocker.join("chat.db"),
        });
        assert!(!logger.is_enabled());
    }
}
