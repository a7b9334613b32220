//! Cumulative run history.
//!
//! Tracks how many records each stage of the pipeline has handled across
//! runs, and optionally persists the totals as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Counts from a single pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub fetched: u64,
    pub cleaned: u64,
    pub dropped_missing: u64,
    pub unparsable: u64,
    pub file_rows: u64,
    pub database_rows: u64,
}

/// Cumulative pipeline statistics.
#[derive(Debug)]
pub struct RunLog {
    runs: AtomicU64,
    fetched: AtomicU64,
    cleaned: AtomicU64,
    dropped_missing: AtomicU64,
    unparsable: AtomicU64,
    file_rows: AtomicU64,
    database_rows: AtomicU64,
    /// Identifier and time of the most recent run
    last_run: Mutex<Option<(Uuid, DateTime<Utc>)>>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl RunLog {
    /// Create a new, empty run log.
    pub fn new() -> Self {
        Self {
            runs: AtomicU64::new(0),
            fetched: AtomicU64::new(0),
            cleaned: AtomicU64::new(0),
            dropped_missing: AtomicU64::new(0),
            unparsable: AtomicU64::new(0),
            file_rows: AtomicU64::new(0),
            database_rows: AtomicU64::new(0),
            last_run: Mutex::new(None),
            persist_path: None,
        }
    }

    /// Create a run log backed by a JSON file, loading existing totals.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut log = Self::new();
        log.persist_path = Some(path);

        if let Err(e) = log.load() {
            tracing::warn!("Could not load previous run history: {}", e);
        }

        log
    }

    /// Record a completed run and return its identifier.
    pub fn record_run(&self, counts: &RunCounts) -> Uuid {
        self.runs.fetch_add(1, Ordering::Relaxed);
        self.fetched.fetch_add(counts.fetched, Ordering::Relaxed);
        self.cleaned.fetch_add(counts.cleaned, Ordering::Relaxed);
        self.dropped_missing
            .fetch_add(counts.dropped_missing, Ordering::Relaxed);
        self.unparsable.fetch_add(counts.unparsable, Ordering::Relaxed);
        self.file_rows.fetch_add(counts.file_rows, Ordering::Relaxed);
        self.database_rows
            .fetch_add(counts.database_rows, Ordering::Relaxed);

        let id = Uuid::new_v4();
        if let Ok(mut last) = self.last_run.lock() {
            *last = Some((id, Utc::now()));
        }
        id
    }

    /// Get the current statistics.
    pub fn stats(&self) -> RunStats {
        let last = self.last_run.lock().ok().and_then(|l| *l);
        RunStats {
            runs: self.runs.load(Ordering::Relaxed),
            totals: RunCounts {
                fetched: self.fetched.load(Ordering::Relaxed),
                cleaned: self.cleaned.load(Ordering::Relaxed),
                dropped_missing: self.dropped_missing.load(Ordering::Relaxed),
                unparsable: self.unparsable.load(Ordering::Relaxed),
                file_rows: self.file_rows.load(Ordering::Relaxed),
                database_rows: self.database_rows.load(Ordering::Relaxed),
            },
            last_run_id: last.map(|(id, _)| id),
            last_run_at: last.map(|(_, at)| at),
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        let last_run = stats
            .last_run_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        format!(
            "Run History:\n\
             - Runs: {}\n\
             - Last run: {}\n\
             - Records fetched: {}\n\
             - Records cleaned: {}\n\
             - Dropped (missing value): {}\n\
             - Unparsable values: {}\n\
             - Rows written to file: {}\n\
             - Rows written to database: {}",
            stats.runs,
            last_run,
            stats.totals.fetched,
            stats.totals.cleaned,
            stats.totals.dropped_missing,
            stats.totals.unparsable,
            stats.totals.file_rows,
            stats.totals.database_rows
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let json =
                serde_json::to_string_pretty(&self.stats()).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    /// Load stats from disk.
    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: RunStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.runs.store(persisted.runs, Ordering::Relaxed);
                let t = &persisted.totals;
                self.fetched.store(t.fetched, Ordering::Relaxed);
                self.cleaned.store(t.cleaned, Ordering::Relaxed);
                self.dropped_missing
                    .store(t.dropped_missing, Ordering::Relaxed);
                self.unparsable.store(t.unparsable, Ordering::Relaxed);
                self.file_rows.store(t.file_rows, Ordering::Relaxed);
                self.database_rows
                    .store(t.database_rows, Ordering::Relaxed);

                if let (Some(id), Some(at)) = (persisted.last_run_id, persisted.last_run_at) {
                    if let Ok(mut last) = self.last_run.lock() {
                        *last = Some((id, at));
                    }
                }
            }
        }
        Ok(())
    }

    /// Reset all counters.
    pub fn reset(&self) {
        for counter in [
            &self.runs,
            &self.fetched,
            &self.cleaned,
            &self.dropped_missing,
            &self.unparsable,
            &self.file_rows,
            &self.database_rows,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        if let Ok(mut last) = self.last_run.lock() {
            *last = None;
        }
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of run history, also the persisted format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub runs: u64,
    pub totals: RunCounts,
    pub last_run_id: Option<Uuid>,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Thread-safe shared run log.
pub type SharedRunLog = Arc<RunLog>;

/// Create a new shared run log.
pub fn create_shared_log() -> SharedRunLog {
    Arc::new(RunLog::new())
}

/// Create a new shared run log with persistence.
pub fn create_shared_log_with_persistence(path: PathBuf) -> SharedRunLog {
    Arc::new(RunLog::with_persistence(path))
}
