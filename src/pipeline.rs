//! The fetch → clean → aggregate → persist pipeline.
//!
//! [`DataProcessor`] owns the fetcher and both sinks. `load` pulls the raw
//! readings; `process` turns them into a summary and writes the cleaned set
//! out. Presentation layers (CLI, view-model) only format what comes back.

use crate::config::Config;
use crate::core::{
    aggregate, clean_with_policy, AggregateError, CleanedData, RawDataPoint, Summary,
    UnparsablePolicy,
};
use crate::fetcher::{FetchError, Fetcher};
use crate::history::{RunCounts, SharedRunLog};
use crate::persist::{DatabaseSink, FileSink, Persister, SaveReport};

/// Everything a successful `process` call produced.
#[derive(Debug, Clone)]
pub struct ProcessReport {
    pub cleaned: CleanedData,
    pub summary: Summary,
    pub save: SaveReport,
}

impl ProcessReport {
    /// Per-stage counts for the run history.
    pub fn counts(&self, fetched: usize) -> RunCounts {
        RunCounts {
            fetched: fetched as u64,
            cleaned: self.cleaned.len() as u64,
            dropped_missing: self.cleaned.dropped_missing as u64,
            unparsable: self.cleaned.unparsable as u64,
            file_rows: self.save.file_rows() as u64,
            database_rows: self.save.database_rows() as u64,
        }
    }
}

/// Errors that stop a `process` call before anything is persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessError {
    Aggregate(AggregateError),
}

impl std::fmt::Display for ProcessError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessError::Aggregate(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessError::Aggregate(e) => Some(e),
        }
    }
}

impl From<AggregateError> for ProcessError {
    fn from(e: AggregateError) -> Self {
        ProcessError::Aggregate(e)
    }
}

/// Runs the reading pipeline.
pub struct DataProcessor {
    fetcher: Fetcher,
    persister: Persister,
    policy: UnparsablePolicy,
    history: Option<SharedRunLog>,
}

impl DataProcessor {
    /// Build a processor from configuration.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let fetcher = Fetcher::new(config.fetcher_config())?;
        let persister = Persister::new(
            FileSink::new(config.csv_path.clone()),
            DatabaseSink::new(config.database_url.clone(), config.create_table),
        );

        Ok(Self {
            fetcher,
            persister,
            policy: config.unparsable,
            history: None,
        })
    }

    /// Record each processed run in `history`.
    pub fn with_history(mut self, history: SharedRunLog) -> Self {
        self.history = Some(history);
        self
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn persister(&self) -> &Persister {
        &self.persister
    }

    /// Fetch raw readings; failures are logged and yield an empty set.
    pub async fn load(&self) -> Vec<RawDataPoint> {
        self.fetcher.fetch().await
    }

    /// Fetch raw readings, reporting the cause of any failure.
    pub async fn try_load(&self) -> Result<Vec<RawDataPoint>, FetchError> {
        self.fetcher.try_fetch().await
    }

    /// Clean, aggregate, report and persist `raw`.
    ///
    /// Nothing is written when the cleaned set is empty.
    pub async fn process(&self, raw: &[RawDataPoint]) -> Result<ProcessReport, ProcessError> {
        let cleaned = clean_with_policy(raw, self.policy);
        tracing::info!(
            received = raw.len(),
            kept = cleaned.len(),
            dropped_missing = cleaned.dropped_missing,
            unparsable = cleaned.unparsable,
            "Cleaned readings"
        );

        let summary = aggregate(&cleaned.points)?;
        for line in summary.to_string().lines() {
            tracing::info!("{}", line);
        }

        let save = self.persister.save(&cleaned.points).await;

        let report = ProcessReport {
            cleaned,
            summary,
            save,
        };

        if let Some(history) = &self.history {
            let run_id = history.record_run(&report.counts(raw.len()));
            if let Err(e) = history.save() {
                tracing::warn!("Failed to save run history: {}", e);
            }
            tracing::debug!(%run_id, "Recorded run");
        }

        Ok(report)
    }

    /// Load then process in one go.
    pub async fn run(&self) -> Result<ProcessReport, ProcessError> {
        let raw = self.load().await;
        self.process(&raw).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::DataPoint;
    use crate::history::create_shared_log;
    use crate::persist::read_file;
    use chrono::{Duration, TimeZone, Utc};
    use std::path::Path;

    fn config_in(dir: &Path) -> Config {
        Config {
            endpoint_url: crate::fetcher::closed_endpoint_url(),
            request_timeout: std::time::Duration::from_secs(2),
            csv_path: dir.join("data.csv"),
            database_url: format!("sqlite://{}?mode=rwc", dir.join("readings.db").display()),
            data_path: dir.to_path_buf(),
            ..Config::default()
        }
    }

    fn scenario() -> Vec<RawDataPoint> {
        let t = Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap();
        vec![
            RawDataPoint::new(t, "3.5"),
            RawDataPoint::new(t + Duration::seconds(1), ""),
            RawDataPoint::new(t + Duration::seconds(2), "abc"),
        ]
    }

    #[tokio::test]
    async fn test_process_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let history = create_shared_log();
        let processor = DataProcessor::new(&config)
            .unwrap()
            .with_history(history.clone());

        let report = processor.process(&scenario()).await.unwrap();

        let t = Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap();
        assert_eq!(
            report.cleaned.points,
            vec![
                DataPoint::new(t, 3.5),
                DataPoint::new(t + Duration::seconds(2), 0.0)
            ]
        );
        assert!((report.summary.average - 1.75).abs() < 1e-12);
        assert_eq!(report.summary.max, 3.5);
        assert_eq!(report.summary.min, 0.0);
        assert!(report.save.is_complete());
        assert_eq!(read_file(&config.csv_path).unwrap(), report.cleaned.points);

        let stats = history.stats();
        assert_eq!(stats.runs, 1);
        assert_eq!(stats.totals.fetched, 3);
        assert_eq!(stats.totals.cleaned, 2);
        assert_eq!(stats.totals.database_rows, 2);
    }

    #[tokio::test]
    async fn test_empty_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let processor = DataProcessor::new(&config).unwrap();

        let err = processor.process(&[]).await.unwrap_err();
        assert_eq!(err, ProcessError::Aggregate(AggregateError::EmptyInput));
        assert!(!config.csv_path.exists());
    }

    #[tokio::test]
    async fn test_exclude_policy_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            unparsable: UnparsablePolicy::Exclude,
            ..config_in(dir.path())
        };
        let processor = DataProcessor::new(&config).unwrap();

        let report = processor.process(&scenario()).await.unwrap();
        assert_eq!(report.cleaned.len(), 1);
        assert_eq!(report.summary.average, 3.5);
    }

    #[tokio::test]
    async fn test_run_with_unreachable_endpoint_reports_empty() {
        let dir = tempfile::tempdir().unwrap();
        let processor = DataProcessor::new(&config_in(dir.path())).unwrap();

        let err = processor.run().await.unwrap_err();
        assert_eq!(err, ProcessError::Aggregate(AggregateError::EmptyInput));
    }
}
