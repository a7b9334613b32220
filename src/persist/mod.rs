//! Persistence of cleaned readings.
//!
//! Two independent sinks: a flat file and a SQL table. [`Persister::save`]
//! runs both, logs whatever fails, and reports each outcome separately. A
//! failing sink never stops the other one.

pub mod database;
pub mod file;

pub use database::DatabaseSink;
pub use file::{format_line, parse_line, read_file, FileSink};

use crate::core::DataPoint;

/// Persistence errors.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistError {
    /// File system error
    Io(String),
    /// A line in the flat file could not be parsed
    Format(String),
    /// Database error; rows inserted before the failure are not rolled back
    Database { message: String, rows_written: usize },
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Io(msg) => write!(f, "IO error: {msg}"),
            PersistError::Format(msg) => write!(f, "Format error: {msg}"),
            PersistError::Database {
                message,
                rows_written,
            } => write!(f, "Database error after {rows_written} row(s): {message}"),
        }
    }
}

impl std::error::Error for PersistError {}

/// Outcome of saving to both sinks.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    /// Rows written to the flat file
    pub file: Result<usize, PersistError>,
    /// Rows inserted into the database
    pub database: Result<usize, PersistError>,
}

impl SaveReport {
    /// Whether both sinks succeeded.
    pub fn is_complete(&self) -> bool {
        self.file.is_ok() && self.database.is_ok()
    }

    pub fn file_rows(&self) -> usize {
        self.file.as_ref().copied().unwrap_or(0)
    }

    /// Rows in the table after this save, including a partial insert.
    pub fn database_rows(&self) -> usize {
        match &self.database {
            Ok(rows) => *rows,
            Err(PersistError::Database { rows_written, .. }) => *rows_written,
            Err(_) => 0,
        }
    }
}

/// Saves cleaned points to the file and database sinks.
#[derive(Debug, Clone)]
pub struct Persister {
    file: FileSink,
    database: DatabaseSink,
}

impl Persister {
    pub fn new(file: FileSink, database: DatabaseSink) -> Self {
        Self { file, database }
    }

    pub fn file_sink(&self) -> &FileSink {
        &self.file
    }

    pub fn database_sink(&self) -> &DatabaseSink {
        &self.database
    }

    /// Save to both sinks. Never fails; see the returned report.
    pub async fn save(&self, points: &[DataPoint]) -> SaveReport {
        let file = self.file.write(points);
        match &file {
            Ok(rows) => tracing::info!(rows, "Data saved to: {}", self.file.path().display()),
            Err(e) => tracing::error!("{}", e),
        }

        let database = self.database.write(points).await;
        match &database {
            Ok(rows) => tracing::info!(rows, "Data saved to database."),
            Err(e) => tracing::error!("{}", e),
        }

        SaveReport { file, database }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[tokio::test]
    async fn test_file_failure_does_not_block_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("readings.db");
        let persister = Persister::new(
            // The temp directory itself is not writable as a file.
            FileSink::new(dir.path()),
            DatabaseSink::new(format!("sqlite://{}?mode=rwc", db_path.display()), true),
        );

        let points = vec![DataPoint::new(Utc::now(), 1.0)];
        let report = persister.save(&points).await;

        assert!(matches!(report.file, Err(PersistError::Io(_))));
        assert_eq!(report.database, Ok(1));
        assert!(!report.is_complete());
        assert_eq!(report.file_rows(), 0);
        assert_eq!(report.database_rows(), 1);
    }

    #[tokio::test]
    async fn test_database_failure_does_not_block_file() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("data.csv");
        let missing_dir = dir.path().join("no-such-dir").join("readings.db");
        let persister = Persister::new(
            FileSink::new(&csv_path),
            // mode=ro refuses to create the file
            DatabaseSink::new(format!("sqlite://{}?mode=ro", missing_dir.display()), true),
        );

        let points = vec![DataPoint::new(Utc::now(), 2.0)];
        let report = persister.save(&points).await;

        assert_eq!(report.file, Ok(1));
        assert!(matches!(report.database, Err(PersistError::Database { .. })));
        assert_eq!(read_file(&csv_path).unwrap(), points);
    }

    #[test]
    fn test_database_rows_counts_partial_insert() {
        let report = SaveReport {
            file: Ok(3),
            database: Err(PersistError::Database {
                message: "constraint failed".to_string(),
                rows_written: 2,
            }),
        };
        assert_eq!(report.database_rows(), 2);
        assert_eq!(report.file_rows(), 3);
        assert!(!report.is_complete());
    }
}
