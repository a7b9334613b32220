//! Relational sink backed by SQLite.
//!
//! Each call opens its own connection, issues one parameterized insert per
//! point and closes the connection. There is no transaction: rows inserted
//! before a failure stay in the table.

use crate::core::{format_timestamp, DataPoint};
use crate::persist::PersistError;
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;

const CREATE_TABLE_SQL: &str = "CREATE TABLE IF NOT EXISTS DataPoints (\
     Timestamp TEXT NOT NULL, \
     Value REAL NOT NULL)";

const INSERT_SQL: &str = "INSERT INTO DataPoints (Timestamp, Value) VALUES (?, ?)";

/// Writes cleaned points to the `DataPoints` table.
#[derive(Debug, Clone)]
pub struct DatabaseSink {
    url: String,
    create_table: bool,
}

impl DatabaseSink {
    /// Create a sink for the given connection URL.
    ///
    /// When `create_table` is set the table is created if it does not exist.
    pub fn new(url: impl Into<String>, create_table: bool) -> Self {
        Self {
            url: url.into(),
            create_table,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Insert every point. Returns the number of rows inserted.
    pub async fn write(&self, points: &[DataPoint]) -> Result<usize, PersistError> {
        let mut conn = SqliteConnection::connect(&self.url)
            .await
            .map_err(|e| PersistError::Database {
                message: format!("Failed to connect: {e}"),
                rows_written: 0,
            })?;

        let result = self.insert_all(&mut conn, points).await;

        if let Err(e) = conn.close().await {
            tracing::warn!("Failed to close database connection: {}", e);
        }

        result
    }

    async fn insert_all(
        &self,
        conn: &mut SqliteConnection,
        points: &[DataPoint],
    ) -> Result<usize, PersistError> {
        if self.create_table {
            sqlx::query(CREATE_TABLE_SQL)
                .execute(&mut *conn)
                .await
                .map_err(|e| PersistError::Database {
                    message: format!("Failed to create table: {e}"),
                    rows_written: 0,
                })?;
        }

        // The connection caches the prepared statement, so each iteration
        // only rebinds parameters.
        let mut inserted = 0;
        for point in points {
            sqlx::query(INSERT_SQL)
                .bind(format_timestamp(&point.timestamp))
                .bind(point.value)
                .execute(&mut *conn)
                .await
                .map_err(|e| PersistError::Database {
                    message: format!("Error saving data to database: {e}"),
                    rows_written: inserted,
                })?;
            inserted += 1;
        }

        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use std::path::Path;

    fn sqlite_url(path: &Path) -> String {
        format!("sqlite://{}?mode=rwc", path.display())
    }

    fn points(values: &[f64]) -> Vec<DataPoint> {
        let start = Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| DataPoint::new(start + Duration::seconds(i as i64), v))
            .collect()
    }

    async fn read_rows(url: &str) -> Vec<(String, f64)> {
        let mut conn = SqliteConnection::connect(url).await.unwrap();
        let rows = sqlx::query_as::<_, (String, f64)>(
            "SELECT Timestamp, Value FROM DataPoints ORDER BY rowid",
        )
        .fetch_all(&mut conn)
        .await
        .unwrap();
        conn.close().await.unwrap();
        rows
    }

    #[tokio::test]
    async fn test_inserts_one_row_per_point() {
        let dir = tempfile::tempdir().unwrap();
        let url = sqlite_url(&dir.path().join("readings.db"));
        let sink = DatabaseSink::new(&url, true);

        assert_eq!(sink.write(&points(&[3.5, 0.0])).await.unwrap(), 2);

        let rows = read_rows(&url).await;
        assert_eq!(
            rows,
            vec![
                ("2024-01-22T10:00:00Z".to_string(), 3.5),
                ("2024-01-22T10:00:01Z".to_string(), 0.0),
            ]
        );
    }

    #[tokio::test]
    async fn test_partial_insert_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let url = sqlite_url(&dir.path().join("readings.db"));

        let mut conn = SqliteConnection::connect(&url).await.unwrap();
        sqlx::query(
            "CREATE TABLE DataPoints (Timestamp TEXT NOT NULL, Value REAL NOT NULL CHECK (Value < 10))",
        )
        .execute(&mut conn)
        .await
        .unwrap();
        conn.close().await.unwrap();

        let sink = DatabaseSink::new(&url, false);
        let err = sink.write(&points(&[1.0, 2.0, 50.0, 3.0])).await.unwrap_err();
        match err {
            PersistError::Database { rows_written, .. } => assert_eq!(rows_written, 2),
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(read_rows(&url).await.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_table_without_create() {
        let dir = tempfile::tempdir().unwrap();
        let url = sqlite_url(&dir.path().join("readings.db"));
        let sink = DatabaseSink::new(&url, false);

        let err = sink.write(&points(&[1.0])).await.unwrap_err();
        assert!(matches!(err, PersistError::Database { rows_written: 0, .. }));
    }
}
