//! Flat-file sink.
//!
//! One record per line as `timestamp,value`. The file is rewritten on every
//! call, so writing the same points twice yields identical content.

use crate::core::{format_timestamp, parse_timestamp, DataPoint};
use crate::persist::PersistError;
use std::path::{Path, PathBuf};

/// Writes cleaned points to a comma-separated text file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write all points, replacing any existing file. Returns the row count.
    pub fn write(&self, points: &[DataPoint]) -> Result<usize, PersistError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    PersistError::Io(format!("Failed to create {}: {e}", parent.display()))
                })?;
            }
        }

        let mut content = String::with_capacity(points.len() * 32);
        for point in points {
            content.push_str(&format_line(point));
            content.push('\n');
        }

        std::fs::write(&self.path, content).map_err(|e| {
            PersistError::Io(format!(
                "Error saving data to file {}: {e}",
                self.path.display()
            ))
        })?;

        Ok(points.len())
    }
}

/// Render one point as a line (without the trailing newline).
pub fn format_line(point: &DataPoint) -> String {
    format!("{},{}", format_timestamp(&point.timestamp), point.value)
}

/// Parse one line, splitting on the first comma.
pub fn parse_line(line: &str) -> Result<DataPoint, PersistError> {
    let (timestamp, value) = line
        .split_once(',')
        .ok_or_else(|| PersistError::Format(format!("Missing ',' in line '{line}'")))?;

    let timestamp = parse_timestamp(timestamp)
        .map_err(|e| PersistError::Format(format!("Invalid timestamp '{timestamp}': {e}")))?;
    let value = value
        .trim_end()
        .parse::<f64>()
        .map_err(|e| PersistError::Format(format!("Invalid value '{value}': {e}")))?;

    Ok(DataPoint::new(timestamp, value))
}

/// Read a file written by [`FileSink::write`].
pub fn read_file(path: &Path) -> Result<Vec<DataPoint>, PersistError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| PersistError::Io(format!("Failed to read {}: {e}", path.display())))?;

    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(parse_line)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn sample() -> Vec<DataPoint> {
        let start = Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap();
        vec![
            DataPoint::new(start, 3.5),
            DataPoint::new(start + Duration::milliseconds(1500), 0.0),
            DataPoint::new(start + Duration::seconds(60), -0.1),
            DataPoint::new(start + Duration::nanoseconds(123_456_789), 1e-7),
            DataPoint::new(start + Duration::days(1), 123456789.123456),
        ]
    }

    #[test]
    fn test_line_format() {
        let start = Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap();
        assert_eq!(
            format_line(&DataPoint::new(start, 3.5)),
            "2024-01-22T10:00:00Z,3.5"
        );
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("data.csv"));
        let points = sample();

        assert_eq!(sink.write(&points).unwrap(), points.len());
        assert_eq!(read_file(sink.path()).unwrap(), points);
    }

    #[test]
    fn test_write_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("data.csv"));
        let points = sample();

        sink.write(&points).unwrap();
        let first = std::fs::read_to_string(sink.path()).unwrap();
        sink.write(&points).unwrap();
        let second = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(first, second);

        sink.write(&points[..1]).unwrap();
        assert_eq!(read_file(sink.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("nested").join("out").join("data.csv"));
        sink.write(&sample()).unwrap();
        assert!(sink.path().exists());
    }

    #[test]
    fn test_unwritable_path_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a file.
        let sink = FileSink::new(dir.path());
        assert!(matches!(sink.write(&sample()), Err(PersistError::Io(_))));
    }

    #[test]
    fn test_parse_line_errors() {
        assert!(matches!(parse_line("no-comma"), Err(PersistError::Format(_))));
        assert!(matches!(
            parse_line("2024-01-22T10:00:00Z,abc"),
            Err(PersistError::Format(_))
        ));
        assert!(matches!(parse_line("later,1.0"), Err(PersistError::Format(_))));
    }
}
