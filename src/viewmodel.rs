//! Headless view-model for the load/process workflow.
//!
//! Holds the loaded readings and a status line. Every change is published as a
//! [`ViewEvent`] to all subscribers, so a front-end only needs to drain its
//! receiver to stay in sync.

use crate::core::RawDataPoint;
use crate::pipeline::{DataProcessor, ProcessReport};
use crossbeam_channel::{unbounded, Receiver, Sender};

/// A change to observable view-model state.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    /// The loaded readings were replaced
    DataChanged { count: usize },
    /// The status line changed
    StatusChanged(String),
}

/// View-model driving the pipeline from user actions.
pub struct MainViewModel {
    processor: DataProcessor,
    data_points: Vec<RawDataPoint>,
    status: String,
    subscribers: Vec<Sender<ViewEvent>>,
}

impl MainViewModel {
    pub fn new(processor: DataProcessor) -> Self {
        Self {
            processor,
            data_points: Vec::new(),
            status: String::new(),
            subscribers: Vec::new(),
        }
    }

    /// Receive every subsequent state change.
    pub fn subscribe(&mut self) -> Receiver<ViewEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn data_points(&self) -> &[RawDataPoint] {
        &self.data_points
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn set_data_points(&mut self, data_points: Vec<RawDataPoint>) {
        self.data_points = data_points;
        let count = self.data_points.len();
        self.publish(ViewEvent::DataChanged { count });
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
        let status = self.status.clone();
        self.publish(ViewEvent::StatusChanged(status));
    }

    /// Fetch readings into the view-model.
    ///
    /// On failure the readings are cleared, so a later `process` cannot
    /// persist data from an earlier load, and the error is reported through
    /// the status line.
    pub async fn load(&mut self) {
        self.set_status("Loading data...");
        match self.processor.try_load().await {
            Ok(points) => {
                self.set_data_points(points);
                self.set_status("Data loaded successfully.");
            }
            Err(e) => {
                tracing::error!(kind = ?e.kind(), "{}", e);
                self.set_data_points(Vec::new());
                self.set_status(format!("Error loading data: {e}"));
            }
        }
    }

    /// Process the loaded readings.
    pub async fn process(&mut self) -> Option<ProcessReport> {
        self.set_status("Processing data...");
        match self.processor.process(&self.data_points).await {
            Ok(report) => {
                self.set_status("Data processed successfully.");
                Some(report)
            }
            Err(e) => {
                self.set_status(format!("Error processing data: {e}"));
                None
            }
        }
    }

    fn publish(&mut self, event: ViewEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use chrono::Utc;

    fn view_model(dir: &std::path::Path) -> MainViewModel {
        let config = Config {
            endpoint_url: crate::fetcher::closed_endpoint_url(),
            request_timeout: std::time::Duration::from_secs(2),
            csv_path: dir.join("data.csv"),
            database_url: format!("sqlite://{}?mode=rwc", dir.join("readings.db").display()),
            data_path: dir.to_path_buf(),
            ..Config::default()
        };
        MainViewModel::new(DataProcessor::new(&config).unwrap())
    }

    #[test]
    fn test_setters_publish_events() {
        let dir = tempfile::tempdir().unwrap();
        let mut vm = view_model(dir.path());
        let rx = vm.subscribe();

        vm.set_status("hello");
        vm.set_data_points(vec![RawDataPoint::new(Utc::now(), "1")]);

        let events: Vec<ViewEvent> = rx.try_iter().collect();
        assert_eq!(
            events,
            vec![
                ViewEvent::StatusChanged("hello".to_string()),
                ViewEvent::DataChanged { count: 1 },
            ]
        );
    }

    #[test]
    fn test_dropped_subscriber_is_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let mut vm = view_model(dir.path());
        let rx = vm.subscribe();
        drop(vm.subscribe());

        vm.set_status("one");
        assert_eq!(vm.subscribers.len(), 1);
        assert_eq!(rx.try_iter().count(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_sets_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut vm = view_model(dir.path());
        let rx = vm.subscribe();

        vm.load().await;

        assert!(vm.status().starts_with("Error loading data:"));
        assert!(vm.data_points().is_empty());
        let events: Vec<ViewEvent> = rx.try_iter().collect();
        assert_eq!(
            events.first(),
            Some(&ViewEvent::StatusChanged("Loading data...".to_string()))
        );
        assert_eq!(events.get(1), Some(&ViewEvent::DataChanged { count: 0 }));
        assert_eq!(events.len(), 3);
    }

    #[tokio::test]
    async fn test_failed_load_discards_previous_readings() {
        let dir = tempfile::tempdir().unwrap();
        let mut vm = view_model(dir.path());
        vm.set_data_points(vec![RawDataPoint::new(Utc::now(), "1.5")]);

        vm.load().await;
        assert!(vm.data_points().is_empty());

        assert!(vm.process().await.is_none());
        assert_eq!(
            vm.status(),
            "Error processing data: No data points to aggregate"
        );
        assert!(!dir.path().join("data.csv").exists());
    }

    #[tokio::test]
    async fn test_process_without_data_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut vm = view_model(dir.path());

        assert!(vm.process().await.is_none());
        assert_eq!(
            vm.status(),
            "Error processing data: No data points to aggregate"
        );
    }

    #[tokio::test]
    async fn test_process_loaded_data() {
        let dir = tempfile::tempdir().unwrap();
        let mut vm = view_model(dir.path());
        vm.set_data_points(vec![
            RawDataPoint::new(Utc::now(), "2.0"),
            RawDataPoint::new(Utc::now(), "4.0"),
        ]);

        let report = vm.process().await.unwrap();
        assert_eq!(report.summary.average, 3.0);
        assert_eq!(vm.status(), "Data processed successfully.");
    }
}
