//! Reading Pipeline - fetch, clean, aggregate and persist numeric readings.
//!
//! The pipeline is strictly linear and single-shot:
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌────────────────────┐
//! │ Fetcher  │──▶│ Cleaning │──▶│ Aggregate │──▶│ Persister          │
//! │ (HTTP)   │   │ (parse)  │   │ (summary) │   │  ├─ flat file      │
//! └──────────┘   └──────────┘   └───────────┘   │  └─ SQL table      │
//!                                               └────────────────────┘
//! ```
//!
//! Failures are soft at the edges: a failed fetch yields no readings, and a
//! failed sink is logged without stopping the other one. Aggregating an empty
//! set is an explicit [`AggregateError::EmptyInput`].
//!
//! # Example
//!
//! ```no_run
//! use reading_pipeline::{Config, DataProcessor};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//! let processor = DataProcessor::new(&config)?;
//!
//! let raw = processor.load().await;
//! let report = processor.process(&raw).await?;
//! println!("{}", report.summary);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod fetcher;
pub mod history;
pub mod persist;
pub mod pipeline;
pub mod viewmodel;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{
    aggregate, clean, clean_with_policy, AggregateError, CleanedData, DataPoint, ParsedValue,
    RawDataPoint, Summary, UnparsablePolicy,
};
pub use fetcher::{FetchError, FetchFailureKind, Fetcher, FetcherConfig};
pub use history::{RunLog, RunStats, SharedRunLog};
pub use persist::{DatabaseSink, FileSink, PersistError, Persister, SaveReport};
pub use pipeline::{DataProcessor, ProcessError, ProcessReport};
pub use viewmodel::{MainViewModel, ViewEvent};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
