//! Run history for the reading pipeline.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_log, create_shared_log_with_persistence, RunCounts, RunLog, RunStats,
    SharedRunLog,
};
