//! Core functionality for the reading pipeline.
//!
//! This module contains:
//! - Reading types (raw and cleaned)
//! - Cleaning of raw readings into numeric points
//! - Aggregate statistics over the cleaned set

pub mod aggregate;
pub mod cleaning;
pub mod types;

// Re-export commonly used types
pub use aggregate::{aggregate, AggregateError, Summary};
pub use cleaning::{clean, clean_with_policy, parse_value, CleanedData, ParsedValue, UnparsablePolicy};
pub use types::{format_timestamp, parse_timestamp, DataPoint, RawDataPoint};
