//! Cleaning of raw readings into numeric data points.
//!
//! Records without a value are dropped. Surviving values are parsed as `f64`;
//! what happens to values that fail to parse is decided by an
//! [`UnparsablePolicy`] instead of being silently coerced.

use crate::core::types::{DataPoint, RawDataPoint};
use serde::{Deserialize, Serialize};

/// Outcome of parsing a single raw value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    /// The value parsed to a finite number
    Parsed(f64),
    /// The value could not be used as a number
    Unparsable { raw: String, reason: String },
}

/// What to do with values that fail to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnparsablePolicy {
    /// Substitute `0.0` and keep the record
    #[default]
    DefaultToZero,
    /// Drop the record from the cleaned set
    Exclude,
}

/// Result of a cleaning pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedData {
    /// Cleaned points, in input order
    pub points: Vec<DataPoint>,
    /// Records dropped because their value was null or empty
    pub dropped_missing: usize,
    /// Records whose value failed to parse (defaulted or excluded per policy)
    pub unparsable: usize,
}

impl CleanedData {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Parse one raw value.
pub fn parse_value(raw: &str) -> ParsedValue {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => ParsedValue::Parsed(v),
        Ok(v) => ParsedValue::Unparsable {
            raw: raw.to_string(),
            reason: format!("non-finite value {v}"),
        },
        Err(e) => ParsedValue::Unparsable {
            raw: raw.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Clean with the default policy: unparsable values become `0.0`.
pub fn clean(raw: &[RawDataPoint]) -> Vec<DataPoint> {
    clean_with_policy(raw, UnparsablePolicy::DefaultToZero).points
}

/// Clean with an explicit policy for unparsable values.
pub fn clean_with_policy(raw: &[RawDataPoint], policy: UnparsablePolicy) -> CleanedData {
    let mut cleaned = CleanedData {
        points: Vec::with_capacity(raw.len()),
        ..CleanedData::default()
    };

    for record in raw {
        let value = match record.value.as_deref() {
            Some(v) if !v.is_empty() => v,
            _ => {
                cleaned.dropped_missing += 1;
                continue;
            }
        };

        match parse_value(value) {
            ParsedValue::Parsed(v) => cleaned.points.push(DataPoint::new(record.timestamp, v)),
            ParsedValue::Unparsable { raw, reason } => {
                cleaned.unparsable += 1;
                tracing::warn!(
                    timestamp = %record.timestamp,
                    raw = %raw,
                    ?policy,
                    "Unparsable value: {}",
                    reason
                );
                if policy == UnparsablePolicy::DefaultToZero {
                    cleaned.points.push(DataPoint::new(record.timestamp, 0.0));
                }
            }
        }
    }

    cleaned
}
