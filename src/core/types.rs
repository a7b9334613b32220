//! Reading types for the pipeline.
//!
//! A reading arrives as a [`RawDataPoint`] whose value is still text, and
//! leaves cleaning as a [`DataPoint`] carrying a finite `f64`.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A reading exactly as received from the endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataPoint {
    /// When the reading was taken
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub timestamp: DateTime<Utc>,
    /// Unparsed value; `None` when the payload carried `null` or omitted it
    #[serde(default, deserialize_with = "deserialize_raw_value")]
    pub value: Option<String>,
}

impl RawDataPoint {
    pub fn new(timestamp: DateTime<Utc>, value: impl Into<String>) -> Self {
        Self {
            timestamp,
            value: Some(value.into()),
        }
    }

    /// A reading whose value was `null`.
    pub fn missing(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            value: None,
        }
    }

    /// Whether the value is absent or the empty string.
    pub fn is_missing(&self) -> bool {
        self.value.as_deref().map_or(true, str::is_empty)
    }
}

/// A cleaned reading with a numeric value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl DataPoint {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Parse a timestamp from the wire.
///
/// RFC 3339 is preferred; a timestamp without an offset is taken as UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let input = input.trim();
    match DateTime::parse_from_rfc3339(input) {
        Ok(dt) => Ok(dt.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S%.f"))
            .map(|naive| naive.and_utc())
            .map_err(|_| rfc_err),
    }
}

/// Canonical text form of a timestamp (RFC 3339, `Z` suffix).
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_timestamp(&text)
        .map_err(|e| serde::de::Error::custom(format!("invalid timestamp '{text}': {e}")))
}

/// Values are documented as strings, but numbers are kept in their text form.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireValue {
    Text(String),
    Number(serde_json::Number),
}

fn deserialize_raw_value<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<WireValue>::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        WireValue::Text(text) => text,
        WireValue::Number(number) => number.to_string(),
    }))
}
