//! Summary statistics over cleaned data points.

use crate::core::types::DataPoint;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Aggregate statistics over a cleaned set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of points aggregated
    pub count: usize,
    /// Arithmetic mean
    pub average: f64,
    pub max: f64,
    pub min: f64,
    /// Population standard deviation (divides by `count`, not `count - 1`)
    pub std_dev: f64,
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Average Value: {}", self.average)?;
        writeln!(f, "Maximum Value: {}", self.max)?;
        writeln!(f, "Minimum Value: {}", self.min)?;
        write!(f, "Standard Deviation: {}", self.std_dev)
    }
}

/// Aggregation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// No points were left to aggregate
    EmptyInput,
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateError::EmptyInput => write!(f, "No data points to aggregate"),
        }
    }
}

impl std::error::Error for AggregateError {}

/// Compute average, max, min and population standard deviation.
///
/// Values are divided by the largest magnitude before averaging, so sums and
/// squared deviations stay finite for any finite input.
pub fn aggregate(points: &[DataPoint]) -> Result<Summary, AggregateError> {
    if points.is_empty() {
        return Err(AggregateError::EmptyInput);
    }

    let values: Vec<f64> = points.iter().map(|p| p.value).collect();

    let min = Statistics::min(values.iter());
    let max = Statistics::max(values.iter());
    let scale = min.abs().max(max.abs());

    let (average, std_dev) = if scale == 0.0 {
        (0.0, 0.0)
    } else {
        let scaled: Vec<f64> = values.iter().map(|v| v / scale).collect();
        let mean = Statistics::mean(scaled.iter()) * scale;
        let std_dev = Statistics::population_std_dev(scaled.iter()) * scale;
        // The scaled mean is finite; this only absorbs last-bit rounding.
        (mean.clamp(min, max), std_dev)
    };

    Ok(Summary {
        count: values.len(),
        average,
        max,
        min,
        std_dev,
    })
}
