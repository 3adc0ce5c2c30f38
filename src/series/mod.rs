// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Time-series data model - samples and uniform-cadence series

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped observation of one or more metrics.
///
/// A metric mapped to `None` is absent, which is not the same as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub values: BTreeMap<String, Option<f64>>,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            values: BTreeMap::new(),
        }
    }

    /// Single-metric sample, the shape most ingestion paths produce.
    pub fn single(timestamp: DateTime<Utc>, metric: &str, value: Option<f64>) -> Self {
        Self::new(timestamp).with_value(metric, value)
    }

    pub fn with_value(mut self, metric: &str, value: Option<f64>) -> Self {
        self.values.insert(metric.to_string(), value);
        self
    }

    /// Present value of `metric`. Non-finite readings count as absent.
    pub fn value(&self, metric: &str) -> Option<f64> {
        self.values
            .get(metric)
            .copied()
            .flatten()
            .filter(|v| v.is_finite())
    }

    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

/// Time-ordered, bucketed sequence of samples at a fixed nominal cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub sampling_sec: u32,
    pub samples: Vec<Sample>,
}

impl Series {
    pub fn empty(sampling_sec: u32) -> Self {
        Self {
            sampling_sec,
            samples: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Per-sample values of `metric`, absent entries kept as `None`.
    pub fn values(&self, metric: &str) -> Vec<Option<f64>> {
        self.samples.iter().map(|s| s.value(metric)).collect()
    }

    /// Only the present values of `metric`, in time order.
    pub fn present_values(&self, metric: &str) -> Vec<f64> {
        self.samples.iter().filter_map(|s| s.value(metric)).collect()
    }

    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|s| s.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_absent_is_not_zero() {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        let sample = Sample::new(ts)
            .with_value("watts", None)
            .with_value("on", Some(0.0));

        assert_eq!(sample.value("watts"), None);
        assert_eq!(sample.value("on"), Some(0.0));
        assert_eq!(sample.value("lux"), None);
    }

    #[test]
    fn test_non_finite_reads_as_absent() {
        let ts = Utc.timestamp_opt(0, 0).unwrap();
        let sample = Sample::single(ts, "watts", Some(f64::NAN)).with_value("lux", Some(f64::INFINITY));
        assert_eq!(sample.value("watts"), None);
        assert_eq!(sample.value("lux"), None);
    }

    #[test]
    fn test_present_values_skip_gaps() {
        let series = Series {
            sampling_sec: 10,
            samples: vec![
                Sample::single(Utc.timestamp_opt(0, 0).unwrap(), "watts", Some(5.0)),
                Sample::single(Utc.timestamp_opt(10, 0).unwrap(), "watts", None),
                Sample::single(Utc.timestamp_opt(20, 0).unwrap(), "watts", Some(7.0)),
            ],
        };

        assert_eq!(series.present_values("watts"), vec![5.0, 7.0]);
        assert_eq!(series.values("watts"), vec![Some(5.0), None, Some(7.0)]);
        assert_eq!(series.last_timestamp(), Some(Utc.timestamp_opt(20, 0).unwrap()));
    }
}
