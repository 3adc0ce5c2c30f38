// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Preprocessing - outlier clipping, time bucketing, aggregation, smoothing
//!
//! Raw points arrive unordered, irregular and occasionally spiky. The
//! preprocessor turns them into a [`Series`] with one sample per
//! `sampling_sec` bucket that actually received data. Empty buckets are not
//! synthesized.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::statistics::{median, SeriesSummary};
use crate::series::{Sample, Series};

/// Preprocessing parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessConfig {
    /// Bucket width in seconds
    pub sampling_sec: u32,
    /// Fence multiplier applied to the IQR when clipping
    pub iqr_factor: f64,
    /// Centered rolling-median window, single-metric runs only
    pub smoothing_window: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            sampling_sec: 10,
            iqr_factor: 3.0,
            smoothing_window: 3,
        }
    }
}

impl PreprocessConfig {
    pub fn with_sampling_sec(sampling_sec: u32) -> Self {
        Self {
            sampling_sec,
            ..Self::default()
        }
    }
}

/// Cleans and resamples raw points into a uniform-cadence series
pub struct Preprocessor {
    config: PreprocessConfig,
}

impl Preprocessor {
    pub fn new(config: PreprocessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PreprocessConfig {
        &self.config
    }

    /// Run the full pipeline. An empty `metrics` slice keeps every metric
    /// seen in `points`. The input is never modified.
    pub fn run(&self, points: &[Sample], metrics: &[&str]) -> Series {
        let sampling_sec = self.config.sampling_sec.max(1);
        if points.is_empty() {
            return Series::empty(sampling_sec);
        }

        let metric_set: BTreeSet<String> = if metrics.is_empty() {
            points
                .iter()
                .flat_map(|p| p.metrics().map(str::to_string))
                .collect()
        } else {
            metrics.iter().map(|m| m.to_string()).collect()
        };

        let mut ordered: Vec<&Sample> = points.iter().collect();
        ordered.sort_by_key(|p| p.timestamp);

        let fences = self.clip_fences(&ordered, &metric_set);

        // bucket start -> metric -> clipped values
        let mut buckets: BTreeMap<i64, BTreeMap<&str, Vec<f64>>> = BTreeMap::new();
        let width = i64::from(sampling_sec);
        for point in &ordered {
            let key = point.timestamp.timestamp().div_euclid(width) * width;
            let bucket = buckets.entry(key).or_default();
            for metric in &metric_set {
                if let Some(value) = point.value(metric) {
                    let value = match fences.get(metric.as_str()) {
                        Some(&(low, high)) => value.clamp(low, high),
                        None => value,
                    };
                    bucket.entry(metric.as_str()).or_default().push(value);
                }
            }
        }

        let mut samples: Vec<Sample> = buckets
            .into_iter()
            .filter_map(|(key, contributions)| {
                let timestamp = Utc.timestamp_opt(key, 0).single()?;
                let mut sample = Sample::new(timestamp);
                for metric in &metric_set {
                    let value = contributions
                        .get(metric.as_str())
                        .and_then(|values| median(values));
                    sample.values.insert(metric.clone(), value);
                }
                Some(sample)
            })
            .collect();

        if metric_set.len() == 1 && self.config.smoothing_window > 1 {
            if let Some(metric) = metric_set.iter().next() {
                self.smooth(&mut samples, metric);
            }
        }

        debug!(
            "Preprocessed {} points into {} buckets of {}s ({} metrics)",
            points.len(),
            samples.len(),
            sampling_sec,
            metric_set.len()
        );

        Series {
            sampling_sec,
            samples,
        }
    }

    /// Per-metric clipping bounds over every present value in the input.
    fn clip_fences<'a>(
        &self,
        points: &[&Sample],
        metrics: &'a BTreeSet<String>,
    ) -> BTreeMap<&'a str, (f64, f64)> {
        let mut fences = BTreeMap::new();
        for metric in metrics {
            let present: Vec<f64> = points.iter().filter_map(|p| p.value(metric)).collect();
            if let Some(summary) = SeriesSummary::from_values(&present) {
                let (low, high) = summary.fences(self.config.iqr_factor);
                trace!("Clip fences for {}: [{:.3}, {:.3}]", metric, low, high);
                fences.insert(metric.as_str(), (low, high));
            }
        }
        fences
    }

    /// Centered rolling median. Edge buckets use whichever neighbors exist and
    /// absent buckets stay absent.
    fn smooth(&self, samples: &mut [Sample], metric: &str) {
        let raw: Vec<Option<f64>> = samples.iter().map(|s| s.value(metric)).collect();
        let half = self.config.smoothing_window / 2;

        for (i, sample) in samples.iter_mut().enumerate() {
            if raw[i].is_none() {
                continue;
            }
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(raw.len() - 1);
            let window: Vec<f64> = raw[lo..=hi].iter().flatten().copied().collect();
            sample.values.insert(metric.to_string(), median(&window));
        }
    }
}

/// Clean and resample `points` at `sampling_sec` using the default fences and
/// smoothing window.
pub fn preprocess(points: &[Sample], metrics: &[&str], sampling_sec: u32) -> Series {
    Preprocessor::new(PreprocessConfig::with_sampling_sec(sampling_sec)).run(points, metrics)
}
