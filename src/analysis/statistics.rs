// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Order statistics - percentiles, median, quartiles

use serde::{Deserialize, Serialize};

/// Distribution summary of one metric's present values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
}

impl SeriesSummary {
    /// Summarize `data`; `None` when there is nothing to summarize.
    pub fn from_values(data: &[f64]) -> Option<Self> {
        if data.is_empty() {
            return None;
        }

        let count = data.len();
        let mean = mean(data);
        let sorted = sorted_copy(data);
        let (q1, q3) = quartiles_sorted(&sorted);

        Some(Self {
            count,
            mean,
            median: percentile(&sorted, 50.0),
            min: sorted[0],
            max: sorted[count - 1],
            q1,
            q3,
            iqr: q3 - q1,
        })
    }

    /// Tukey fence `[Q1 - k*IQR, Q3 + k*IQR]`.
    pub fn fences(&self, k: f64) -> (f64, f64) {
        (self.q1 - k * self.iqr, self.q3 + k * self.iqr)
    }
}

/// Ascending copy of `data`.
pub fn sorted_copy(data: &[f64]) -> Vec<f64> {
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Linear-interpolated percentile over already sorted data, `p` in `[0, 100]`.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let p = p.clamp(0.0, 100.0);
    let k = p / 100.0 * (sorted.len() - 1) as f64;
    let f = k.floor() as usize;
    let c = k.ceil() as usize;

    if f == c || c >= sorted.len() {
        sorted[f.min(sorted.len() - 1)]
    } else {
        sorted[f] + (sorted[c] - sorted[f]) * (k - f as f64)
    }
}

/// Percentile of unsorted data.
pub fn percentile_of(data: &[f64], p: f64) -> f64 {
    percentile(&sorted_copy(data), p)
}

/// Median of unsorted data, `None` when empty.
pub fn median(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(percentile_of(data, 50.0))
}

fn quartiles_sorted(sorted: &[f64]) -> (f64, f64) {
    (percentile(sorted, 25.0), percentile(sorted, 75.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 0.0), 1.0);
        assert_eq!(percentile(&sorted, 100.0), 4.0);
        assert!((percentile(&sorted, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile(&sorted, 25.0) - 1.75).abs() < 1e-12);
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_summary_fences() {
        let summary = SeriesSummary::from_values(&[10.0, 11.0, 12.0, 13.0, 14.0]).unwrap();
        assert_eq!(summary.count, 5);
        assert_eq!(summary.median, 12.0);
        assert_eq!(summary.q1, 11.0);
        assert_eq!(summary.q3, 13.0);

        let (low, high) = summary.fences(3.0);
        assert_eq!(low, 5.0);
        assert_eq!(high, 19.0);
    }

    #[test]
    fn test_summary_empty() {
        assert!(SeriesSummary::from_values(&[]).is_none());
    }
}
