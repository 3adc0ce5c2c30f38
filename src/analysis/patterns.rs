// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Pattern detection - oscillation cycles, drops to zero

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::statistics::{mean, percentile, sorted_copy};
use crate::rules::PatternConfig;
use crate::series::Series;

/// Fewer values than this never count as oscillating
pub const MIN_OSCILLATION_SAMPLES: usize = 8;

const MEAN_EPSILON: f64 = 1e-6;

/// Outcome of an oscillation check
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OscillationReport {
    pub detected: bool,
    pub cycles: u32,
    pub amplitude: f64,
}

/// Finding produced by the post-simulation pattern pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PatternFinding {
    DropsToZero { count: u32 },
    Oscillation(OscillationReport),
}

/// Count up/down cycles around the mean.
///
/// Cycles are half the number of sign changes of the mean-centered values.
/// Amplitude is `(p90 - p10) / max(mean, 1e-6)`. Detected when both reach
/// their minimum.
pub fn detect_oscillation(values: &[f64], tolerance: f64, min_cycles: u32) -> OscillationReport {
    if values.len() < MIN_OSCILLATION_SAMPLES {
        return OscillationReport::default();
    }

    let center = mean(values);
    let sign_changes = values
        .windows(2)
        .filter(|w| sign(w[0] - center) != sign(w[1] - center))
        .count();
    let cycles = (sign_changes / 2) as u32;

    let sorted = sorted_copy(values);
    let spread = percentile(&sorted, 90.0) - percentile(&sorted, 10.0);
    let amplitude = spread / center.max(MEAN_EPSILON);

    OscillationReport {
        detected: cycles >= min_cycles && amplitude >= tolerance,
        cycles,
        amplitude,
    }
}

fn sign(x: f64) -> i8 {
    if x > 0.0 {
        1
    } else if x < 0.0 {
        -1
    } else {
        0
    }
}

/// Count positive-to-exactly-zero transitions. Absent values read as zero.
pub fn count_drops_to_zero(values: &[Option<f64>]) -> u32 {
    values
        .windows(2)
        .filter(|w| w[0].unwrap_or(0.0) > 0.0 && w[1].unwrap_or(0.0) == 0.0)
        .count() as u32
}

/// Runs the pattern checks a rule enables over a finished series
pub struct PatternDetector<'a> {
    config: &'a PatternConfig,
}

impl<'a> PatternDetector<'a> {
    pub fn new(config: &'a PatternConfig) -> Self {
        Self { config }
    }

    pub fn find_patterns(&self, series: &Series, metric: &str) -> Vec<PatternFinding> {
        let mut findings = Vec::new();
        if series.is_empty() {
            return findings;
        }

        if let Some(drops) = self.config.drops_to_zero_check() {
            let count = count_drops_to_zero(&series.values(metric));
            debug!("drops_to_zero: {} drops (min {})", count, drops.min_drops);
            if count >= drops.min_drops {
                findings.push(PatternFinding::DropsToZero { count });
            }
        }

        if let Some(osc) = self.config.oscillation_check() {
            let report = detect_oscillation(&series.present_values(metric), osc.tolerance, osc.min_cycles);
            debug!(
                "oscillation: cycles={} amplitude={:.3} detected={}",
                report.cycles, report.amplitude, report.detected
            );
            if report.detected {
                findings.push(PatternFinding::Oscillation(report));
            }
        }

        // TODO: plateau and duty-cycle detectors; the flags only round-trip for now
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{DropsToZeroConfig, OscillationConfig};
    use crate::series::Sample;
    use chrono::{TimeZone, Utc};

    fn series_of(values: &[f64]) -> Series {
        Series {
            sampling_sec: 10,
            samples: values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    Sample::single(Utc.timestamp_opt(i as i64 * 10, 0).unwrap(), "watts", Some(v))
                })
                .collect(),
        }
    }

    #[test]
    fn test_alternating_signal_oscillates() {
        let values = [0.0, 10.0, 0.0, 10.0, 0.0, 10.0, 0.0, 10.0, 0.0];
        let report = detect_oscillation(&values, 0.2, 3);
        assert!(report.detected);
        assert!(report.cycles >= 3);
    }

    #[test]
    fn test_too_short_never_oscillates() {
        let report = detect_oscillation(&[0.0, 10.0, 0.0, 10.0, 0.0, 10.0, 0.0], 0.0, 0);
        assert_eq!(report, OscillationReport::default());
    }

    #[test]
    fn test_flat_signal_does_not_oscillate() {
        let report = detect_oscillation(&[5.0; 20], 0.1, 1);
        assert!(!report.detected);
        assert_eq!(report.cycles, 0);
        assert_eq!(report.amplitude, 0.0);
    }

    #[test]
    fn test_small_ripple_below_tolerance() {
        let values: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1000.0 } else { 1001.0 }).collect();
        let report = detect_oscillation(&values, 0.15, 3);
        assert!(report.cycles >= 3);
        assert!(!report.detected);
    }

    #[test]
    fn test_drops_to_zero_counting() {
        let values = [Some(5.0), Some(0.0), Some(3.0), None, Some(0.0), Some(0.0)];
        assert_eq!(count_drops_to_zero(&values), 2);
        assert_eq!(count_drops_to_zero(&[Some(0.0), Some(0.0)]), 0);
        assert_eq!(count_drops_to_zero(&[]), 0);
    }

    #[test]
    fn test_detector_respects_min_drops() {
        let series = series_of(&[5.0, 0.0, 7.0, 0.0, 1.0]);
        let mut config = PatternConfig {
            drops_to_zero: Some(DropsToZeroConfig {
                enabled: true,
                min_drops: 2,
            }),
            ..PatternConfig::default()
        };
        let findings = PatternDetector::new(&config).find_patterns(&series, "watts");
        assert_eq!(findings, vec![PatternFinding::DropsToZero { count: 2 }]);

        config.drops_to_zero = Some(DropsToZeroConfig {
            enabled: true,
            min_drops: 3,
        });
        assert!(PatternDetector::new(&config).find_patterns(&series, "watts").is_empty());
    }

    #[test]
    fn test_detector_reports_oscillation() {
        let series = series_of(&[0.0, 10.0, 0.0, 10.0, 0.0, 10.0, 0.0, 10.0, 0.0]);
        let config = PatternConfig {
            oscillation: Some(OscillationConfig {
                enabled: true,
                tolerance: 0.2,
                min_cycles: 3,
                observed: None,
            }),
            ..PatternConfig::default()
        };
        let findings = PatternDetector::new(&config).find_patterns(&series, "watts");
        assert!(matches!(findings.as_slice(), [PatternFinding::Oscillation(r)] if r.detected));
    }

    #[test]
    fn test_plateau_and_duty_cycle_flags_add_no_findings() {
        let series = series_of(&[500.0; 12]);
        let config: PatternConfig =
            serde_json::from_str(r#"{"plateau":{"enabled":true},"duty_cycle":{"enabled":true}}"#).unwrap();
        assert!(PatternDetector::new(&config).find_patterns(&series, "watts").is_empty());
    }
}
