// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Debounced rule state machine
//!
//! Every condition keeps its own elapsed-seconds counter: it grows by the
//! series cadence on each sample where the condition holds and resets to zero
//! otherwise. A condition may drive a transition only while it holds and its
//! counter has reached `for_sec`.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use super::{EventKind, SimulationResult, StateRecord, TransitionEvent, ACTIVE_RATIO, ENERGY_WH};
use crate::analysis::{PatternDetector, PatternFinding};
use crate::rules::{Condition, MultiStateRule, Rule, RuleKind, ThresholdRule, INACTIVE_STATE};
use crate::series::Series;

/// Metrics whose time integral is reported as `energy_wh`
pub const POWER_METRICS: &[&str] = &["watts", "power", "apower"];

pub fn is_power_metric(metric: &str) -> bool {
    POWER_METRICS.contains(&metric)
}

/// Elapsed-duration tracker for one condition
#[derive(Debug, Clone)]
pub struct Debouncer {
    condition: Condition,
    elapsed_sec: u64,
}

impl Debouncer {
    pub fn new(condition: Condition) -> Self {
        Self {
            condition,
            elapsed_sec: 0,
        }
    }

    /// Feed one sample spanning `step_sec` seconds; returns whether the
    /// condition is now a transition candidate.
    pub fn update(&mut self, value: Option<f64>, step_sec: u32) -> bool {
        if self.condition.evaluate(value) {
            self.elapsed_sec += u64::from(step_sec);
            self.elapsed_sec >= u64::from(self.condition.min_duration_sec())
        } else {
            self.elapsed_sec = 0;
            false
        }
    }

    pub fn elapsed_sec(&self) -> u64 {
        self.elapsed_sec
    }
}

/// Walk `series` sample by sample under `rule`.
///
/// Pattern events are appended after the chronological transition events and
/// carry the last sample's timestamp.
pub fn simulate(series: &Series, rule: &Rule) -> SimulationResult {
    let mut metrics = BTreeMap::new();
    if series.is_empty() {
        metrics.insert(ACTIVE_RATIO.to_string(), 0.0);
        return SimulationResult {
            states: Vec::new(),
            events: Vec::new(),
            metrics,
        };
    }

    if series.sampling_sec != rule.sampling_sec() {
        debug!(
            "series cadence {}s differs from rule cadence {}s, debouncing on the series cadence",
            series.sampling_sec,
            rule.sampling_sec()
        );
    }

    let metric = rule.metric();
    let (states, mut events, active_samples) = match rule.kind() {
        RuleKind::Threshold(threshold) => walk_threshold(series, metric, threshold),
        RuleKind::MultiState(multi) => walk_multi_state(series, metric, multi),
    };

    metrics.insert(
        ACTIVE_RATIO.to_string(),
        active_samples as f64 / series.len() as f64,
    );
    if is_power_metric(metric) {
        metrics.insert(ENERGY_WH.to_string(), energy_wh(&series.present_values(metric)));
    }

    if let Some(last) = series.last_timestamp() {
        let findings = PatternDetector::new(rule.patterns()).find_patterns(series, metric);
        events.extend(findings.into_iter().map(|finding| TransitionEvent {
            timestamp: last,
            event: match finding {
                PatternFinding::DropsToZero { count } => EventKind::DropsToZero { count },
                PatternFinding::Oscillation(report) => EventKind::Oscillation {
                    cycles: report.cycles,
                    amplitude: report.amplitude,
                },
            },
        }));
    }

    debug!(
        "Simulated {} samples of {}: {} events, active_ratio={:.3}",
        series.len(),
        metric,
        events.len(),
        metrics.get(ACTIVE_RATIO).copied().unwrap_or(0.0)
    );

    SimulationResult {
        states,
        events,
        metrics,
    }
}

fn walk_threshold(
    series: &Series,
    metric: &str,
    rule: &ThresholdRule,
) -> (Vec<StateRecord>, Vec<TransitionEvent>, usize) {
    let mut entry = Debouncer::new(rule.entry);
    let mut states = Vec::with_capacity(series.len());
    let mut events = Vec::new();
    let mut active_samples = 0;
    let mut was_active = false;

    for sample in &series.samples {
        let active = entry.update(sample.value(metric), series.sampling_sec);

        if active && !was_active {
            trace!("START at {}", sample.timestamp);
            events.push(TransitionEvent {
                timestamp: sample.timestamp,
                event: EventKind::Start,
            });
        } else if was_active && !active {
            trace!("STOP at {}", sample.timestamp);
            events.push(TransitionEvent {
                timestamp: sample.timestamp,
                event: EventKind::Stop,
            });
        }

        if active {
            active_samples += 1;
        }
        let label = if active {
            rule.active_state.as_str()
        } else {
            INACTIVE_STATE
        };
        states.push(StateRecord {
            timestamp: sample.timestamp,
            state: label.to_string(),
        });
        was_active = active;
    }

    (states, events, active_samples)
}

fn walk_multi_state(
    series: &Series,
    metric: &str,
    rule: &MultiStateRule,
) -> (Vec<StateRecord>, Vec<TransitionEvent>, usize) {
    let mut debouncers: Vec<Debouncer> = rule.states.iter().map(|s| Debouncer::new(s.entry)).collect();
    let mut states = Vec::with_capacity(series.len());
    let mut events = Vec::new();
    let mut active_samples = 0;
    let mut current = rule.initial_state.clone();

    for sample in &series.samples {
        let value = sample.value(metric);

        // every counter advances, the first candidate in declaration order wins
        let mut winner = None;
        for (i, debouncer) in debouncers.iter_mut().enumerate() {
            if debouncer.update(value, series.sampling_sec) && winner.is_none() {
                winner = Some(i);
            }
        }

        if let Some(i) = winner {
            let next = &rule.states[i].name;
            if *next != current {
                trace!("{} -> {} at {}", current, next, sample.timestamp);
                events.push(TransitionEvent {
                    timestamp: sample.timestamp,
                    event: EventKind::StateChange {
                        from: current.clone(),
                        to: next.clone(),
                    },
                });
                current = next.clone();
            }
        }

        if rule.active_states.contains(&current) {
            active_samples += 1;
        }
        states.push(StateRecord {
            timestamp: sample.timestamp,
            state: current.clone(),
        });
    }

    (states, events, active_samples)
}

/// Trapezoidal integral with unit spacing, in watt-hours.
pub fn energy_wh(values: &[f64]) -> f64 {
    let area: f64 = values.windows(2).map(|w| (w[0] + w[1]) / 2.0).sum();
    area / 3600.0
}
