// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Rule proposal - infer a threshold rule from historical data

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::{detect_oscillation, percentile, sorted_copy, OscillationReport};
use crate::config::{ScoringConfig, SignalKind, TemplateConfig};
use crate::rules::{
    Condition, DropsToZeroConfig, DutyCycleConfig, OscillationConfig, PatternConfig, PlateauConfig,
    Rule, RuleDocument, RuleError, StateDocument, DEFAULT_ACTIVE_STATE,
};
use crate::series::Series;

/// A proposed rule with its rationale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedRule {
    pub rule: Rule,
    pub explanation: String,
    /// Heuristic trust score in `[0, 1]`
    pub confidence: f64,
}

/// Derives default rules from a device's history
pub struct RuleProposer<'a> {
    scoring: &'a ScoringConfig,
}

impl<'a> RuleProposer<'a> {
    pub fn new(scoring: &'a ScoringConfig) -> Self {
        Self { scoring }
    }

    /// Propose a START/STOP rule for `metric`.
    ///
    /// Fails only if the template itself carries unusable thresholds.
    pub fn propose(
        &self,
        series: &Series,
        template: &TemplateConfig,
        metric: &str,
    ) -> Result<ProposedRule, RuleError> {
        let values = series.present_values(metric);

        let (start, idle, observed, explanation) = match template.signal {
            SignalKind::Power if !values.is_empty() => {
                let sorted = sorted_copy(&values);
                let high = self.scoring.high_percentile;
                let low = self.scoring.low_percentile;
                let start = round2(percentile(&sorted, high));
                let idle = round2(percentile(&sorted, low));
                let report = detect_oscillation(
                    &values,
                    template.params.tolerance,
                    template.params.min_cycles,
                );
                let explanation = format!(
                    "Start threshold set at p{:.0}={:.1}, idle at p{:.0}={:.1}. Oscillation detected={}.",
                    high, start, low, idle, report.detected
                );
                (start, idle, Some(report), explanation)
            }
            SignalKind::Power => {
                let start = round2(template.thresholds.start);
                let idle = round2(template.thresholds.idle);
                let explanation = format!(
                    "No {} history; using template defaults start={:.1}, idle={:.1}. Oscillation detected=false.",
                    metric, start, idle
                );
                (start, idle, None, explanation)
            }
            SignalKind::Binary => {
                let start = template.thresholds.start;
                let idle = template.thresholds.idle;
                let explanation = format!(
                    "Binary {} signal: running when >= {}, idle when <= {}.",
                    metric, start, idle
                );
                (start, idle, None, explanation)
            }
            SignalKind::Level => {
                let start = template.thresholds.start;
                let idle = template.thresholds.idle;
                let explanation = format!(
                    "Level {} signal: active when >= {}, idle when <= {} (template thresholds).",
                    metric, start, idle
                );
                (start, idle, None, explanation)
            }
        };

        let oscillating = observed.is_some_and(|r| r.detected);
        let confidence = self.confidence(start > idle, oscillating);

        let document = RuleDocument {
            metric: metric.to_string(),
            sampling_sec: series.sampling_sec.max(1),
            initial_state: None,
            active_states: None,
            states: vec![StateDocument {
                name: Some(DEFAULT_ACTIVE_STATE.to_string()),
                when: None,
                entry: Some(Condition::gte(start, template.params.min_duration_sec)),
                exit: Some(Condition::lte(idle, template.params.exit_for_sec)),
            }],
            patterns: proposed_patterns(template, observed),
            events: vec!["START".to_string(), "STOP".to_string()],
        };
        let rule = Rule::try_from(document)?;

        debug!(
            "Proposed {:?} rule for {} from {} values: start={} idle={} confidence={:.2}",
            template.signal,
            metric,
            values.len(),
            start,
            idle,
            confidence
        );

        Ok(ProposedRule {
            rule,
            explanation,
            confidence,
        })
    }

    fn confidence(&self, separated: bool, oscillating: bool) -> f64 {
        let mut score = self.scoring.base;
        if separated {
            score += self.scoring.threshold_bonus;
        }
        if oscillating {
            score += self.scoring.oscillation_bonus;
        }
        score.min(self.scoring.max_confidence).clamp(0.0, 1.0)
    }
}

fn proposed_patterns(template: &TemplateConfig, observed: Option<OscillationReport>) -> PatternConfig {
    PatternConfig {
        oscillation: Some(OscillationConfig {
            enabled: observed.map_or(template.patterns.oscillation, |r| r.detected),
            tolerance: template.params.tolerance,
            min_cycles: template.params.min_cycles,
            observed,
        }),
        plateau: Some(PlateauConfig {
            enabled: template.patterns.plateau,
        }),
        duty_cycle: Some(DutyCycleConfig {
            enabled: template.patterns.duty_cycle,
        }),
        drops_to_zero: Some(DropsToZeroConfig {
            enabled: template.patterns.drops_to_zero,
            ..DropsToZeroConfig::default()
        }),
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Propose a rule with the default scoring.
pub fn propose(series: &Series, template: &TemplateConfig, metric: &str) -> Result<ProposedRule, RuleError> {
    RuleProposer::new(&ScoringConfig::default()).propose(series, template, metric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::rules::RuleKind;
    use crate::series::Sample;
    use chrono::{TimeZone, Utc};

    fn series_of(metric: &str, values: &[f64]) -> Series {
        Series {
            sampling_sec: 10,
            samples: values
                .iter()
                .enumerate()
                .map(|(i, &v)| {
                    Sample::single(Utc.timestamp_opt(i as i64 * 10, 0).unwrap(), metric, Some(v))
                })
                .collect(),
        }
    }

    fn thresholds(rule: &Rule) -> (Condition, Condition) {
        match rule.kind() {
            RuleKind::Threshold(t) => (t.entry, t.exit),
            other => panic!("proposer must emit threshold rules, got {other:?}"),
        }
    }

    #[test]
    fn test_power_thresholds_from_percentiles() {
        let config = Config::default();
        let template = config.template_for("other");
        let values: Vec<f64> = (0..=100).map(f64::from).collect();
        let proposal = propose(&series_of("watts", &values), &template, "watts").unwrap();

        let (entry, exit) = thresholds(&proposal.rule);
        assert_eq!(entry, Condition::gte(85.0, template.params.min_duration_sec));
        assert_eq!(exit, Condition::lte(15.0, template.params.exit_for_sec));
        assert!((proposal.confidence - 0.75).abs() < 1e-12);
        assert!(proposal.explanation.contains("p85=85.0"));
        assert!(proposal.explanation.contains("p15=15.0"));
        assert!(proposal.explanation.contains("Oscillation detected=false"));
    }

    #[test]
    fn test_thresholds_rounded_to_two_decimals() {
        let template = TemplateConfig::default();
        let proposal = propose(&series_of("watts", &[0.0, 1.0 / 3.0, 2.0 / 3.0, 1.0]), &template, "watts").unwrap();
        let (entry, _) = thresholds(&proposal.rule);
        match entry {
            Condition::Gte { value, .. } => assert_eq!(value, 0.85),
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn test_oscillation_raises_confidence() {
        let config = Config::default();
        let template = config.template_for("washing_machine");
        let values: Vec<f64> = (0..40).map(|i| if (i / 2) % 2 == 0 { 20.0 } else { 400.0 }).collect();
        let proposal = propose(&series_of("watts", &values), &template, "watts").unwrap();

        assert!((proposal.confidence - 0.85).abs() < 1e-12);
        assert!(proposal.explanation.contains("Oscillation detected=true"));
        let osc = proposal.rule.patterns().oscillation_check().unwrap();
        assert!(osc.observed.unwrap().detected);
        assert!(proposal.rule.patterns().drops_to_zero_check().is_some());
    }

    #[test]
    fn test_empty_series_uses_template_defaults() {
        let config = Config::default();
        let template = config.template_for("heater");
        let proposal = propose(&Series::empty(10), &template, "watts").unwrap();

        let (entry, exit) = thresholds(&proposal.rule);
        assert_eq!(entry, Condition::gte(500.0, template.params.min_duration_sec));
        assert_eq!(exit, Condition::lte(20.0, template.params.exit_for_sec));
        assert!((proposal.confidence - 0.75).abs() < 1e-12);
        assert!(proposal.rule.patterns().plateau_enabled());
    }

    #[test]
    fn test_flat_history_gets_base_confidence() {
        let proposal = propose(&series_of("watts", &[42.0; 30]), &TemplateConfig::default(), "watts").unwrap();
        assert!((proposal.confidence - 0.55).abs() < 1e-12);
    }

    #[test]
    fn test_binary_and_level_templates_use_fixed_shape() {
        let config = Config::default();

        let plug = config.template_for("plug");
        let proposal = propose(&series_of("on", &[0.0, 1.0, 1.0, 0.0]), &plug, "on").unwrap();
        assert_eq!(thresholds(&proposal.rule), (Condition::gte(1.0, 0), Condition::lte(0.0, 0)));
        assert_eq!(proposal.rule.metric(), "on");

        let light = config.template_for("light_sensor");
        let proposal = propose(&series_of("lux", &[3.0, 900.0, 5.0]), &light, "lux").unwrap();
        let (entry, exit) = thresholds(&proposal.rule);
        assert_eq!(entry, Condition::gte(50.0, 60));
        assert_eq!(exit, Condition::lte(10.0, 30));
    }

    #[test]
    fn test_confidence_is_capped() {
        let scoring = ScoringConfig {
            base: 0.9,
            max_confidence: 0.99,
            ..ScoringConfig::default()
        };
        let proposer = RuleProposer::new(&scoring);
        assert_eq!(proposer.confidence(true, true), 0.99);

        let reckless = ScoringConfig {
            base: 2.0,
            max_confidence: 5.0,
            ..ScoringConfig::default()
        };
        assert_eq!(RuleProposer::new(&reckless).confidence(true, true), 1.0);
    }

    #[test]
    fn test_proposal_round_trips() {
        let values: Vec<f64> = (0..50).map(|i| (i % 7) as f64 * 100.0).collect();
        let proposal = propose(&series_of("watts", &values), &TemplateConfig::default(), "watts").unwrap();
        let text = serde_json::to_string(&proposal).unwrap();
        let back: ProposedRule = serde_json::from_str(&text).unwrap();
        assert_eq!(back, proposal);
    }

    #[test]
    fn test_non_finite_template_is_rejected() {
        let mut template = TemplateConfig::default();
        template.thresholds.start = f64::NAN;
        assert!(propose(&Series::empty(10), &template, "watts").is_err());
    }
}
