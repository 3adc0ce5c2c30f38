// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Engine facade - binds configuration to the pure pipeline functions

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::analysis::Preprocessor;
use crate::config::Config;
use crate::detection::{current_status, simulate, ProposedRule, RuleProposer, SimulationResult, StatusSnapshot};
use crate::rules::{Rule, RuleError};
use crate::series::{Sample, Series};

/// Stateless engine. Every call is a pure function of its arguments and the
/// configuration, so one engine can serve concurrent callers.
#[derive(Debug, Clone)]
pub struct Engine {
    pub config: Arc<Config>,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        info!(
            "Engine ready: sampling_sec={} templates={}",
            config.defaults.sampling_sec,
            config.templates.len()
        );
        Self {
            config: Arc::new(config),
        }
    }

    /// Clean and resample raw points; `sampling_sec` defaults to the configured cadence.
    pub fn preprocess(&self, points: &[Sample], metric: &str, sampling_sec: Option<u32>) -> Series {
        let mut cfg = self.config.defaults.preprocess_config();
        if let Some(sampling_sec) = sampling_sec {
            cfg.sampling_sec = sampling_sec;
        }
        Preprocessor::new(cfg).run(points, &[metric])
    }

    /// Preprocess at the rule's cadence, then simulate.
    pub fn simulate(&self, points: &[Sample], rule: &Rule) -> SimulationResult {
        let series = self.preprocess(points, rule.metric(), Some(rule.sampling_sec()));
        debug!("Simulating rule on {} over {} buckets", rule.metric(), series.len());
        simulate(&series, rule)
    }

    /// Propose a rule for a device type from its raw history.
    pub fn propose(&self, points: &[Sample], device_type: &str, metric: &str) -> Result<ProposedRule, RuleError> {
        let template = self.config.template_for(device_type);
        let series = self.preprocess(points, metric, None);
        debug!("Proposing {} rule for device type {}", metric, device_type);
        RuleProposer::new(&self.config.scoring).propose(&series, &template, metric)
    }

    /// Current state over the configured trailing window.
    pub fn status(&self, points: &[Sample], rule: Option<&Rule>, now: DateTime<Utc>) -> StatusSnapshot {
        current_status(points, rule, now, &self.config.defaults)
    }
}
