// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Current-status snapshot over a trailing window

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{simulate, TransitionEvent};
use crate::analysis::Preprocessor;
use crate::config::Defaults;
use crate::rules::Rule;
use crate::series::Sample;

/// State reported when no rule or no recent data is available
pub const UNKNOWN_STATE: &str = "UNKNOWN";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub state: String,
    pub last_event: Option<TransitionEvent>,
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl StatusSnapshot {
    fn unknown(reason: &str) -> Self {
        Self {
            state: UNKNOWN_STATE.to_string(),
            last_event: None,
            metrics: BTreeMap::new(),
            reason: Some(reason.to_string()),
        }
    }
}

/// Latest state of a device, simulated over the `status_window_min` minutes
/// ending at `now`.
pub fn current_status(
    points: &[Sample],
    rule: Option<&Rule>,
    now: DateTime<Utc>,
    defaults: &Defaults,
) -> StatusSnapshot {
    let Some(rule) = rule else {
        return StatusSnapshot::unknown("no rule");
    };

    let from = now - Duration::minutes(i64::from(defaults.status_window_min));
    let window: Vec<Sample> = points
        .iter()
        .filter(|p| p.timestamp >= from && p.timestamp <= now)
        .cloned()
        .collect();

    let series = Preprocessor::new(defaults.preprocess_config()).run(&window, &[rule.metric()]);
    let result = simulate(&series, rule);

    match result.states.last() {
        Some(last) => StatusSnapshot {
            state: last.state.clone(),
            last_event: result.events.last().cloned(),
            metrics: result.metrics,
            reason: None,
        },
        None => StatusSnapshot {
            metrics: result.metrics,
            ..StatusSnapshot::unknown("no data")
        },
    }
}
