// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Pattern section of a rule document

use serde::{Deserialize, Serialize};

use super::RuleError;
use crate::analysis::OscillationReport;

/// Independently toggled pattern checks run after a simulation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatternConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oscillation: Option<OscillationConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plateau: Option<PlateauConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duty_cycle: Option<DutyCycleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drops_to_zero: Option<DropsToZeroConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OscillationConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Minimum relative amplitude, `(p90 - p10) / mean`
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
    #[serde(default = "default_min_cycles")]
    pub min_cycles: u32,
    /// What the proposer saw in the history it derived the rule from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed: Option<OscillationReport>,
}

impl Default for OscillationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            tolerance: default_tolerance(),
            min_cycles: default_min_cycles(),
            observed: None,
        }
    }
}

/// Declared but not detected yet; carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlateauConfig {
    #[serde(default)]
    pub enabled: bool,
}

/// Declared but not detected yet; carried through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DutyCycleConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DropsToZeroConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_min_drops")]
    pub min_drops: u32,
}

impl Default for DropsToZeroConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_drops: default_min_drops(),
        }
    }
}

fn default_tolerance() -> f64 {
    0.15
}

fn default_min_cycles() -> u32 {
    3
}

fn default_min_drops() -> u32 {
    2
}

impl PatternConfig {
    pub fn oscillation_check(&self) -> Option<&OscillationConfig> {
        self.oscillation.as_ref().filter(|c| c.enabled)
    }

    pub fn drops_to_zero_check(&self) -> Option<&DropsToZeroConfig> {
        self.drops_to_zero.as_ref().filter(|c| c.enabled)
    }

    pub fn plateau_enabled(&self) -> bool {
        self.plateau.as_ref().is_some_and(|c| c.enabled)
    }

    pub fn duty_cycle_enabled(&self) -> bool {
        self.duty_cycle.as_ref().is_some_and(|c| c.enabled)
    }

    /// Enabled checks that have no detector behind them
    pub fn unimplemented_checks(&self) -> Vec<&'static str> {
        let mut checks = Vec::new();
        if self.plateau_enabled() {
            checks.push("plateau");
        }
        if self.duty_cycle_enabled() {
            checks.push("duty_cycle");
        }
        checks
    }

    pub(crate) fn validate(&self) -> Result<(), RuleError> {
        if let Some(osc) = &self.oscillation {
            if !osc.tolerance.is_finite() || osc.tolerance < 0.0 {
                return Err(RuleError::InvalidPattern {
                    field: "oscillation.tolerance",
                    reason: format!("expected a finite value >= 0, got {}", osc.tolerance),
                });
            }
        }
        if let Some(drops) = &self.drops_to_zero {
            if drops.min_drops == 0 {
                return Err(RuleError::InvalidPattern {
                    field: "drops_to_zero.min_drops",
                    reason: "must be at least 1".to_string(),
                });
            }
        }
        Ok(())
    }
}
