// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Configuration module

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::PreprocessConfig;

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Application version
    pub version: String,

    /// Log level
    pub log_level: String,

    /// Preprocessing and status defaults
    #[serde(default)]
    pub defaults: Defaults,

    /// Confidence scoring for proposed rules
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// Rule templates keyed by device type
    #[serde(default = "default_templates")]
    pub templates: BTreeMap<String, TemplateConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "WattState".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            log_level: "info".to_string(),
            defaults: Defaults::default(),
            scoring: ScoringConfig::default(),
            templates: default_templates(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load the file if it exists, otherwise use the built-in defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("wattstate"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Template for `device_type`, falling back to `other`, then the generic template
    pub fn template_for(&self, device_type: &str) -> TemplateConfig {
        self.templates
            .get(device_type)
            .or_else(|| self.templates.get(FALLBACK_TEMPLATE))
            .cloned()
            .unwrap_or_default()
    }
}

/// Template used for unknown device types
pub const FALLBACK_TEMPLATE: &str = "other";

/// Preprocessing and status defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Defaults {
    /// Bucket width in seconds
    pub sampling_sec: u32,

    /// Trailing window used for current status, in minutes
    pub status_window_min: u32,

    /// IQR multiplier for outlier clipping
    pub iqr_factor: f64,

    /// Rolling median window
    pub smoothing_window: usize,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            sampling_sec: 10,
            status_window_min: 15,
            iqr_factor: 3.0,
            smoothing_window: 3,
        }
    }
}

impl Defaults {
    pub fn preprocess_config(&self) -> PreprocessConfig {
        PreprocessConfig {
            sampling_sec: self.sampling_sec,
            iqr_factor: self.iqr_factor,
            smoothing_window: self.smoothing_window,
        }
    }
}

/// Confidence heuristic for proposed rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub base: f64,
    /// Added when the start threshold sits above the idle threshold
    pub threshold_bonus: f64,
    /// Added when the history oscillates
    pub oscillation_bonus: f64,
    pub max_confidence: f64,
    /// Percentile the start threshold is taken from
    pub high_percentile: f64,
    /// Percentile the idle threshold is taken from
    pub low_percentile: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base: 0.55,
            threshold_bonus: 0.2,
            oscillation_bonus: 0.1,
            max_confidence: 0.95,
            high_percentile: 85.0,
            low_percentile: 15.0,
        }
    }
}

/// How a device's main signal should be read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    /// Continuous power draw, thresholds inferred from percentiles
    #[default]
    Power,
    /// On/off signal, fixed thresholds
    Binary,
    /// Generic level (lux, temperature, ...), fixed thresholds
    Level,
}

/// Device-type template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    #[serde(default)]
    pub signal: SignalKind,
    #[serde(default)]
    pub expected_metrics: Vec<String>,
    pub thresholds: TemplateThresholds,
    #[serde(default)]
    pub patterns: TemplatePatterns,
    #[serde(default)]
    pub params: TemplateParams,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            signal: SignalKind::Power,
            expected_metrics: vec!["watts".to_string()],
            thresholds: TemplateThresholds {
                start: 100.0,
                idle: 10.0,
            },
            patterns: TemplatePatterns::default(),
            params: TemplateParams::default(),
        }
    }
}

/// Fallback thresholds, used as-is for fixed-shape templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateThresholds {
    pub start: f64,
    pub idle: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplatePatterns {
    #[serde(default)]
    pub oscillation: bool,
    #[serde(default)]
    pub plateau: bool,
    #[serde(default)]
    pub duty_cycle: bool,
    #[serde(default)]
    pub drops_to_zero: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateParams {
    pub tolerance: f64,
    pub min_cycles: u32,
    pub min_duration_sec: u32,
    pub exit_for_sec: u32,
}

impl Default for TemplateParams {
    fn default() -> Self {
        Self {
            tolerance: 0.15,
            min_cycles: 3,
            min_duration_sec: 30,
            exit_for_sec: 30,
        }
    }
}

fn power_template(start: f64, idle: f64, patterns: TemplatePatterns, params: TemplateParams) -> TemplateConfig {
    TemplateConfig {
        signal: SignalKind::Power,
        expected_metrics: vec!["watts".to_string()],
        thresholds: TemplateThresholds { start, idle },
        patterns,
        params,
    }
}

fn default_templates() -> BTreeMap<String, TemplateConfig> {
    let mut templates = BTreeMap::new();

    templates.insert(
        "washing_machine".to_string(),
        power_template(
            50.0,
            5.0,
            TemplatePatterns {
                oscillation: true,
                drops_to_zero: true,
                ..TemplatePatterns::default()
            },
            TemplateParams {
                min_duration_sec: 60,
                ..TemplateParams::default()
            },
        ),
    );
    templates.insert(
        "fridge".to_string(),
        power_template(
            60.0,
            5.0,
            TemplatePatterns {
                duty_cycle: true,
                ..TemplatePatterns::default()
            },
            TemplateParams {
                tolerance: 0.3,
                min_cycles: 2,
                min_duration_sec: 120,
                exit_for_sec: 60,
            },
        ),
    );
    templates.insert(
        "heater".to_string(),
        power_template(
            500.0,
            20.0,
            TemplatePatterns {
                plateau: true,
                duty_cycle: true,
                ..TemplatePatterns::default()
            },
            TemplateParams::default(),
        ),
    );
    templates.insert(
        "plug".to_string(),
        TemplateConfig {
            signal: SignalKind::Binary,
            expected_metrics: vec!["on".to_string()],
            thresholds: TemplateThresholds {
                start: 1.0,
                idle: 0.0,
            },
            patterns: TemplatePatterns::default(),
            params: TemplateParams {
                min_duration_sec: 0,
                exit_for_sec: 0,
                ..TemplateParams::default()
            },
        },
    );
    templates.insert(
        "light_sensor".to_string(),
        TemplateConfig {
            signal: SignalKind::Level,
            expected_metrics: vec!["lux".to_string()],
            thresholds: TemplateThresholds {
                start: 50.0,
                idle: 10.0,
            },
            patterns: TemplatePatterns::default(),
            params: TemplateParams {
                min_duration_sec: 60,
                ..TemplateParams::default()
            },
        },
    );
    templates.insert(FALLBACK_TEMPLATE.to_string(), TemplateConfig::default());

    templates
}
