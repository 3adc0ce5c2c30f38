// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! WattState - device operating-state inference from energy telemetry
//!
//! Turns raw, irregular device readings (watts, on/off, lux, ...) into
//! interpretable states and transition events:
//! - Preprocessing: outlier clipping, fixed-cadence resampling, median smoothing
//! - Rule simulation: debounced threshold and multi-state machines
//! - Rule proposal: percentile thresholds with a confidence score
//!
//! # Architecture
//!
//! ```text
//! raw samples ─→ Preprocessor ─→ Series ─┬─→ simulate(rule) ─→ states / events / metrics
//!                                        └─→ RuleProposer   ─→ Rule + explanation + confidence
//! ```
//!
//! Every stage is a pure function of its inputs. [`Engine`] binds them to a
//! loaded [`Config`].

pub mod analysis;
pub mod config;
pub mod core;
pub mod detection;
pub mod rules;
pub mod series;

// Re-exports for convenience
pub use analysis::{preprocess, PreprocessConfig, Preprocessor};
pub use config::Config;
pub use crate::core::Engine;
pub use detection::{
    current_status, propose, simulate, EventKind, ProposedRule, RuleProposer, SimulationResult,
    StatusSnapshot, TransitionEvent,
};
pub use rules::{Condition, Rule, RuleError};
pub use series::{Sample, Series};

/// WattState version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// WattState name
pub const NAME: &str = "WattState";
