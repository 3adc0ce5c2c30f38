// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Rule definition errors

use thiserror::Error;

/// A structurally invalid rule document.
///
/// Raised once, when the rule is built, never during simulation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuleError {
    /// Unparseable document, including unknown operators
    #[error("malformed rule document: {0}")]
    Malformed(String),

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("sampling_sec must be a positive integer")]
    ZeroSamplingSec,

    #[error("rule declares no states")]
    NoStates,

    #[error("state #{index} has no name")]
    UnnamedState { index: usize },

    #[error("duplicate state `{0}`")]
    DuplicateState(String),

    #[error("state `{state}` must declare either `when` or both `entry` and `exit`")]
    AmbiguousState { state: String },

    #[error("rule mixes `when` states with `entry`/`exit` states")]
    MixedStateShapes,

    #[error("threshold rules take exactly one state, found {0}")]
    TooManyThresholdStates(usize),

    #[error("state `{state}`: between range has min {min} > max {max}")]
    InvertedRange { state: String, min: f64, max: f64 },

    #[error("state `{state}`: thresholds must be finite numbers")]
    NonFiniteThreshold { state: String },

    #[error("initial state `{0}` is not declared by the rule")]
    UnknownInitialState(String),

    #[error("active state `{0}` is not declared by the rule")]
    UnknownActiveState(String),

    #[error("invalid pattern parameter `{field}`: {reason}")]
    InvalidPattern { field: &'static str, reason: String },
}

impl RuleError {
    /// Stable error kind for callers that map errors onto responses
    pub fn kind(&self) -> &'static str {
        "invalid_rule_definition"
    }
}

impl From<serde_json::Error> for RuleError {
    fn from(err: serde_json::Error) -> Self {
        RuleError::Malformed(err.to_string())
    }
}
