// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Rule DSL - document shape, validation and compiled rule variants
//!
//! A rule travels as a [`RuleDocument`] (the JSON shape stored by callers) and
//! is used as a [`Rule`], which can only be obtained through validation.
//! Deserializing a `Rule` runs that validation, serializing one reproduces the
//! stored document exactly. Unknown keys are rejected rather than dropped.

mod condition;
mod error;
mod pattern_config;

pub use condition::*;
pub use error::*;
pub use pattern_config::*;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Label for samples where a threshold rule is active, unless the state is named
pub const DEFAULT_ACTIVE_STATE: &str = "RUNNING";
/// Label for samples where a threshold rule is inactive
pub const INACTIVE_STATE: &str = "IDLE";

/// On-the-wire rule document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDocument {
    pub metric: String,
    pub sampling_sec: u32,
    /// State held before any debounce threshold is reached (multi-state rules)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_state: Option<String>,
    /// States counted by `active_ratio` (multi-state rules)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_states: Option<Vec<String>>,
    pub states: Vec<StateDocument>,
    #[serde(default)]
    pub patterns: PatternConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<String>,
}

/// One entry of `states`: either `{name, when}` or `{name?, entry, exit}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StateDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<Condition>,
}

/// Named state with its debounced entry condition
#[derive(Debug, Clone, PartialEq)]
pub struct StateDefinition {
    pub name: String,
    pub entry: Condition,
}

/// Two-condition rule producing a RUNNING/IDLE segmentation
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdRule {
    pub active_state: String,
    pub entry: Condition,
    pub exit: Condition,
}

/// Ordered named states, first satisfied state wins
#[derive(Debug, Clone, PartialEq)]
pub struct MultiStateRule {
    pub initial_state: String,
    pub states: Vec<StateDefinition>,
    pub active_states: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    Threshold(ThresholdRule),
    MultiState(MultiStateRule),
}

/// A validated rule.
///
/// Keeps the exact JSON it was built from, so serializing a rule gives back
/// the stored document unchanged (key spelling, integer vs float numbers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value", into = "serde_json::Value")]
pub struct Rule {
    document: RuleDocument,
    kind: RuleKind,
    source: serde_json::Value,
}

impl Rule {
    /// Parse and validate a JSON rule document.
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        Self::try_from(value)
    }

    /// Validate an already-parsed JSON value.
    pub fn from_value(value: serde_json::Value) -> Result<Self, RuleError> {
        Self::try_from(value)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.source)
    }

    pub fn metric(&self) -> &str {
        &self.document.metric
    }

    pub fn sampling_sec(&self) -> u32 {
        self.document.sampling_sec
    }

    pub fn patterns(&self) -> &PatternConfig {
        &self.document.patterns
    }

    pub fn kind(&self) -> &RuleKind {
        &self.kind
    }

    pub fn document(&self) -> &RuleDocument {
        &self.document
    }

    /// The stored document as received
    pub fn source(&self) -> &serde_json::Value {
        &self.source
    }

    fn compile(document: RuleDocument, source: serde_json::Value) -> Result<Self, RuleError> {
        if document.metric.trim().is_empty() {
            return Err(RuleError::MissingField("metric"));
        }
        if document.sampling_sec == 0 {
            return Err(RuleError::ZeroSamplingSec);
        }
        if document.states.is_empty() {
            return Err(RuleError::NoStates);
        }
        document.patterns.validate()?;

        let threshold_shaped = document.states.iter().filter(|s| s.entry.is_some()).count();
        let kind = if threshold_shaped == 0 {
            RuleKind::MultiState(compile_multi_state(&document)?)
        } else if threshold_shaped == document.states.len() {
            RuleKind::Threshold(compile_threshold(&document)?)
        } else {
            return Err(RuleError::MixedStateShapes);
        };

        for check in document.patterns.unimplemented_checks() {
            warn!("rule on {}: {} detection is not implemented, flag ignored", document.metric, check);
        }

        Ok(Self {
            document,
            kind,
            source,
        })
    }
}

impl From<Rule> for RuleDocument {
    fn from(rule: Rule) -> Self {
        rule.document
    }
}

impl From<Rule> for serde_json::Value {
    fn from(rule: Rule) -> Self {
        rule.source
    }
}

impl TryFrom<serde_json::Value> for Rule {
    type Error = RuleError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        let document = RuleDocument::deserialize(&value)?;
        Self::compile(document, value)
    }
}

impl TryFrom<RuleDocument> for Rule {
    type Error = RuleError;

    fn try_from(document: RuleDocument) -> Result<Self, Self::Error> {
        let source = serde_json::to_value(&document)?;
        Self::compile(document, source)
    }
}

fn compile_threshold(document: &RuleDocument) -> Result<ThresholdRule, RuleError> {
    if document.states.len() != 1 {
        return Err(RuleError::TooManyThresholdStates(document.states.len()));
    }
    let state = &document.states[0];
    let active_state = state
        .name
        .clone()
        .unwrap_or_else(|| DEFAULT_ACTIVE_STATE.to_string());

    let (Some(entry), Some(exit), None) = (state.entry, state.exit, state.when) else {
        return Err(RuleError::AmbiguousState {
            state: active_state,
        });
    };
    entry.validate(&active_state)?;
    exit.validate(&active_state)?;

    Ok(ThresholdRule {
        active_state,
        entry,
        exit,
    })
}

fn compile_multi_state(document: &RuleDocument) -> Result<MultiStateRule, RuleError> {
    let initial_state = document
        .initial_state
        .clone()
        .filter(|s| !s.trim().is_empty())
        .ok_or(RuleError::MissingField("initial_state"))?;

    let mut seen = HashSet::new();
    let mut states = Vec::with_capacity(document.states.len());
    for (index, state) in document.states.iter().enumerate() {
        let name = state
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or(RuleError::UnnamedState { index })?;
        if !seen.insert(name.clone()) {
            return Err(RuleError::DuplicateState(name));
        }
        let Some(entry) = state.when else {
            return Err(RuleError::AmbiguousState { state: name });
        };
        if state.exit.is_some() {
            return Err(RuleError::AmbiguousState { state: name });
        }
        entry.validate(&name)?;
        states.push(StateDefinition { name, entry });
    }

    if !seen.contains(&initial_state) {
        return Err(RuleError::UnknownInitialState(initial_state));
    }

    let active_states = match &document.active_states {
        Some(declared) => {
            for name in declared {
                if !seen.contains(name) {
                    return Err(RuleError::UnknownActiveState(name.clone()));
                }
            }
            declared.clone()
        }
        None => vec![states[0].name.clone()],
    };

    Ok(MultiStateRule {
        initial_state,
        states,
        active_states,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn threshold_json() -> serde_json::Value {
        json!({
            "metric": "watts",
            "sampling_sec": 10,
            "states": [{
                "name": "RUNNING",
                "entry": {"op": "gte", "value": 1000, "for_sec": 10},
                "exit": {"op": "lte", "value": 100, "for_sec": 30}
            }],
            "patterns": {"drops_to_zero": {"enabled": true, "min_drops": 2}},
            "events": ["START", "STOP"]
        })
    }

    fn multi_state_json() -> serde_json::Value {
        json!({
            "metric": "watts",
            "sampling_sec": 10,
            "initial_state": "OFF",
            "states": [
                {"name": "RUNNING", "when": {"op": "gte", "value": 500, "for_sec": 20}},
                {"name": "IDLE", "when": {"op": "between", "min": 1, "max": 499, "for_sec": 10}},
                {"name": "OFF", "when": {"op": "lte", "value": 0.5, "for_sec": 30}}
            ]
        })
    }

    #[test]
    fn test_threshold_rule_compiles() {
        let rule = Rule::from_value(threshold_json()).unwrap();
        assert_eq!(rule.metric(), "watts");
        assert_eq!(rule.sampling_sec(), 10);
        match rule.kind() {
            RuleKind::Threshold(t) => {
                assert_eq!(t.active_state, "RUNNING");
                assert_eq!(t.entry, Condition::gte(1000.0, 10));
                assert_eq!(t.exit, Condition::lte(100.0, 30));
            }
            other => panic!("expected threshold rule, got {other:?}"),
        }
    }

    #[test]
    fn test_multi_state_defaults_active_to_first_state() {
        let rule = Rule::from_value(multi_state_json()).unwrap();
        match rule.kind() {
            RuleKind::MultiState(m) => {
                assert_eq!(m.initial_state, "OFF");
                assert_eq!(m.states.len(), 3);
                assert_eq!(m.active_states, vec!["RUNNING".to_string()]);
            }
            other => panic!("expected multi-state rule, got {other:?}"),
        }
    }

    #[test]
    fn test_round_trip_is_exact() {
        let stored = json!({
            "metric": "watts",
            "sampling_sec": 10,
            "states": [{
                "name": "RUNNING",
                "entry": {"type": "threshold", "op": "gte", "value": 1000, "for_sec": 30},
                "exit": {"type": "threshold", "op": "lte", "value": 12.5, "for_sec": 30}
            }],
            "patterns": {"plateau": {"enabled": false}},
            "events": ["START", "STOP"]
        });

        let rule = Rule::from_value(stored.clone()).unwrap();
        assert_eq!(serde_json::to_value(&rule).unwrap(), stored);
        assert_eq!(rule.to_json().unwrap(), serde_json::to_string(&stored).unwrap());

        for doc in [threshold_json(), multi_state_json()] {
            let rule: Rule = serde_json::from_value(doc.clone()).unwrap();
            assert_eq!(serde_json::to_value(&rule).unwrap(), doc);
            assert_eq!(Rule::from_json(&rule.to_json().unwrap()).unwrap(), rule);
        }
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let mut doc = threshold_json();
        doc["states"][0]["entry"] = json!({"op": "gte", "value": 1000, "forsec": 30});
        assert!(matches!(Rule::from_value(doc), Err(RuleError::Malformed(_))));

        let mut doc = threshold_json();
        doc["sampling"] = json!(10);
        assert!(matches!(Rule::from_value(doc), Err(RuleError::Malformed(_))));

        let mut doc = multi_state_json();
        doc["states"][0]["duration"] = json!(5);
        assert!(matches!(Rule::from_value(doc), Err(RuleError::Malformed(_))));

        let mut doc = threshold_json();
        doc["patterns"]["drops_to_zero"]["min_drop"] = json!(3);
        assert!(matches!(Rule::from_value(doc), Err(RuleError::Malformed(_))));
    }

    #[test]
    fn test_unknown_initial_state_rejected() {
        let mut doc = multi_state_json();
        doc["initial_state"] = json!("BANANA");
        assert_eq!(
            Rule::from_value(doc),
            Err(RuleError::UnknownInitialState("BANANA".to_string()))
        );
    }

    #[test]
    fn test_unknown_operator_is_invalid_rule() {
        let mut doc = threshold_json();
        doc["states"][0]["entry"]["op"] = json!("gt");
        let err = Rule::from_value(doc).unwrap_err();
        assert!(matches!(err, RuleError::Malformed(_)));
        assert_eq!(err.kind(), "invalid_rule_definition");
    }

    #[test]
    fn test_inverted_between_rejected() {
        let mut doc = multi_state_json();
        doc["states"][1]["when"] = json!({"op": "between", "min": 499, "max": 1});
        assert!(matches!(
            Rule::from_value(doc),
            Err(RuleError::InvertedRange { .. })
        ));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut doc = threshold_json();
        doc.as_object_mut().unwrap().remove("metric");
        assert!(matches!(Rule::from_value(doc), Err(RuleError::Malformed(_))));

        let mut doc = multi_state_json();
        doc.as_object_mut().unwrap().remove("initial_state");
        assert_eq!(
            Rule::from_value(doc),
            Err(RuleError::MissingField("initial_state"))
        );

        let mut doc = threshold_json();
        doc["states"][0].as_object_mut().unwrap().remove("exit");
        assert!(matches!(
            Rule::from_value(doc),
            Err(RuleError::AmbiguousState { .. })
        ));
    }

    #[test]
    fn test_structural_errors() {
        let mut doc = threshold_json();
        doc["sampling_sec"] = json!(0);
        assert_eq!(Rule::from_value(doc), Err(RuleError::ZeroSamplingSec));

        let mut doc = multi_state_json();
        doc["states"] = json!([]);
        assert_eq!(Rule::from_value(doc), Err(RuleError::NoStates));

        let mut doc = multi_state_json();
        doc["states"][2]["name"] = json!("RUNNING");
        assert_eq!(
            Rule::from_value(doc),
            Err(RuleError::DuplicateState("RUNNING".to_string()))
        );

        let mut doc = multi_state_json();
        doc["states"][0] = threshold_json()["states"][0].clone();
        assert_eq!(Rule::from_value(doc), Err(RuleError::MixedStateShapes));

        let mut doc = multi_state_json();
        doc["active_states"] = json!(["HEATING"]);
        assert_eq!(
            Rule::from_value(doc),
            Err(RuleError::UnknownActiveState("HEATING".to_string()))
        );
    }

    #[test]
    fn test_deserialize_runs_validation() {
        let mut doc = threshold_json();
        doc["sampling_sec"] = json!(0);
        let parsed: Result<Rule, _> = serde_json::from_value(doc);
        assert!(parsed.is_err());
    }
}
