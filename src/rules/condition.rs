// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.

//! Threshold/range predicates over a single metric value

use serde::{de, Deserialize, Deserializer, Serialize};

use super::RuleError;

/// Predicate over one metric value with a debounce duration.
///
/// Wire shape: `{"op": "gte", "value": 1000, "for_sec": 30}` or
/// `{"op": "between", "min": 5, "max": 40, "for_sec": 0}`. An optional
/// `"type": "threshold"` tag is accepted; any other key is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Condition {
    Gte { value: f64, for_sec: u32 },
    Lte { value: f64, for_sec: u32 },
    Between { min: f64, max: f64, for_sec: u32 },
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Operator {
    Gte,
    Lte,
    Between,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ConditionType {
    Threshold,
}

/// Wire form of a condition, checked field by field before it becomes a [`Condition`]
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConditionDocument {
    #[serde(default, rename = "type")]
    _kind: Option<ConditionType>,
    op: Operator,
    #[serde(default)]
    value: Option<f64>,
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    for_sec: u32,
}

impl TryFrom<ConditionDocument> for Condition {
    type Error = RuleError;

    fn try_from(doc: ConditionDocument) -> Result<Self, Self::Error> {
        let for_sec = doc.for_sec;
        match doc.op {
            Operator::Gte | Operator::Lte => {
                if doc.min.is_some() || doc.max.is_some() {
                    return Err(RuleError::Malformed(
                        "`min`/`max` only apply to `between`".to_string(),
                    ));
                }
                let value = doc.value.ok_or(RuleError::MissingField("value"))?;
                Ok(match doc.op {
                    Operator::Gte => Condition::Gte { value, for_sec },
                    _ => Condition::Lte { value, for_sec },
                })
            }
            Operator::Between => {
                if doc.value.is_some() {
                    return Err(RuleError::Malformed(
                        "`value` does not apply to `between`".to_string(),
                    ));
                }
                let min = doc.min.ok_or(RuleError::MissingField("min"))?;
                let max = doc.max.ok_or(RuleError::MissingField("max"))?;
                Ok(Condition::Between { min, max, for_sec })
            }
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let doc = ConditionDocument::deserialize(deserializer)?;
        Condition::try_from(doc).map_err(de::Error::custom)
    }
}

impl Condition {
    pub fn gte(value: f64, for_sec: u32) -> Self {
        Condition::Gte { value, for_sec }
    }

    pub fn lte(value: f64, for_sec: u32) -> Self {
        Condition::Lte { value, for_sec }
    }

    pub fn between(min: f64, max: f64, for_sec: u32) -> Self {
        Condition::Between { min, max, for_sec }
    }

    /// Seconds the condition must hold before it may cause a transition
    pub fn min_duration_sec(&self) -> u32 {
        match *self {
            Condition::Gte { for_sec, .. }
            | Condition::Lte { for_sec, .. }
            | Condition::Between { for_sec, .. } => for_sec,
        }
    }

    pub fn operator(&self) -> &'static str {
        match self {
            Condition::Gte { .. } => "gte",
            Condition::Lte { .. } => "lte",
            Condition::Between { .. } => "between",
        }
    }

    /// Absent values never satisfy a condition.
    pub fn evaluate(&self, value: Option<f64>) -> bool {
        let Some(v) = value else {
            return false;
        };
        match *self {
            Condition::Gte { value, .. } => v >= value,
            Condition::Lte { value, .. } => v <= value,
            Condition::Between { min, max, .. } => min <= v && v <= max,
        }
    }

    pub(crate) fn validate(&self, state: &str) -> Result<(), RuleError> {
        match *self {
            Condition::Gte { value, .. } | Condition::Lte { value, .. } => {
                if !value.is_finite() {
                    return Err(RuleError::NonFiniteThreshold {
                        state: state.to_string(),
                    });
                }
            }
            Condition::Between { min, max, .. } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err(RuleError::NonFiniteThreshold {
                        state: state.to_string(),
                    });
                }
                if min > max {
                    return Err(RuleError::InvertedRange {
                        state: state.to_string(),
                        min,
                        max,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Evaluate `condition` against one sample value.
pub fn evaluate(value: Option<f64>, condition: &Condition) -> bool {
    condition.evaluate(value)
}
