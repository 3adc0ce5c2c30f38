//! Detection module - rule simulation, rule proposal, current status

mod proposer;
mod state_machine;
mod status;

pub use proposer::*;
pub use state_machine::*;
pub use status::*;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metric key for the fraction of samples spent in an active state
pub const ACTIVE_RATIO: &str = "active_ratio";
/// Metric key for the integrated energy of power metrics
pub const ENERGY_WH: &str = "energy_wh";

/// What happened at a transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Start,
    Stop,
    StateChange { from: String, to: String },
    DropsToZero { count: u32 },
    Oscillation { cycles: u32, amplitude: f64 },
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::Start => "START",
            EventKind::Stop => "STOP",
            EventKind::StateChange { .. } => "STATE_CHANGE",
            EventKind::DropsToZero { .. } => "DROPS_TO_ZERO",
            EventKind::Oscillation { .. } => "OSCILLATION",
        }
    }
}

/// Discrete event emitted by a simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub timestamp: DateTime<Utc>,
    pub event: EventKind,
}

/// State label held at one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub timestamp: DateTime<Utc>,
    pub state: String,
}

/// Everything one simulation run produces. Owned by the caller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub states: Vec<StateRecord>,
    pub events: Vec<TransitionEvent>,
    pub metrics: BTreeMap<String, f64>,
}

impl SimulationResult {
    pub fn active_ratio(&self) -> f64 {
        self.metrics.get(ACTIVE_RATIO).copied().unwrap_or(0.0)
    }

    pub fn energy_wh(&self) -> Option<f64> {
        self.metrics.get(ENERGY_WH).copied()
    }

    pub fn last_state(&self) -> Option<&str> {
        self.states.last().map(|s| s.state.as_str())
    }

    /// Events of one kind, by kind name (`"START"`, `"STATE_CHANGE"`, ...)
    pub fn events_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TransitionEvent> + 'a {
        self.events.iter().filter(move |e| e.event.name() == name)
    }
}
