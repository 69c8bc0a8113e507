//! v1 cross-boundary contracts for the narrative process engine, persistence,
//! and command-line tooling.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod serde_u64_string;

pub const SCHEMA_VERSION_V1: &str = "1.0";
pub const TICKS_PER_DAY: u64 = 24;

/// Identity of a live process: a template name plus an optional owning actor.
///
/// Global processes (an audit cycle, a city-wide rumor mill) have no owner;
/// actor-bound processes carry the actor id. The pair is the primary key for
/// the registry and the trigger schedule, replacing the older formatted
/// `owner@template` string so ids containing separators stay unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProcessKey {
    pub template: String,
    pub owner: Option<String>,
}

impl ProcessKey {
    pub fn global(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            owner: None,
        }
    }

    pub fn owned(owner: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            owner: Some(owner.into()),
        }
    }

    pub fn is_global(&self) -> bool {
        self.owner.is_none()
    }
}

impl fmt::Display for ProcessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.owner {
            Some(owner) => write!(f, "{}@{}", owner, self.template),
            None => write!(f, "{}", self.template),
        }
    }
}

/// Immutable named definition of a stochastic process.
///
/// `mean_period_ticks` is the average delay between firings in engine ticks
/// (fractional; the jitter stage rounds). Weights are relative probabilities
/// per firing; whatever mass is left under 1.0 after normalization belongs to
/// the reserved empty outcome ("no emission" / "remain in this template").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessTemplate {
    pub name: String,
    pub mean_period_ticks: f64,
    #[serde(default)]
    pub transitions: BTreeMap<String, f64>,
    #[serde(default)]
    pub emissions: BTreeMap<String, f64>,
}

impl ProcessTemplate {
    pub fn new(name: impl Into<String>, mean_period_ticks: f64) -> Self {
        Self {
            name: name.into(),
            mean_period_ticks,
            transitions: BTreeMap::new(),
            emissions: BTreeMap::new(),
        }
    }

    pub fn with_transition(mut self, label: impl Into<String>, weight: f64) -> Self {
        self.transitions.insert(label.into(), weight);
        self
    }

    pub fn with_emission(mut self, label: impl Into<String>, weight: f64) -> Self {
        self.emissions.insert(label.into(), weight);
        self
    }
}

/// One persisted schedule entry. An ordered sequence of these is the
/// checkpoint format for the registry/schedule pair and must round-trip
/// exactly in content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledProcessRecord {
    pub template: String,
    pub owner: Option<String>,
    #[serde(with = "serde_u64_string")]
    pub next_fire_tick: u64,
}

impl ScheduledProcessRecord {
    pub fn key(&self) -> ProcessKey {
        ProcessKey {
            template: self.template.clone(),
            owner: self.owner.clone(),
        }
    }
}

/// Mutations external collaborators may request against the engine.
///
/// Event handlers return these instead of calling back into the engine
/// mid-pass; the engine honors unregistrations immediately and defers
/// registrations to the next update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineCommand {
    Register {
        template: String,
        owner: Option<String>,
        at_tick: Option<u64>,
    },
    Unregister {
        key: ProcessKey,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationConfig {
    pub schema_version: String,
    pub run_id: String,
    #[serde(with = "serde_u64_string")]
    pub seed: u64,
    pub duration_days: u32,
    pub snapshot_every_ticks: u64,
    pub notes: Option<String>,
}

impl SimulationConfig {
    pub fn max_ticks(&self) -> u64 {
        u64::from(self.duration_days) * TICKS_PER_DAY
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION_V1.to_string(),
            run_id: "run_local_001".to_string(),
            seed: 1337,
            duration_days: 30,
            snapshot_every_ticks: TICKS_PER_DAY,
            notes: None,
        }
    }
}

impl fmt::Display for SimulationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run_id={} seed={} max_ticks={} snapshot_every={}",
            self.run_id,
            self.seed,
            self.max_ticks(),
            self.snapshot_every_ticks
        )
    }
}
