//! Registry and trigger schedule for live narrative processes.
//!
//! The engine owns two maps that are always 1:1 at every public-API
//! boundary: the registry (key → live instance) and the schedule (key →
//! absolute next-fire tick). All mutation flows through the engine; external
//! collaborators reach it only via the traits below and deferred
//! [`EngineCommand`]s.

mod snapshot;
mod update;


use std::collections::{BTreeMap, BTreeSet};

use contracts::{EngineCommand, ProcessKey};
use tracing::warn;

use crate::instance::ProcessInstance;
use crate::jitter;
use crate::rng::SimRng;
use crate::template::TemplateCatalog;

/// Resolves owner ids to living actors; unresolvable owners get their
/// processes purged at fire time.
pub trait ActorDirectory {
    fn resolve(&self, owner: &str) -> bool;
}

/// The simplest useful directory: a set of known actor ids.
impl ActorDirectory for BTreeSet<String> {
    fn resolve(&self, owner: &str) -> bool {
        self.contains(owner)
    }
}

/// Reweights a due instance immediately before it samples, and supplies the
/// urgency scalar applied to its next period.
pub trait ContextModifier {
    fn apply(&mut self, instance: &mut ProcessInstance);

    fn urgency_factor(&self, _key: &ProcessKey) -> f64 {
        1.0
    }
}

/// Context pass that leaves every instance untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContext;

impl ContextModifier for NoContext {
    fn apply(&mut self, _instance: &mut ProcessInstance) {}
}

/// Receives non-empty emission labels. Returned commands are the only way a
/// handler may mutate the engine: unregistrations apply within the current
/// pass, registrations at the start of the next one.
pub trait EventSink {
    fn handle(&mut self, label: &str, owner: Option<&str>) -> Vec<EngineCommand>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateMetrics {
    pub fired: u64,
    pub emitted: u64,
    pub purged: u64,
    pub replaced: u64,
    pub rescheduled: u64,
    pub drift_repairs: u64,
    pub commands_applied: u64,
}

#[derive(Debug)]
pub struct ProcessEngine {
    templates: TemplateCatalog,
    registry: BTreeMap<ProcessKey, ProcessInstance>,
    schedule: BTreeMap<ProcessKey, u64>,
    /// Cached `min(schedule)`; `None` means nothing is live and no wake is
    /// needed.
    next_wake_tick: Option<u64>,
    rng: SimRng,
    pending_commands: Vec<EngineCommand>,
    last_update_metrics: UpdateMetrics,
}

impl ProcessEngine {
    pub fn new(templates: TemplateCatalog, seed: u64) -> Self {
        Self {
            templates,
            registry: BTreeMap::new(),
            schedule: BTreeMap::new(),
            next_wake_tick: None,
            rng: SimRng::new(seed),
            pending_commands: Vec::new(),
            last_update_metrics: UpdateMetrics::default(),
        }
    }

    /// Register a process for `(owner, template)`, scheduled one jittered
    /// period after `now`. Idempotent: a live key is left untouched. An
    /// unknown template registers a self-loop fallback instead of failing.
    pub fn register(&mut self, template: &str, owner: Option<&str>, now: u64) -> ProcessKey {
        self.register_inner(template, owner, None, now)
    }

    /// Register with an explicit first fire tick (persistence restore,
    /// scripted scenarios).
    pub fn register_at(&mut self, template: &str, owner: Option<&str>, fire_tick: u64) -> ProcessKey {
        self.register_inner(template, owner, Some(fire_tick), 0)
    }

    fn register_inner(
        &mut self,
        template: &str,
        owner: Option<&str>,
        explicit_tick: Option<u64>,
        now: u64,
    ) -> ProcessKey {
        let key = match owner {
            Some(owner) => ProcessKey::owned(owner, template),
            None => ProcessKey::global(template),
        };
        if self.registry.contains_key(&key) {
            return key;
        }
        let instance = match self.templates.lookup(template) {
            Some(found) => ProcessInstance::from_template(key.clone(), found),
            None => {
                warn!(key = %key, "unknown template, registering self-loop fallback");
                ProcessInstance::fallback(key.clone())
            }
        };
        let fire_tick = match explicit_tick {
            Some(tick) => tick,
            None => now + jitter::period_ticks(instance.mean_period_ticks(), 1.0, &mut self.rng),
        };
        self.registry.insert(key.clone(), instance);
        self.schedule.insert(key.clone(), fire_tick);
        self.refresh_next_wake();
        key
    }

    /// Remove a process from both maps. Safe to call for an absent key.
    pub fn unregister(&mut self, key: &ProcessKey) -> bool {
        let removed = self.registry.remove(key).is_some();
        self.schedule.remove(key);
        if removed {
            self.refresh_next_wake();
        }
        removed
    }

    /// Queue a command for the start of the next update pass.
    pub fn enqueue_command(&mut self, command: EngineCommand) {
        self.pending_commands.push(command);
    }

    fn apply_command(&mut self, command: EngineCommand, now: u64) {
        match command {
            EngineCommand::Register {
                template,
                owner,
                at_tick,
            } => {
                self.register_inner(&template, owner.as_deref(), at_tick, now);
            }
            EngineCommand::Unregister { key } => {
                self.unregister(&key);
            }
        }
    }

    fn refresh_next_wake(&mut self) {
        self.next_wake_tick = self.schedule.values().copied().min();
    }

    pub fn contains(&self, key: &ProcessKey) -> bool {
        self.registry.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &ProcessKey> {
        self.registry.keys()
    }

    pub fn instance(&self, key: &ProcessKey) -> Option<&ProcessInstance> {
        self.registry.get(key)
    }

    pub fn fire_tick(&self, key: &ProcessKey) -> Option<u64> {
        self.schedule.get(key).copied()
    }

    pub fn next_wake_tick(&self) -> Option<u64> {
        self.next_wake_tick
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub fn pending_command_count(&self) -> usize {
        self.pending_commands.len()
    }

    pub fn last_update_metrics(&self) -> UpdateMetrics {
        self.last_update_metrics
    }
}
