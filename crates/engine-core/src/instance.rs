//! A live process: a template bound to an (optional) owner with mutable
//! working copies of the template's weight tables.

use contracts::{ProcessKey, ProcessTemplate, TICKS_PER_DAY};

use crate::distribution::{WeightKind, WeightTable};
use crate::rng::SimRng;

/// Mean period assigned to fallback instances registered against a template
/// name the catalog does not know.
const FALLBACK_PERIOD_TICKS: f64 = TICKS_PER_DAY as f64;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessInstance {
    key: ProcessKey,
    mean_period_ticks: f64,
    transitions: WeightTable,
    emissions: WeightTable,
    /// Set by any weight adjustment; cleared by renormalization. Sampling
    /// renormalizes lazily so callers can batch adjustments.
    dirty: bool,
}

impl ProcessInstance {
    pub fn from_template(key: ProcessKey, template: &ProcessTemplate) -> Self {
        let mut instance = Self {
            key,
            mean_period_ticks: template.mean_period_ticks,
            transitions: WeightTable::empty(),
            emissions: WeightTable::empty(),
            dirty: true,
        };
        instance.reload_template(template);
        instance
    }

    /// Trivial instance for an unknown template: never emits, always
    /// self-loops.
    pub fn fallback(key: ProcessKey) -> Self {
        Self {
            key,
            mean_period_ticks: FALLBACK_PERIOD_TICKS,
            transitions: WeightTable::empty(),
            emissions: WeightTable::empty(),
            dirty: false,
        }
    }

    /// Reset the working tables to the template's base weights.
    pub fn reload_template(&mut self, template: &ProcessTemplate) {
        self.mean_period_ticks = template.mean_period_ticks;
        self.transitions = WeightTable::from_base(&template.transitions);
        self.emissions = WeightTable::from_base(&template.emissions);
        self.dirty = true;
    }

    /// Upsert (or delete, when the weight is zero) one label's weight.
    /// Renormalization is deferred until the next sample.
    pub fn adjust_weight(&mut self, kind: WeightKind, label: &str, weight: f64) {
        match kind {
            WeightKind::Transitions => self.transitions.set_weight(label, weight),
            WeightKind::Emissions => self.emissions.set_weight(label, weight),
        }
        self.dirty = true;
    }

    pub fn renormalize(&mut self) {
        self.transitions.renormalize();
        self.emissions.renormalize();
        self.dirty = false;
    }

    fn ensure_normalized(&mut self) {
        if self.dirty {
            self.renormalize();
        }
    }

    /// Sample one emission label; `None` means no event this firing.
    pub fn sample_emission(&mut self, rng: &mut SimRng) -> Option<String> {
        self.ensure_normalized();
        self.emissions.sample(rng).map(str::to_string)
    }

    /// Sample the next template name. The empty label maps back to this
    /// instance's own template (self-loop).
    pub fn sample_transition(&mut self, rng: &mut SimRng) -> String {
        self.ensure_normalized();
        match self.transitions.sample(rng) {
            Some(label) => label.to_string(),
            None => self.key.template.clone(),
        }
    }

    pub fn key(&self) -> &ProcessKey {
        &self.key
    }

    pub fn template_name(&self) -> &str {
        &self.key.template
    }

    pub fn owner(&self) -> Option<&str> {
        self.key.owner.as_deref()
    }

    pub fn mean_period_ticks(&self) -> f64 {
        self.mean_period_ticks
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn transitions(&self) -> &WeightTable {
        &self.transitions
    }

    pub fn emissions(&self) -> &WeightTable {
        &self.emissions
    }
}
