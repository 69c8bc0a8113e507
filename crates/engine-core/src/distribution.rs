//! Weighted outcome distributions with a reserved empty outcome.
//!
//! Every distribution keeps a `residual` slot alongside its labeled weights:
//! the probability of the reserved empty label ("no emission" for emissions,
//! "remain in the current template" for transitions). After renormalization
//! the labeled weights plus the residual always sum to 1.

use std::collections::BTreeMap;

use crate::rng::SimRng;

/// Tolerance when deciding whether a labeled weight sum exceeds 1. Keeping a
/// small band here makes renormalization idempotent: a rescaled table whose
/// sum lands within a few ulps of 1 is not rescaled again.
const NORMALIZE_EPS: f64 = 1e-9;

/// Which of an instance's two distributions an adjustment targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightKind {
    Transitions,
    Emissions,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeightTable {
    weights: BTreeMap<String, f64>,
    residual: f64,
}

impl WeightTable {
    /// Table whose only outcome is the empty label.
    pub fn empty() -> Self {
        Self {
            weights: BTreeMap::new(),
            residual: 1.0,
        }
    }

    /// Working copy seeded from a template's base weights. Non-positive
    /// weights are dropped; the residual is settled by the next
    /// [`WeightTable::renormalize`].
    pub fn from_base(base: &BTreeMap<String, f64>) -> Self {
        let weights = base
            .iter()
            .filter(|(_, weight)| **weight > 0.0)
            .map(|(label, weight)| (label.clone(), *weight))
            .collect::<BTreeMap<_, _>>();
        Self {
            weights,
            residual: 0.0,
        }
    }

    /// Upsert a label's weight; a non-positive weight deletes the label.
    pub fn set_weight(&mut self, label: &str, weight: f64) {
        if weight <= 0.0 {
            self.weights.remove(label);
        } else {
            self.weights.insert(label.to_string(), weight);
        }
    }

    /// Rescale so all outcomes (labels plus the empty residual) sum to 1.
    ///
    /// If the labeled sum exceeds 1 the labels are scaled down proportionally
    /// and the residual drops to 0; otherwise the residual absorbs the slack.
    pub fn renormalize(&mut self) {
        let sum: f64 = self.weights.values().sum();
        if sum > 1.0 + NORMALIZE_EPS {
            for weight in self.weights.values_mut() {
                *weight /= sum;
            }
            self.residual = 0.0;
        } else {
            self.residual = (1.0 - sum).max(0.0);
        }
    }

    pub fn weight(&self, label: &str) -> Option<f64> {
        self.weights.get(label).copied()
    }

    pub fn residual_weight(&self) -> f64 {
        self.residual
    }

    /// Sum over every outcome, empty label included.
    pub fn total(&self) -> f64 {
        self.weights.values().sum::<f64>() + self.residual
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    pub fn is_empty_only(&self) -> bool {
        self.weights.is_empty()
    }

    /// Draw one outcome. `None` is the reserved empty label.
    ///
    /// Walks labels in stable (sorted) order, decrementing the draw by each
    /// weight. The residual is the final stop; if cumulative floating error
    /// leaves the draw unclaimed and the residual is zero, the last label
    /// visited wins. Sampling never fails.
    pub fn sample(&self, rng: &mut SimRng) -> Option<&str> {
        let mut draw = rng.next_f64();
        let mut last_visited = None;
        for (label, weight) in &self.weights {
            if draw <= *weight {
                return Some(label);
            }
            draw -= weight;
            last_visited = Some(label.as_str());
        }
        if self.residual > 0.0 {
            None
        } else {
            last_visited
        }
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        Self::empty()
    }
}
