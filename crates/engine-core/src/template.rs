//! Immutable template definitions, keyed by name.

use std::collections::{BTreeMap, BTreeSet};

use contracts::ProcessTemplate;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateCatalog {
    templates: BTreeMap<String, ProcessTemplate>,
}

impl TemplateCatalog {
    pub fn new(templates: Vec<ProcessTemplate>) -> Self {
        let mut catalog = Self::default();
        for template in templates {
            catalog.insert(template);
        }
        catalog
    }

    /// Insert a template, sanitizing it first: negative weights are clamped
    /// to zero and non-positive periods reset to one tick, each with a
    /// warning. Loading never fails.
    pub fn insert(&mut self, mut template: ProcessTemplate) {
        for (label, weight) in template
            .transitions
            .iter_mut()
            .chain(template.emissions.iter_mut())
        {
            if *weight < 0.0 {
                warn!(
                    template = %template.name,
                    label = %label,
                    weight,
                    "negative weight clamped to zero"
                );
                *weight = 0.0;
            }
        }
        if template.mean_period_ticks <= 0.0 {
            warn!(
                template = %template.name,
                period = template.mean_period_ticks,
                "non-positive mean period reset to one tick"
            );
            template.mean_period_ticks = 1.0;
        }
        self.templates.insert(template.name.clone(), template);
    }

    pub fn lookup(&self, name: &str) -> Option<&ProcessTemplate> {
        self.templates.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Union of emission labels across all templates; the set an event
    /// router must cover.
    pub fn emission_labels(&self) -> BTreeSet<String> {
        self.templates
            .values()
            .flat_map(|template| template.emissions.keys().cloned())
            .collect()
    }

    /// The stock organization-narrative templates used by the CLI and the
    /// integration suite.
    pub fn default_catalog() -> Self {
        Self::new(vec![
            ProcessTemplate::new("rumor_mill", 12.0)
                .with_emission("whisper", 0.25)
                .with_emission("scandal", 0.05)
                .with_transition("feud", 0.08),
            ProcessTemplate::new("audit", 48.0)
                .with_emission("audit_finding", 0.35)
                .with_emission("commendation", 0.1),
            ProcessTemplate::new("fund_drive", 24.0)
                .with_emission("windfall", 0.2)
                .with_emission("shortfall", 0.1)
                .with_transition("rumor_mill", 0.05),
            ProcessTemplate::new("feud", 8.0)
                .with_emission("public_clash", 0.45)
                .with_transition("rumor_mill", 0.3),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_weights_are_clamped() {
        let catalog = TemplateCatalog::new(vec![ProcessTemplate::new("edge", 4.0)
            .with_emission("good", 0.5)
            .with_emission("bad", -0.5)]);
        let template = catalog.lookup("edge").expect("template present");
        assert_eq!(template.emissions["bad"], 0.0);
        assert_eq!(template.emissions["good"], 0.5);
    }

    #[test]
    fn non_positive_period_resets() {
        let catalog = TemplateCatalog::new(vec![ProcessTemplate::new("stuck", 0.0)]);
        assert_eq!(catalog.lookup("stuck").unwrap().mean_period_ticks, 1.0);
    }

    #[test]
    fn emission_labels_union_across_templates() {
        let labels = TemplateCatalog::default_catalog().emission_labels();
        for expected in [
            "whisper",
            "scandal",
            "audit_finding",
            "commendation",
            "windfall",
            "shortfall",
            "public_clash",
        ] {
            assert!(labels.contains(expected), "missing {expected}");
        }
    }

    #[test]
    fn default_catalog_transition_targets_exist() {
        let catalog = TemplateCatalog::default_catalog();
        for name in catalog.names().collect::<Vec<_>>() {
            let template = catalog.lookup(name).unwrap();
            for target in template.transitions.keys() {
                assert!(catalog.contains(target), "{name} -> {target} dangles");
            }
        }
    }
}
