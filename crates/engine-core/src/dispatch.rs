//! Event routing: a registered handler table keyed by emission label.
//!
//! Handlers return [`EngineCommand`]s instead of calling back into the
//! engine, so dispatch stays re-entrancy-safe during an update pass. The
//! router can be checked against a catalog at startup so an unhandled label
//! is a boot-time finding, not a silent runtime gap.

use std::collections::BTreeMap;

use contracts::EngineCommand;
use tracing::warn;

use crate::engine::EventSink;
use crate::template::TemplateCatalog;

pub type EventHandler = Box<dyn FnMut(&str, Option<&str>) -> Vec<EngineCommand>>;

#[derive(Default)]
pub struct EventRouter {
    handlers: BTreeMap<String, EventHandler>,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(
        &mut self,
        label: impl Into<String>,
        handler: impl FnMut(&str, Option<&str>) -> Vec<EngineCommand> + 'static,
    ) -> &mut Self {
        self.handlers.insert(label.into(), Box::new(handler));
        self
    }

    pub fn handles(&self, label: &str) -> bool {
        self.handlers.contains_key(label)
    }

    /// Every emission label the catalog can produce must have a handler.
    /// Returns the sorted missing labels otherwise.
    pub fn verify_coverage(&self, catalog: &TemplateCatalog) -> Result<(), Vec<String>> {
        let missing = catalog
            .emission_labels()
            .into_iter()
            .filter(|label| !self.handlers.contains_key(label))
            .collect::<Vec<_>>();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(missing)
        }
    }
}

impl EventSink for EventRouter {
    fn handle(&mut self, label: &str, owner: Option<&str>) -> Vec<EngineCommand> {
        match self.handlers.get_mut(label) {
            Some(handler) => handler(label, owner),
            None => {
                warn!(label, "no handler registered for emitted label");
                Vec::new()
            }
        }
    }
}
