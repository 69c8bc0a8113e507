//! Stochastic finite-state process engine for a narrative economy.
//!
//! A population of actor-bound and global processes each follow a named
//! template: a mean firing period plus weighted emission and transition
//! distributions. The engine keeps every live process in a registry that is
//! always 1:1 with a time-ordered trigger schedule, fires due processes on
//! each host tick (contextualize, emit, transition, replace-or-reschedule),
//! heals drifted or orphaned entries, and snapshots the schedule exactly.
//!
//! All randomness flows through a seeded [`rng::SimRng`], so identical seeds
//! and inputs replay identical event sequences.

pub mod dispatch;
pub mod distribution;
pub mod engine;
pub mod instance;
pub mod jitter;
pub mod rng;
pub mod template;

pub use dispatch::EventRouter;
pub use distribution::{WeightKind, WeightTable};
pub use engine::{
    ActorDirectory, ContextModifier, EventSink, NoContext, ProcessEngine, UpdateMetrics,
};
pub use instance::ProcessInstance;
pub use rng::SimRng;
pub use template::TemplateCatalog;
