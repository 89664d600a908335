//! Skirmish - deterministic combat and enemy AI simulation core
//!
//! A headless, fixed-timestep combat core for a 3D action game: an entity
//! registry, a per-tick spatial snapshot, an intent-driven combat resolver,
//! per-enemy behavior state machines, and an ordered event log. Everything
//! that happens in a seeded run is reproducible tick for tick.

pub mod archetypes;
pub mod behavior;
pub mod cli;
pub mod combat;
pub mod headless;
pub mod registry;
pub mod spatial;

pub use archetypes::{ArchetypeDefinitions, ArchetypePlugin};
pub use combat::components::{SimConfig, TickClock, TICK_DT};
pub use combat::log::{EventKind, EventLog, EventRecord};
pub use combat::{SimCorePlugin, TickPhase};
pub use headless::config::ScenarioConfig;
pub use headless::runner::{run_scenario, Outcome, ScenarioOutcome};
pub use registry::{Actor, EntityKind};
