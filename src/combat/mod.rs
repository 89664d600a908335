//! Core simulation plumbing: tick phases, events, resources, system wiring.

pub mod components;
pub mod events;
pub mod log;
pub mod projectiles;
pub mod resolver;

use bevy::prelude::*;

use crate::behavior::evaluate_behaviors;
use crate::combat::components::{
    advance_clock, check_tick_budget, start_tick_stopwatch, GameRng, IntentQueue, SimConfig,
    TickClock, TickStopwatch,
};
use crate::combat::events::{DamageEvent, DespawnedEvent, DiedEvent, SpawnedEvent};
use crate::combat::log::EventLog;
use crate::combat::projectiles::{projectile_hits, step_projectiles};
use crate::combat::resolver::{apply_damage_events, apply_movement, resolve_attack_intents};
use crate::registry::{despawn_after_grace, record_spawns};
use crate::spatial::{rebuild_spatial_snapshot, SpatialSnapshot};

/// The phases of one simulation tick, run strictly in order.
///
/// Behavior reads only the Snapshot-phase view of the world; all registry
/// mutation happens in Resolve and Commit. Deferred commands flush between
/// phases.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TickPhase {
    /// Clock advance, stopwatch start, spatial snapshot rebuild.
    Snapshot,
    /// Behavior evaluation and player input; intent collection only.
    Behavior,
    /// Intent and projectile resolution; emits damage events.
    Resolve,
    /// Damage application, movement, spawn/despawn bookkeeping.
    Commit,
    /// End-of-tick reporting and scenario checks.
    Flush,
}

/// Configure the phase ordering with command flushes between phases.
pub fn configure_tick_phases(app: &mut App) {
    app.configure_sets(
        Update,
        (
            TickPhase::Snapshot,
            TickPhase::Behavior,
            TickPhase::Resolve,
            TickPhase::Commit,
            TickPhase::Flush,
        )
            .chain(),
    );

    app.add_systems(Update, apply_deferred.after(TickPhase::Behavior).before(TickPhase::Resolve));
    app.add_systems(Update, apply_deferred.after(TickPhase::Resolve).before(TickPhase::Commit));
    app.add_systems(Update, apply_deferred.after(TickPhase::Commit).before(TickPhase::Flush));
}

/// Register the core per-tick systems in their phases.
pub fn add_core_sim_systems(app: &mut App) {
    app.add_systems(
        Update,
        (advance_clock, start_tick_stopwatch, rebuild_spatial_snapshot)
            .chain()
            .in_set(TickPhase::Snapshot),
    );
    app.add_systems(Update, evaluate_behaviors.in_set(TickPhase::Behavior));
    app.add_systems(
        Update,
        (resolve_attack_intents, step_projectiles, projectile_hits)
            .chain()
            .in_set(TickPhase::Resolve),
    );
    app.add_systems(
        Update,
        (
            apply_damage_events,
            apply_movement,
            record_spawns,
            despawn_after_grace,
        )
            .chain()
            .in_set(TickPhase::Commit),
    );
    app.add_systems(Update, check_tick_budget.in_set(TickPhase::Flush));
}

/// Everything a simulation world needs: events, resources, tick systems.
/// Embedders add their own input and end-condition systems on top.
pub struct SimCorePlugin;

impl Plugin for SimCorePlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<DamageEvent>()
            .add_event::<DiedEvent>()
            .add_event::<SpawnedEvent>()
            .add_event::<DespawnedEvent>()
            .init_resource::<TickClock>()
            .init_resource::<IntentQueue>()
            .init_resource::<SpatialSnapshot>()
            .init_resource::<EventLog>()
            .init_resource::<TickStopwatch>()
            .init_resource::<SimConfig>()
            .init_resource::<GameRng>();

        configure_tick_phases(app);
        add_core_sim_systems(app);
    }
}
