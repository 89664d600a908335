//! Combat events
//!
//! Defines the events the simulation emits for processing and for external
//! consumers (rendering, UI, persistence). Each also lands in the `EventLog`
//! as an ordered record.

use bevy::prelude::*;

use crate::registry::EntityKind;

/// Fired when damage is resolved against a target.
///
/// Immutable once emitted. `apply_damage_events` is the only code path that
/// mutates health from one of these.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageEvent {
    /// Entity dealing the damage (the original attacker for projectiles).
    pub source: Entity,
    /// Entity receiving the damage.
    pub target: Entity,
    /// Damage amount before clamping at the target's remaining health.
    pub amount: u32,
    /// Tick the damage was resolved on.
    pub tick: u64,
}

/// Fired exactly once when an actor's health first reaches 0.
#[derive(Event, Debug, Clone, Copy)]
pub struct DiedEvent {
    pub victim: Entity,
    /// Entity that dealt the killing blow.
    pub killer: Entity,
    pub tick: u64,
}

/// Fired when an actor enters the world.
#[derive(Event, Debug, Clone, Copy)]
pub struct SpawnedEvent {
    pub entity: Entity,
    pub kind: EntityKind,
    pub tick: u64,
}

/// Fired when an actor is removed from the world.
#[derive(Event, Debug, Clone, Copy)]
pub struct DespawnedEvent {
    pub entity: Entity,
    pub kind: EntityKind,
    pub tick: u64,
}
