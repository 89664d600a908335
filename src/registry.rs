//! Entity registry
//!
//! The authoritative actor set. Every participant in a simulation (player,
//! enemies, live projectiles) is one entity carrying an [`Actor`] component
//! and a `Transform`. Spawns and despawns are observed by systems here and
//! turned into ordered log records; despawn of dead actors is deferred by a
//! configurable grace period so event consumers always see the death first.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::combat::components::{SimConfig, TickClock};
use crate::combat::events::{DespawnedEvent, SpawnedEvent};
use crate::combat::log::{EventKind, EventLog};

/// What kind of participant an entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy,
    Projectile,
}

impl EntityKind {
    pub fn name(&self) -> &'static str {
        match self {
            EntityKind::Player => "player",
            EntityKind::Enemy => "enemy",
            EntityKind::Projectile => "projectile",
        }
    }
}

/// Core stats and liveness for one registered actor.
///
/// Health is only ever mutated by the damage application system; `alive`
/// flips to false exactly once, when health first reaches 0.
#[derive(Component, Debug, Clone)]
pub struct Actor {
    pub kind: EntityKind,
    /// Stable display name, used as the actor's identity in log records.
    pub name: String,
    pub max_health: u32,
    pub health: u32,
    pub stamina: u32,
    pub attack_power: u32,
    /// World units per second.
    pub move_speed: f32,
    /// Minimum ticks between successful attacks.
    pub attack_cooldown: u32,
    /// Tick of the last attack that passed the cooldown gate.
    pub last_attack_tick: Option<u64>,
    pub alive: bool,
    pub damage_dealt: u32,
    pub damage_taken: u32,
}

impl Actor {
    pub fn new(kind: EntityKind, name: impl Into<String>, max_health: u32, attack_power: u32) -> Self {
        Self {
            kind,
            name: name.into(),
            max_health,
            health: max_health,
            stamina: 100,
            attack_power,
            move_speed: 5.0,
            attack_cooldown: 10,
            last_attack_tick: None,
            alive: true,
            damage_dealt: 0,
            damage_taken: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.alive && self.health > 0
    }

    /// Whether enough ticks have elapsed since the last successful attack.
    pub fn cooldown_ready(&self, now: u64, cooldown: u32) -> bool {
        match self.last_attack_tick {
            None => true,
            Some(last) => now.saturating_sub(last) >= u64::from(cooldown),
        }
    }
}

/// Marks an actor scheduled for removal at a future tick.
#[derive(Component, Debug, Clone, Copy)]
pub struct Despawning {
    pub remove_at: u64,
}

/// Grace-period despawn scheduling for an actor that just died.
pub fn grace_period_despawning(config: &SimConfig, now: u64) -> Despawning {
    Despawning {
        remove_at: now + config.despawn_grace_ticks,
    }
}

/// Record every actor that entered the world this tick. Batch is sorted by
/// entity index so spawn records are tick-stable.
pub fn record_spawns(
    clock: Res<TickClock>,
    mut log: ResMut<EventLog>,
    mut spawned: EventWriter<SpawnedEvent>,
    query: Query<(Entity, &Actor), Added<Actor>>,
) {
    let mut batch: Vec<(Entity, &Actor)> = query.iter().collect();
    batch.sort_by_key(|(entity, _)| entity.index());
    for (entity, actor) in batch {
        log.record(
            clock.tick,
            EventKind::Spawned {
                kind: actor.kind,
                name: actor.name.clone(),
            },
            format!("{} spawned", actor.name),
        );
        spawned.send(SpawnedEvent {
            entity,
            kind: actor.kind,
            tick: clock.tick,
        });
    }
}

/// Remove actors whose grace period has elapsed, recording the despawn.
pub fn despawn_after_grace(
    mut commands: Commands,
    clock: Res<TickClock>,
    mut log: ResMut<EventLog>,
    mut despawned: EventWriter<DespawnedEvent>,
    query: Query<(Entity, &Actor, &Despawning)>,
) {
    let mut batch: Vec<(Entity, &Actor, &Despawning)> = query.iter().collect();
    batch.sort_by_key(|(entity, _, _)| entity.index());
    for (entity, actor, despawning) in batch {
        if clock.tick < despawning.remove_at {
            continue;
        }
        log.record(
            clock.tick,
            EventKind::Despawned {
                kind: actor.kind,
                name: actor.name.clone(),
            },
            format!("{} despawned", actor.name),
        );
        despawned.send(DespawnedEvent {
            entity,
            kind: actor.kind,
            tick: clock.tick,
        });
        commands.entity(entity).despawn();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cooldown_gate_respects_elapsed_ticks() {
        let mut actor = Actor::new(EntityKind::Enemy, "grunt", 60, 8);
        actor.attack_cooldown = 10;
        assert!(actor.cooldown_ready(1, 10));

        actor.last_attack_tick = Some(5);
        assert!(!actor.cooldown_ready(5, 10));
        assert!(!actor.cooldown_ready(14, 10));
        assert!(actor.cooldown_ready(15, 10));
    }

    #[test]
    fn grace_period_schedules_relative_to_now() {
        let config = SimConfig {
            despawn_grace_ticks: 30,
            ..SimConfig::default()
        };
        let despawning = grace_period_despawning(&config, 100);
        assert_eq!(despawning.remove_at, 130);
    }
}
