//! Projectile stepping and hit resolution
//!
//! Projectiles are registered actors with no hit volume: they query the
//! snapshot, they are never targets. Each tick a live projectile advances by
//! its velocity, then the first living non-source actor it overlaps takes
//! one damage event and the projectile is removed.

use bevy::prelude::*;

use crate::combat::components::{SimConfig, TickClock, TICK_DT};
use crate::combat::events::DamageEvent;
use crate::registry::{Actor, Despawning};
use crate::spatial::{SpatialSnapshot, Volume};

#[derive(Component, Debug, Clone, Copy)]
pub struct Projectile {
    /// The attacker, credited for any damage and excluded from hits.
    pub source: Entity,
    /// World units per second.
    pub velocity: Vec3,
    pub ttl_remaining: u32,
    pub hit_radius: f32,
    /// Rolled at launch, so in-flight damage is fixed.
    pub base_damage: u32,
}

/// Advance every live projectile and expire the ones that run out of time
/// or leave the arena. Expiry kills the projectile actor immediately so hit
/// resolution later in the same tick skips it.
pub fn step_projectiles(
    clock: Res<TickClock>,
    config: Res<SimConfig>,
    mut projectiles: Query<(Entity, &mut Actor, &mut Projectile, &mut Transform)>,
    mut commands: Commands,
) {
    let mut batch: Vec<Entity> = projectiles
        .iter()
        .filter(|(_, actor, _, _)| actor.is_alive())
        .map(|(entity, _, _, _)| entity)
        .collect();
    batch.sort_by_key(|entity| entity.index());

    for entity in batch {
        let Ok((_, mut actor, mut projectile, mut transform)) = projectiles.get_mut(entity) else {
            continue;
        };
        transform.translation += projectile.velocity * TICK_DT;
        projectile.ttl_remaining = projectile.ttl_remaining.saturating_sub(1);

        if projectile.ttl_remaining == 0 || !config.in_bounds(transform.translation) {
            actor.alive = false;
            commands.entity(entity).insert(Despawning {
                remove_at: clock.tick,
            });
        }
    }
}

/// Resolve projectile hits against the snapshot at the post-step position.
/// First living non-source overlap wins; the projectile dies with it.
pub fn projectile_hits(
    clock: Res<TickClock>,
    snapshot: Res<SpatialSnapshot>,
    mut projectiles: Query<(Entity, &mut Actor, &Projectile, &Transform), Without<Despawning>>,
    targets: Query<&Actor, Without<Projectile>>,
    mut damage_events: EventWriter<DamageEvent>,
    mut commands: Commands,
) {
    let mut batch: Vec<Entity> = projectiles
        .iter()
        .filter(|(_, actor, _, _)| actor.is_alive())
        .map(|(entity, _, _, _)| entity)
        .collect();
    batch.sort_by_key(|entity| entity.index());

    for entity in batch {
        let Ok((_, mut actor, projectile, transform)) = projectiles.get_mut(entity) else {
            continue;
        };
        let probe = Volume::Sphere {
            center: transform.translation,
            radius: projectile.hit_radius,
        };
        for candidate in snapshot.overlapping(&probe, Some(projectile.source)) {
            let Ok(target) = targets.get(candidate) else {
                continue;
            };
            if !target.is_alive() {
                continue;
            }
            damage_events.send(DamageEvent {
                source: projectile.source,
                target: candidate,
                amount: projectile.base_damage,
                tick: clock.tick,
            });
            actor.alive = false;
            commands.entity(entity).insert(Despawning {
                remove_at: clock.tick,
            });
            break;
        }
    }
}
