//! Combat resolver
//!
//! Turns queued attack intents into damage events and projectile spawns,
//! then applies the damage. `apply_damage_events` is the only place in the
//! crate that mutates health.

use bevy::prelude::*;
use std::collections::HashSet;

use crate::combat::components::{
    AttackKind, GameRng, IntentQueue, SimConfig, TickClock, TICK_DT,
};
use crate::combat::events::{DamageEvent, DiedEvent};
use crate::combat::log::{EventKind, EventLog};
use crate::combat::projectiles::Projectile;
use crate::registry::{grace_period_despawning, Actor, EntityKind};
use crate::spatial::{SpatialSnapshot, Volume};

/// Roll the damage for one hit. Deterministic unless a variance fraction is
/// configured, in which case the seeded RNG perturbs the base by up to
/// ±variance.
pub fn roll_damage(base: u32, config: &SimConfig, rng: &mut GameRng) -> u32 {
    match config.damage_variance {
        None => base,
        Some(variance) => {
            let factor = rng.random_range(1.0 - variance, 1.0 + variance);
            ((base as f32 * factor).round() as u32).max(1)
        }
    }
}

/// Consume all queued attack intents for this tick.
///
/// Malformed intents are discarded with a log record; cooldown-gated intents
/// are dropped silently. Melee intents resolve immediately against the
/// tick-start snapshot; projectile intents spawn a projectile actor that
/// resolves on later ticks.
pub fn resolve_attack_intents(
    mut commands: Commands,
    clock: Res<TickClock>,
    config: Res<SimConfig>,
    snapshot: Res<SpatialSnapshot>,
    mut queue: ResMut<IntentQueue>,
    mut rng: ResMut<GameRng>,
    mut log: ResMut<EventLog>,
    mut damage_events: EventWriter<DamageEvent>,
    mut actors: Query<(&mut Actor, &Transform)>,
) {
    // Intents must resolve against the snapshot taken at the start of this
    // same tick, never a stale one.
    debug_assert_eq!(snapshot.tick(), clock.tick);

    for intent in queue.drain_attacks() {
        // Attacker state is read on copies so target lookups below can
        // borrow the query immutably.
        let (attacker_name, attacker_pos, attack_power, ready, alive) =
            match actors.get(intent.actor) {
                Ok((actor, transform)) => (
                    actor.name.clone(),
                    transform.translation,
                    actor.attack_power,
                    actor.cooldown_ready(clock.tick, intent.cooldown_at_issue),
                    actor.is_alive(),
                ),
                Err(_) => {
                    // Attacker despawned between issue and resolve.
                    warn!("dropping attack intent from despawned entity {:?}", intent.actor);
                    continue;
                }
            };

        if !alive {
            debug!("dropping attack intent from dead actor {}", attacker_name);
            continue;
        }

        if let Err(err) = intent.validate() {
            log.record(
                clock.tick,
                EventKind::IntentDropped {
                    actor: attacker_name.clone(),
                    reason: err.to_string(),
                },
                format!("dropped intent from {}: {}", attacker_name, err),
            );
            continue;
        }

        if !ready {
            debug!("{} attack still on cooldown at tick {}", attacker_name, clock.tick);
            continue;
        }

        match intent.kind {
            AttackKind::Melee { reach } => {
                let swing = Volume::Sphere {
                    center: attacker_pos,
                    radius: reach,
                };
                let mut hit_this_swing: HashSet<Entity> = HashSet::new();
                for target in snapshot.overlapping(&swing, Some(intent.actor)) {
                    if !hit_this_swing.insert(target) {
                        continue;
                    }
                    let Ok((target_actor, _)) = actors.get(target) else {
                        warn!("melee target {:?} despawned mid-tick", target);
                        continue;
                    };
                    if !target_actor.is_alive() {
                        continue;
                    }
                    damage_events.send(DamageEvent {
                        source: intent.actor,
                        target,
                        amount: roll_damage(attack_power, &config, &mut rng),
                        tick: clock.tick,
                    });
                }
            }
            AttackKind::Projectile {
                velocity,
                ttl_ticks,
                hit_radius,
            } => {
                let name = format!("{}-bolt-{}", attacker_name, intent.id.0);
                commands.spawn((
                    Actor::new(EntityKind::Projectile, name, 1, 0),
                    Projectile {
                        source: intent.actor,
                        velocity,
                        ttl_remaining: ttl_ticks,
                        hit_radius,
                        base_damage: roll_damage(attack_power, &config, &mut rng),
                    },
                    Transform::from_translation(attacker_pos),
                ));
            }
        }

        // The attack went through the gate, so the cooldown restarts here
        // even if the swing hit nothing.
        if let Ok((mut actor, _)) = actors.get_mut(intent.actor) {
            actor.last_attack_tick = Some(clock.tick);
        }
    }
}

/// Apply all damage events emitted this tick, in emission order.
///
/// Sole health mutator. Source liveness is re-checked at apply time: damage
/// from an actor that died earlier in the same tick is cancelled.
pub fn apply_damage_events(
    mut commands: Commands,
    clock: Res<TickClock>,
    config: Res<SimConfig>,
    mut log: ResMut<EventLog>,
    mut damage_events: EventReader<DamageEvent>,
    mut died_events: EventWriter<DiedEvent>,
    mut actors: Query<&mut Actor>,
) {
    for event in damage_events.read() {
        let source_name = match actors.get(event.source) {
            Ok(actor) if actor.is_alive() => actor.name.clone(),
            Ok(actor) => {
                debug!("cancelling damage from dead source {}", actor.name);
                continue;
            }
            Err(_) => {
                warn!("cancelling damage from despawned source {:?}", event.source);
                continue;
            }
        };

        let (applied, killing_blow, target_name) = {
            let Ok(mut target) = actors.get_mut(event.target) else {
                warn!("damage target {:?} not found, dropping event", event.target);
                continue;
            };
            if !target.alive {
                // Already dead; later events against the corpse are no-ops.
                continue;
            }
            debug_assert!(target.health <= target.max_health);
            let before = target.health;
            target.health = target.health.saturating_sub(event.amount);
            let applied = before - target.health;
            target.damage_taken += applied;
            let killing_blow = target.health == 0;
            if killing_blow {
                target.alive = false;
            }
            (applied, killing_blow, target.name.clone())
        };

        if let Ok(mut source) = actors.get_mut(event.source) {
            source.damage_dealt += applied;
        }

        log.record(
            event.tick,
            EventKind::Damage {
                source: source_name.clone(),
                target: target_name.clone(),
                amount: applied,
                killing_blow,
            },
            format!("{} hits {} for {}", source_name, target_name, applied),
        );

        if killing_blow {
            log.record(
                event.tick,
                EventKind::Died {
                    victim: target_name.clone(),
                    killer: Some(source_name.clone()),
                },
                format!("{} was slain by {}", target_name, source_name),
            );
            died_events.send(DiedEvent {
                victim: event.target,
                killer: event.source,
                tick: event.tick,
            });
            commands
                .entity(event.target)
                .insert(grace_period_despawning(&config, clock.tick));
        }
    }
}

/// Step queued movement intents, clamped so an actor never overshoots its
/// destination within a tick.
pub fn apply_movement(
    mut queue: ResMut<IntentQueue>,
    mut movers: Query<(&Actor, &mut Transform)>,
) {
    for intent in queue.drain_moves() {
        let Ok((actor, mut transform)) = movers.get_mut(intent.actor) else {
            continue;
        };
        if !actor.is_alive() {
            continue;
        }
        let offset = intent.toward - transform.translation;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            continue;
        }
        let step = (actor.move_speed * TICK_DT).min(distance);
        transform.translation += offset / distance * step;
    }
}
