//! Enemy behavior state machine
//!
//! Each enemy runs a four-state machine (Idle, Chase, Attack, Dead) driven
//! by a pure transition function, evaluated once per tick against the
//! tick-start snapshot. Evaluation only collects intents; the resolver and
//! commit phase do all mutation.

use bevy::prelude::*;

use crate::archetypes::{AttackStyle, ProjectileConfig};
use crate::combat::components::{AttackKind, IntentQueue, TickClock};
use crate::registry::{Actor, EntityKind};
use crate::spatial::SpatialSnapshot;

/// Hysteresis on losing a chase target: the enemy keeps chasing until the
/// target is this factor past its perception radius.
pub const LOSE_INTEREST_FACTOR: f32 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorState {
    Idle,
    Chase,
    Attack,
    /// Absorbing; entered when the actor dies and never left.
    Dead,
}

#[derive(Debug, Clone, Copy)]
pub struct BehaviorParams {
    /// Distance at which an idle enemy notices a target.
    pub perception_radius: f32,
    /// Distance at which a chasing enemy starts attacking.
    pub attack_radius: f32,
}

/// Per-enemy behavior component.
#[derive(Component, Debug, Clone)]
pub struct Behavior {
    pub state: BehaviorState,
    pub last_transition_tick: u64,
    pub params: BehaviorParams,
    pub attack_style: AttackStyle,
    pub projectile: Option<ProjectileConfig>,
    pub attack_reach: f32,
}

impl Behavior {
    pub fn new(params: BehaviorParams, attack_style: AttackStyle, attack_reach: f32) -> Self {
        Self {
            state: BehaviorState::Idle,
            last_transition_tick: 0,
            params,
            attack_style,
            projectile: None,
            attack_reach,
        }
    }
}

/// What the state machine wants done this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannedAction {
    Attack,
    MoveTowardTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub next: BehaviorState,
    pub action: Option<PlannedAction>,
}

/// The transition function. Pure: same inputs, same decision.
///
/// `distance` is to the nearest living target, `None` when no living target
/// exists. An attack is only planned from an established Attack state, never
/// on the tick that enters it.
pub fn next_state(
    state: BehaviorState,
    alive: bool,
    distance: Option<f32>,
    params: &BehaviorParams,
    cooldown_ready: bool,
) -> Decision {
    if !alive {
        return Decision {
            next: BehaviorState::Dead,
            action: None,
        };
    }
    match state {
        BehaviorState::Dead => Decision {
            next: BehaviorState::Dead,
            action: None,
        },
        BehaviorState::Idle => match distance {
            Some(d) if d < params.perception_radius => Decision {
                next: BehaviorState::Chase,
                action: Some(PlannedAction::MoveTowardTarget),
            },
            _ => Decision {
                next: BehaviorState::Idle,
                action: None,
            },
        },
        BehaviorState::Chase => match distance {
            None => Decision {
                next: BehaviorState::Idle,
                action: None,
            },
            Some(d) if d > params.perception_radius * LOSE_INTEREST_FACTOR => Decision {
                next: BehaviorState::Idle,
                action: None,
            },
            Some(d) if d < params.attack_radius => Decision {
                next: BehaviorState::Attack,
                action: None,
            },
            Some(_) => Decision {
                next: BehaviorState::Chase,
                action: Some(PlannedAction::MoveTowardTarget),
            },
        },
        BehaviorState::Attack => match distance {
            None => Decision {
                next: BehaviorState::Idle,
                action: None,
            },
            Some(d) if d > params.attack_radius => Decision {
                next: BehaviorState::Chase,
                action: Some(PlannedAction::MoveTowardTarget),
            },
            Some(_) if cooldown_ready => Decision {
                next: BehaviorState::Attack,
                action: Some(PlannedAction::Attack),
            },
            Some(_) => Decision {
                next: BehaviorState::Attack,
                action: None,
            },
        },
    }
}

/// Evaluate every enemy's state machine against the tick-start snapshot and
/// queue the resulting intents. Enemies are visited in ascending entity
/// index order so the intent queue is tick-stable.
pub fn evaluate_behaviors(
    clock: Res<TickClock>,
    snapshot: Res<SpatialSnapshot>,
    mut queue: ResMut<IntentQueue>,
    mut enemies: Query<(Entity, &Actor, &Transform, &mut Behavior)>,
) {
    let mut batch: Vec<Entity> = enemies
        .iter()
        .filter(|(_, _, _, behavior)| behavior.state != BehaviorState::Dead)
        .map(|(entity, _, _, _)| entity)
        .collect();
    batch.sort_by_key(|entity| entity.index());

    for entity in batch {
        let Ok((entity, actor, transform, mut behavior)) = enemies.get_mut(entity) else {
            continue;
        };
        let position = transform.translation;
        let target = snapshot.nearest_living(position, EntityKind::Player, Some(entity));
        let distance = target.map(|(_, d)| d);
        let cooldown_ready = actor.cooldown_ready(clock.tick, actor.attack_cooldown);

        let decision = next_state(
            behavior.state,
            actor.is_alive(),
            distance,
            &behavior.params,
            cooldown_ready,
        );

        if decision.next != behavior.state {
            debug!(
                "{}: {:?} -> {:?} at tick {}",
                actor.name, behavior.state, decision.next, clock.tick
            );
            behavior.state = decision.next;
            behavior.last_transition_tick = clock.tick;
        }

        match decision.action {
            Some(PlannedAction::MoveTowardTarget) => {
                if let Some((target_entity, _)) = target {
                    if let Some(target_pos) = snapshot.position_of(target_entity) {
                        queue.push_move(entity, target_pos);
                    }
                }
            }
            Some(PlannedAction::Attack) => {
                let kind = match behavior.attack_style {
                    AttackStyle::Melee => AttackKind::Melee {
                        reach: behavior.attack_reach,
                    },
                    AttackStyle::Projectile => {
                        let Some(projectile) = behavior.projectile else {
                            warn!("{} has projectile style but no projectile config", actor.name);
                            continue;
                        };
                        let Some(target_pos) = target
                            .and_then(|(target_entity, _)| snapshot.position_of(target_entity))
                        else {
                            continue;
                        };
                        let direction = (target_pos - position).normalize_or_zero();
                        if direction == Vec3::ZERO {
                            continue;
                        }
                        AttackKind::Projectile {
                            velocity: direction * projectile.speed,
                            ttl_ticks: projectile.ttl_ticks,
                            hit_radius: projectile.hit_radius,
                        }
                    }
                };
                queue.push_attack(entity, kind, clock.tick, actor.attack_cooldown);
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: BehaviorParams = BehaviorParams {
        perception_radius: 10.0,
        attack_radius: 2.0,
    };

    #[test]
    fn idle_ignores_targets_outside_perception() {
        let d = next_state(BehaviorState::Idle, true, Some(12.0), &PARAMS, true);
        assert_eq!(d.next, BehaviorState::Idle);
        assert_eq!(d.action, None);
    }

    #[test]
    fn idle_starts_chasing_inside_perception() {
        let d = next_state(BehaviorState::Idle, true, Some(9.0), &PARAMS, true);
        assert_eq!(d.next, BehaviorState::Chase);
        assert_eq!(d.action, Some(PlannedAction::MoveTowardTarget));
    }

    #[test]
    fn chase_holds_through_hysteresis_band() {
        // Past perception but inside perception * 1.5: keep chasing.
        let d = next_state(BehaviorState::Chase, true, Some(12.0), &PARAMS, true);
        assert_eq!(d.next, BehaviorState::Chase);
        // Past the hysteresis limit: give up.
        let d = next_state(BehaviorState::Chase, true, Some(16.0), &PARAMS, true);
        assert_eq!(d.next, BehaviorState::Idle);
    }

    #[test]
    fn chase_enters_attack_without_swinging_same_tick() {
        let d = next_state(BehaviorState::Chase, true, Some(1.5), &PARAMS, true);
        assert_eq!(d.next, BehaviorState::Attack);
        assert_eq!(d.action, None);
    }

    #[test]
    fn attack_swings_only_when_cooldown_ready() {
        let d = next_state(BehaviorState::Attack, true, Some(1.5), &PARAMS, true);
        assert_eq!(d.action, Some(PlannedAction::Attack));
        let d = next_state(BehaviorState::Attack, true, Some(1.5), &PARAMS, false);
        assert_eq!(d.action, None);
    }

    #[test]
    fn attack_falls_back_to_chase_when_target_retreats() {
        let d = next_state(BehaviorState::Attack, true, Some(3.0), &PARAMS, true);
        assert_eq!(d.next, BehaviorState::Chase);
        assert_eq!(d.action, Some(PlannedAction::MoveTowardTarget));
    }

    #[test]
    fn losing_all_targets_returns_to_idle() {
        let d = next_state(BehaviorState::Chase, true, None, &PARAMS, true);
        assert_eq!(d.next, BehaviorState::Idle);
        let d = next_state(BehaviorState::Attack, true, None, &PARAMS, true);
        assert_eq!(d.next, BehaviorState::Idle);
    }

    #[test]
    fn dead_is_absorbing() {
        let d = next_state(BehaviorState::Attack, false, Some(1.0), &PARAMS, true);
        assert_eq!(d.next, BehaviorState::Dead);
        let d = next_state(BehaviorState::Dead, true, Some(1.0), &PARAMS, true);
        assert_eq!(d.next, BehaviorState::Dead);
        assert_eq!(d.action, None);
    }
}
