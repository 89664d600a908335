//! Headless scenario execution
//!
//! Runs combat scenarios without any graphical output, suitable for
//! automated testing and balance analysis. The runner drives the app update
//! loop manually so tests can step it tick by tick and inspect resources.

use bevy::prelude::*;
use std::collections::BTreeMap;

use crate::archetypes::{ArchetypeDefinitions, ArchetypePlugin};
use crate::behavior::{Behavior, BehaviorParams};
use crate::combat::components::{
    check_tick_budget, AttackKind, GameRng, IntentQueue, SimConfig, TickClock,
};
use crate::combat::log::{ActorSummary, EventKind, EventLog, EventRecord, ScenarioSummary};
use crate::combat::{SimCorePlugin, TickPhase};
use crate::registry::{Actor, EntityKind};

use super::config::{PlayerAction, ScenarioConfig};

/// How a completed scenario ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// All enemies dead, player alive.
    Victory,
    /// Player dead, at least one enemy alive.
    Defeat,
    /// Both sides wiped on the same tick.
    Draw,
    /// Tick limit reached with both sides standing.
    Timeout,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Victory => "victory",
            Outcome::Defeat => "defeat",
            Outcome::Draw => "draw",
            Outcome::Timeout => "timeout",
        }
    }
}

/// Result of a completed scenario, for programmatic inspection.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub outcome: Outcome,
    pub ticks_run: u64,
    pub seed: Option<u64>,
    pub actors: Vec<ActorSummary>,
    pub event_count: usize,
    pub events: Vec<EventRecord>,
}

/// Resource tracking scenario progress.
#[derive(Resource)]
pub struct ScenarioState {
    pub config: ScenarioConfig,
    pub complete: bool,
    pub outcome: Option<Outcome>,
}

/// Marks the actor the scripted player input drives.
#[derive(Component)]
pub struct PlayerControlled;

/// A standing move destination for the scripted player, re-queued every
/// tick until the point is reached or a later order replaces it.
#[derive(Component, Debug, Clone, Copy)]
pub struct MoveOrder {
    pub target: Vec3,
}

/// Within this distance of the target the order counts as fulfilled.
const MOVE_ORDER_TOLERANCE: f32 = 1e-3;

/// Last-known stats for every actor that ever spawned, keyed by name.
///
/// Dead actors despawn after their grace period, so end-of-scenario
/// summaries are built from this rather than from live queries.
#[derive(Resource, Default)]
pub struct Roster {
    actors: BTreeMap<String, ActorSummary>,
}

impl Roster {
    pub fn summaries(&self) -> Vec<ActorSummary> {
        self.actors.values().cloned().collect()
    }
}

/// Plugin wiring a scenario into a simulation world.
pub struct HeadlessPlugin {
    pub config: ScenarioConfig,
}

impl Plugin for HeadlessPlugin {
    fn build(&self, app: &mut App) {
        let sim_config = SimConfig {
            damage_variance: self.config.damage_variance,
            ..SimConfig::default()
        };

        app.add_plugins(ArchetypePlugin)
            .add_plugins(SimCorePlugin)
            .insert_resource(sim_config)
            .insert_resource(ScenarioState {
                config: self.config.clone(),
                complete: false,
                outcome: None,
            })
            .init_resource::<Roster>()
            .add_systems(Startup, setup_scenario)
            .add_systems(
                Update,
                run_player_script
                    .in_set(TickPhase::Behavior)
                    .before(crate::behavior::evaluate_behaviors),
            )
            .add_systems(
                Update,
                (update_roster, check_scenario_end)
                    .chain()
                    .in_set(TickPhase::Flush)
                    .before(check_tick_budget),
            );
    }
}

/// Spawn the player and enemies from the scenario config.
fn setup_scenario(
    mut commands: Commands,
    state: Res<ScenarioState>,
    archetypes: Res<ArchetypeDefinitions>,
    mut log: ResMut<EventLog>,
) {
    let config = &state.config;

    let game_rng = match config.seed {
        Some(seed) => {
            info!("Using deterministic RNG with seed: {}", seed);
            GameRng::from_seed(seed)
        }
        None => {
            info!("Using non-deterministic RNG (no seed provided)");
            GameRng::from_entropy()
        }
    };
    commands.insert_resource(game_rng);

    log.clear();
    log.record(
        0,
        EventKind::Scenario("scenario started".to_string()),
        format!(
            "scenario started: 1 player vs {} enemies, {} tick limit",
            config.enemies.len(),
            config.max_ticks
        ),
    );

    // Validation already checked the archetype names exist.
    if let Some(archetype) = archetypes.get(&config.player.archetype) {
        commands.spawn((
            archetype.actor(EntityKind::Player, config.player.archetype.clone()),
            archetype.hull.to_hit_volume(),
            Transform::from_translation(Vec3::from_array(config.player.position)),
            PlayerControlled,
        ));
    }

    for (i, placement) in config.enemies.iter().enumerate() {
        let Some(archetype) = archetypes.get(&placement.archetype) else {
            continue;
        };
        let name = format!("{}-{}", placement.archetype, i + 1);
        let mut behavior = Behavior::new(
            BehaviorParams {
                perception_radius: archetype.perception_radius,
                attack_radius: archetype.attack_radius,
            },
            archetype.attack_style,
            archetype.attack_reach,
        );
        behavior.projectile = archetype.projectile;
        commands.spawn((
            archetype.actor(EntityKind::Enemy, name),
            archetype.hull.to_hit_volume(),
            Transform::from_translation(Vec3::from_array(placement.position)),
            behavior,
        ));
    }
}

/// Feed scripted player inputs into the intent queue at their ticks, and
/// keep a standing move order walking the player until it is fulfilled.
fn run_player_script(
    mut commands: Commands,
    clock: Res<TickClock>,
    state: Res<ScenarioState>,
    archetypes: Res<ArchetypeDefinitions>,
    mut queue: ResMut<IntentQueue>,
    player: Query<(Entity, &Actor, &Transform, Option<&MoveOrder>), With<PlayerControlled>>,
) {
    let Ok((entity, actor, transform, order)) = player.get_single() else {
        return;
    };
    let Some(archetype) = archetypes.get(&state.config.player.archetype) else {
        return;
    };
    let mut destination = order.map(|o| o.target);

    for scripted in &state.config.script {
        if scripted.tick != clock.tick {
            continue;
        }
        match &scripted.action {
            PlayerAction::Melee => {
                queue.push_attack(
                    entity,
                    AttackKind::Melee {
                        reach: archetype.attack_reach,
                    },
                    clock.tick,
                    actor.attack_cooldown,
                );
            }
            PlayerAction::Projectile { direction } => {
                let Some(projectile) = archetype.projectile else {
                    warn!("scripted projectile but archetype '{}' has none", actor.name);
                    continue;
                };
                let direction = Vec3::from_array(*direction).normalize_or_zero();
                if direction == Vec3::ZERO {
                    warn!("scripted projectile with zero direction at tick {}", clock.tick);
                    continue;
                }
                queue.push_attack(
                    entity,
                    AttackKind::Projectile {
                        velocity: direction * projectile.speed,
                        ttl_ticks: projectile.ttl_ticks,
                        hit_radius: projectile.hit_radius,
                    },
                    clock.tick,
                    actor.attack_cooldown,
                );
            }
            PlayerAction::MoveToward { position } => {
                let target = Vec3::from_array(*position);
                commands.entity(entity).insert(MoveOrder { target });
                destination = Some(target);
            }
        }
    }

    if let Some(target) = destination {
        if transform.translation.distance_squared(target)
            <= MOVE_ORDER_TOLERANCE * MOVE_ORDER_TOLERANCE
        {
            commands.entity(entity).remove::<MoveOrder>();
        } else {
            queue.push_move(entity, target);
        }
    }
}

/// Keep the roster current so despawned actors still appear in summaries.
fn update_roster(mut roster: ResMut<Roster>, actors: Query<&Actor>) {
    for actor in actors.iter() {
        if actor.kind == EntityKind::Projectile {
            continue;
        }
        roster.actors.insert(
            actor.name.clone(),
            ActorSummary {
                name: actor.name.clone(),
                kind: actor.kind,
                max_health: actor.max_health,
                final_health: actor.health,
                survived: actor.is_alive(),
                damage_dealt: actor.damage_dealt,
                damage_taken: actor.damage_taken,
            },
        );
    }
}

/// Declare the scenario over when a side is wiped or the tick limit hits.
fn check_scenario_end(
    clock: Res<TickClock>,
    mut state: ResMut<ScenarioState>,
    mut log: ResMut<EventLog>,
    actors: Query<&Actor>,
) {
    if state.complete {
        return;
    }

    let player_alive = actors
        .iter()
        .any(|a| a.kind == EntityKind::Player && a.is_alive());
    let enemies_alive = actors
        .iter()
        .any(|a| a.kind == EntityKind::Enemy && a.is_alive());

    let outcome = if !player_alive && !enemies_alive {
        Some(Outcome::Draw)
    } else if !enemies_alive {
        Some(Outcome::Victory)
    } else if !player_alive {
        Some(Outcome::Defeat)
    } else if clock.tick >= state.config.max_ticks {
        Some(Outcome::Timeout)
    } else {
        None
    };

    if let Some(outcome) = outcome {
        info!("scenario ended at tick {}: {}", clock.tick, outcome.as_str());
        log.record(
            clock.tick,
            EventKind::Scenario(format!("scenario ended: {}", outcome.as_str())),
            format!("scenario ended at tick {}: {}", clock.tick, outcome.as_str()),
        );
        state.outcome = Some(outcome);
        state.complete = true;
    }
}

/// Run a scenario to completion and return the outcome.
pub fn run_scenario(config: ScenarioConfig) -> Result<ScenarioOutcome, String> {
    let archetypes = ArchetypeDefinitions::load_default()?;
    config.validate(&archetypes)?;

    let max_ticks = config.max_ticks;
    let output_path = config.output_path.clone();

    let mut app = App::new();
    app.add_plugins(MinimalPlugins)
        .add_plugins(TransformPlugin)
        .add_plugins(HeadlessPlugin { config });

    // One update per tick; the tick limit check inside the world fires a
    // Timeout before this loop bound can.
    for _ in 0..=max_ticks {
        app.update();
        if app.world().resource::<ScenarioState>().complete {
            break;
        }
    }

    let world = app.world();
    let state = world.resource::<ScenarioState>();
    let clock = world.resource::<TickClock>();
    let roster = world.resource::<Roster>();
    let log = world.resource::<EventLog>();

    let outcome = state
        .outcome
        .ok_or_else(|| "scenario did not reach an outcome".to_string())?;
    let seed = world.resource::<GameRng>().seed;

    let result = ScenarioOutcome {
        outcome,
        ticks_run: clock.tick,
        seed,
        actors: roster.summaries(),
        event_count: log.len(),
        events: log.entries().to_vec(),
    };

    if output_path.is_some() {
        let summary = ScenarioSummary {
            outcome: outcome.as_str().to_string(),
            ticks_run: result.ticks_run,
            seed,
            actors: result.actors.clone(),
            events: result.events.clone(),
        };
        let path = log.save_to_file(&summary, output_path.as_deref())?;
        println!("Scenario complete. Log saved to: {}", path);
    }

    Ok(result)
}
