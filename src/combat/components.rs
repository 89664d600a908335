//! Simulation components and resources
//!
//! The tick clock, the intent queue shared by enemy AI and player input, the
//! simulation tuning resource, and the seeded RNG.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::time::{Duration, Instant};

use crate::combat::log::{EventKind, EventLog};

/// Seconds of simulated time per tick (fixed timestep).
pub const TICK_DT: f32 = 1.0 / 30.0;

/// Monotonic simulation tick counter. The first simulated tick is 1.
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct TickClock {
    pub tick: u64,
}

/// Advance the clock. Runs first in every tick.
pub fn advance_clock(mut clock: ResMut<TickClock>) {
    clock.tick += 1;
}

/// Uniquely identifies one swing, for hit-once-per-swing tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IntentId(pub u64);

/// How an attack resolves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttackKind {
    /// Swing volume is a sphere of `reach` around the attacker.
    Melee { reach: f32 },
    /// Launch a projectile with the given velocity and lifetime.
    Projectile {
        velocity: Vec3,
        ttl_ticks: u32,
        hit_radius: f32,
    },
}

/// A single attack request, consumed exactly once by the resolver.
#[derive(Debug, Clone, Copy)]
pub struct AttackIntent {
    pub id: IntentId,
    pub actor: Entity,
    pub kind: AttackKind,
    pub issued_tick: u64,
    /// Cooldown in ticks the resolver enforces against the actor's last
    /// successful attack.
    pub cooldown_at_issue: u32,
}

/// Why an intent was discarded instead of resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentError {
    ZeroReach,
    ZeroTtl,
    NonFiniteVelocity,
}

impl fmt::Display for IntentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IntentError::ZeroReach => write!(f, "melee reach must be positive"),
            IntentError::ZeroTtl => write!(f, "projectile time-to-live must be positive"),
            IntentError::NonFiniteVelocity => write!(f, "projectile velocity must be finite"),
        }
    }
}

impl AttackIntent {
    pub fn validate(&self) -> Result<(), IntentError> {
        match self.kind {
            AttackKind::Melee { reach } => {
                if !(reach > 0.0) {
                    return Err(IntentError::ZeroReach);
                }
            }
            AttackKind::Projectile {
                velocity,
                ttl_ticks,
                ..
            } => {
                if !velocity.is_finite() {
                    return Err(IntentError::NonFiniteVelocity);
                }
                if ttl_ticks == 0 {
                    return Err(IntentError::ZeroTtl);
                }
            }
        }
        Ok(())
    }
}

/// A movement request toward a point, applied in the commit phase.
#[derive(Debug, Clone, Copy)]
pub struct MoveIntent {
    pub actor: Entity,
    pub toward: Vec3,
}

/// Intents collected during behavior evaluation and player input, drained by
/// the resolver in push order (behavior evaluation pushes in ascending
/// entity index order, so the drain order is tick-stable).
#[derive(Resource, Default)]
pub struct IntentQueue {
    attacks: Vec<AttackIntent>,
    moves: Vec<MoveIntent>,
    next_id: u64,
}

impl IntentQueue {
    pub fn push_attack(
        &mut self,
        actor: Entity,
        kind: AttackKind,
        issued_tick: u64,
        cooldown_at_issue: u32,
    ) -> IntentId {
        let id = IntentId(self.next_id);
        self.next_id += 1;
        self.attacks.push(AttackIntent {
            id,
            actor,
            kind,
            issued_tick,
            cooldown_at_issue,
        });
        id
    }

    pub fn push_move(&mut self, actor: Entity, toward: Vec3) {
        self.moves.push(MoveIntent { actor, toward });
    }

    pub fn drain_attacks(&mut self) -> Vec<AttackIntent> {
        std::mem::take(&mut self.attacks)
    }

    pub fn drain_moves(&mut self) -> Vec<MoveIntent> {
        std::mem::take(&mut self.moves)
    }

    pub fn pending_attacks(&self) -> usize {
        self.attacks.len()
    }
}

/// Simulation tuning shared by the resolver and registry systems.
#[derive(Resource, Debug, Clone)]
pub struct SimConfig {
    /// Ticks a dead actor lingers before despawn, so event consumers can
    /// observe the death.
    pub despawn_grace_ticks: u64,
    /// Arena bounds; projectiles leaving them are removed without damage.
    pub bounds_min: Vec3,
    pub bounds_max: Vec3,
    /// Optional fractional damage variance, rolled on the seeded RNG.
    /// `None` keeps damage fully deterministic.
    pub damage_variance: Option<f32>,
    /// Wall-clock budget for one full tick; overruns are reported, never
    /// retried.
    pub tick_budget: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            despawn_grace_ticks: 30,
            bounds_min: Vec3::new(-200.0, -50.0, -200.0),
            bounds_max: Vec3::new(200.0, 100.0, 200.0),
            damage_variance: None,
            tick_budget: Duration::from_millis(4),
        }
    }
}

impl SimConfig {
    pub fn in_bounds(&self, p: Vec3) -> bool {
        p.cmpge(self.bounds_min).all() && p.cmple(self.bounds_max).all()
    }
}

/// Seeded random number generator for reproducible simulations.
///
/// Only consulted when a damage variance is explicitly configured; the
/// default simulation never draws from it.
#[derive(Resource)]
pub struct GameRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic).
    pub seed: Option<u64>,
}

impl GameRng {
    /// Create a new GameRng with a specific seed for deterministic behavior.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Create a new GameRng with random entropy (non-deterministic).
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Generate a random f32 in the range [0.0, 1.0).
    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Generate a random f32 in the given range.
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random_f32() * (max - min)
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Wall-clock measurement of the current tick, for overrun reporting.
#[derive(Resource, Default)]
pub struct TickStopwatch {
    started: Option<Instant>,
}

pub fn start_tick_stopwatch(mut stopwatch: ResMut<TickStopwatch>) {
    stopwatch.started = Some(Instant::now());
}

/// Report a `TickOverrun` record when the tick exceeded its budget. The
/// tick's results are committed either way; a tick is never re-run (that
/// would double-apply damage).
pub fn check_tick_budget(
    clock: Res<TickClock>,
    config: Res<SimConfig>,
    mut stopwatch: ResMut<TickStopwatch>,
    mut log: ResMut<EventLog>,
) {
    let Some(started) = stopwatch.started.take() else {
        return;
    };
    let elapsed = started.elapsed();
    if elapsed > config.tick_budget {
        warn!(
            "tick {} overran its budget: {}us > {}us",
            clock.tick,
            elapsed.as_micros(),
            config.tick_budget.as_micros()
        );
        log.record(
            clock.tick,
            EventKind::TickOverrun {
                elapsed_us: elapsed.as_micros() as u64,
            },
            format!("tick {} overran its time budget", clock.tick),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intent_validation_rejects_malformed_intents() {
        let melee = AttackIntent {
            id: IntentId(0),
            actor: Entity::from_raw(1),
            kind: AttackKind::Melee { reach: 0.0 },
            issued_tick: 1,
            cooldown_at_issue: 0,
        };
        assert_eq!(melee.validate(), Err(IntentError::ZeroReach));

        let projectile = AttackIntent {
            id: IntentId(1),
            actor: Entity::from_raw(1),
            kind: AttackKind::Projectile {
                velocity: Vec3::new(f32::NAN, 0.0, 0.0),
                ttl_ticks: 10,
                hit_radius: 0.5,
            },
            issued_tick: 1,
            cooldown_at_issue: 0,
        };
        assert_eq!(projectile.validate(), Err(IntentError::NonFiniteVelocity));

        let stale = AttackIntent {
            id: IntentId(2),
            actor: Entity::from_raw(1),
            kind: AttackKind::Projectile {
                velocity: Vec3::X,
                ttl_ticks: 0,
                hit_radius: 0.5,
            },
            issued_tick: 1,
            cooldown_at_issue: 0,
        };
        assert_eq!(stale.validate(), Err(IntentError::ZeroTtl));
    }

    #[test]
    fn queue_assigns_unique_intent_ids() {
        let mut queue = IntentQueue::default();
        let a = queue.push_attack(
            Entity::from_raw(1),
            AttackKind::Melee { reach: 2.0 },
            1,
            10,
        );
        let b = queue.push_attack(
            Entity::from_raw(2),
            AttackKind::Melee { reach: 2.0 },
            1,
            10,
        );
        assert_ne!(a, b);
        assert_eq!(queue.pending_attacks(), 2);
        assert_eq!(queue.drain_attacks().len(), 2);
        assert_eq!(queue.pending_attacks(), 0);
    }

    #[test]
    fn bounds_check() {
        let config = SimConfig::default();
        assert!(config.in_bounds(Vec3::ZERO));
        assert!(!config.in_bounds(Vec3::new(500.0, 0.0, 0.0)));
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = GameRng::from_seed(42);
        let mut b = GameRng::from_seed(42);
        for _ in 0..16 {
            assert_eq!(a.random_f32().to_bits(), b.random_f32().to_bits());
        }
    }
}
