//! Spatial query service
//!
//! A per-tick snapshot of every actor's world-space hit volume, rebuilt from
//! tick-start transforms and sorted by entity index so overlap queries return
//! ids in a stable, reproducible order. Nothing here caches across ticks.

use bevy::prelude::*;
use smallvec::SmallVec;

use crate::combat::components::TickClock;
use crate::registry::{Actor, EntityKind};

/// Local-space hit shape carried by a targetable actor. Positioned in the
/// world by the owning entity's `Transform`; capsules stand on the Y axis.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub enum HitVolume {
    Sphere { radius: f32 },
    Capsule { half_height: f32, radius: f32 },
    Box { half_extents: Vec3 },
}

impl HitVolume {
    /// The shape placed at the owner's position.
    pub fn to_world(&self, position: Vec3) -> Volume {
        match *self {
            HitVolume::Sphere { radius } => Volume::Sphere {
                center: position,
                radius,
            },
            HitVolume::Capsule {
                half_height,
                radius,
            } => Volume::Capsule {
                a: position - Vec3::Y * half_height,
                b: position + Vec3::Y * half_height,
                radius,
            },
            HitVolume::Box { half_extents } => Volume::Aabb {
                min: position - half_extents,
                max: position + half_extents,
            },
        }
    }
}

/// A world-space query volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Volume {
    Sphere { center: Vec3, radius: f32 },
    /// Segment from `a` to `b` swept by `radius`.
    Capsule { a: Vec3, b: Vec3, radius: f32 },
    Aabb { min: Vec3, max: Vec3 },
}

fn closest_point_on_segment(a: Vec3, b: Vec3, p: Vec3) -> Vec3 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Squared distance between segments [p1,q1] and [p2,q2].
/// Ericson, Real-Time Collision Detection, 5.1.9.
fn segment_segment_distance_sq(p1: Vec3, q1: Vec3, p2: Vec3, q2: Vec3) -> f32 {
    let d1 = q1 - p1;
    let d2 = q2 - p2;
    let r = p1 - p2;
    let a = d1.length_squared();
    let e = d2.length_squared();
    let f = d2.dot(r);

    let (s, t);
    if a <= f32::EPSILON && e <= f32::EPSILON {
        return r.length_squared();
    }
    if a <= f32::EPSILON {
        s = 0.0;
        t = (f / e).clamp(0.0, 1.0);
    } else {
        let c = d1.dot(r);
        if e <= f32::EPSILON {
            t = 0.0;
            s = (-c / a).clamp(0.0, 1.0);
        } else {
            let b = d1.dot(d2);
            let denom = a * e - b * b;
            let mut s_local = if denom > f32::EPSILON {
                ((b * f - c * e) / denom).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let mut t_local = (b * s_local + f) / e;
            if t_local < 0.0 {
                t_local = 0.0;
                s_local = (-c / a).clamp(0.0, 1.0);
            } else if t_local > 1.0 {
                t_local = 1.0;
                s_local = ((b - c) / a).clamp(0.0, 1.0);
            }
            s = s_local;
            t = t_local;
        }
    }
    let c1 = p1 + d1 * s;
    let c2 = p2 + d2 * t;
    (c1 - c2).length_squared()
}

fn point_aabb_distance_sq(p: Vec3, min: Vec3, max: Vec3) -> f32 {
    let clamped = p.clamp(min, max);
    (p - clamped).length_squared()
}

/// Segment/AABB slab test.
fn segment_intersects_aabb(a: Vec3, b: Vec3, min: Vec3, max: Vec3) -> bool {
    let d = b - a;
    let mut t_min = 0.0_f32;
    let mut t_max = 1.0_f32;
    for axis in 0..3 {
        let (origin, dir, lo, hi) = (a[axis], d[axis], min[axis], max[axis]);
        if dir.abs() <= f32::EPSILON {
            if origin < lo || origin > hi {
                return false;
            }
        } else {
            let inv = 1.0 / dir;
            let mut t1 = (lo - origin) * inv;
            let mut t2 = (hi - origin) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return false;
            }
        }
    }
    true
}

impl Volume {
    /// Exact pairwise intersection for sphere/sphere, sphere/capsule,
    /// sphere/box, capsule/capsule and box/box. Capsule/box is conservative:
    /// the capsule segment is tested against the radius-expanded box, which
    /// over-accepts slightly at box corners.
    pub fn intersects(&self, other: &Volume) -> bool {
        use Volume::*;
        match (*self, *other) {
            (
                Sphere {
                    center: c1,
                    radius: r1,
                },
                Sphere {
                    center: c2,
                    radius: r2,
                },
            ) => (c1 - c2).length_squared() <= (r1 + r2) * (r1 + r2),
            (Sphere { center, radius }, Capsule { a, b, radius: cr })
            | (Capsule { a, b, radius: cr }, Sphere { center, radius }) => {
                let closest = closest_point_on_segment(a, b, center);
                (center - closest).length_squared() <= (radius + cr) * (radius + cr)
            }
            (Sphere { center, radius }, Aabb { min, max })
            | (Aabb { min, max }, Sphere { center, radius }) => {
                point_aabb_distance_sq(center, min, max) <= radius * radius
            }
            (
                Capsule {
                    a: a1,
                    b: b1,
                    radius: r1,
                },
                Capsule {
                    a: a2,
                    b: b2,
                    radius: r2,
                },
            ) => segment_segment_distance_sq(a1, b1, a2, b2) <= (r1 + r2) * (r1 + r2),
            (Capsule { a, b, radius }, Aabb { min, max })
            | (Aabb { min, max }, Capsule { a, b, radius }) => {
                let expanded_min = min - Vec3::splat(radius);
                let expanded_max = max + Vec3::splat(radius);
                segment_intersects_aabb(a, b, expanded_min, expanded_max)
            }
            (
                Aabb {
                    min: min1,
                    max: max1,
                },
                Aabb {
                    min: min2,
                    max: max2,
                },
            ) => min1.cmple(max2).all() && min2.cmple(max1).all(),
        }
    }
}

#[derive(Debug, Clone)]
struct SnapshotItem {
    entity: Entity,
    kind: EntityKind,
    alive: bool,
    position: Vec3,
    volume: Volume,
}

/// Tick-start view of every targetable actor, rebuilt once per tick.
///
/// Items are stored in ascending entity-index order, which makes every query
/// result deterministic for a given world state.
#[derive(Resource, Default)]
pub struct SpatialSnapshot {
    tick: u64,
    items: Vec<SnapshotItem>,
}

impl SpatialSnapshot {
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn rebuild(
        &mut self,
        tick: u64,
        items: impl IntoIterator<Item = (Entity, EntityKind, bool, Vec3, Volume)>,
    ) {
        self.tick = tick;
        self.items.clear();
        self.items.extend(items.into_iter().map(
            |(entity, kind, alive, position, volume)| SnapshotItem {
                entity,
                kind,
                alive,
                position,
                volume,
            },
        ));
        self.items.sort_by_key(|item| item.entity.index());
    }

    /// Entities whose hit volume intersects `volume`, in ascending
    /// entity-index order, excluding `exclude`.
    pub fn overlapping(&self, volume: &Volume, exclude: Option<Entity>) -> SmallVec<[Entity; 8]> {
        let mut hits = SmallVec::new();
        for item in &self.items {
            if Some(item.entity) == exclude {
                continue;
            }
            if item.volume.intersects(volume) {
                hits.push(item.entity);
            }
        }
        hits
    }

    /// Closest living actor of `kind`, by center distance from `from`.
    /// Ties break toward the lower entity index (snapshot order).
    pub fn nearest_living(
        &self,
        from: Vec3,
        kind: EntityKind,
        exclude: Option<Entity>,
    ) -> Option<(Entity, f32)> {
        let mut best: Option<(Entity, f32)> = None;
        for item in &self.items {
            if item.kind != kind || !item.alive || Some(item.entity) == exclude {
                continue;
            }
            let dist = (item.position - from).length();
            match best {
                Some((_, best_dist)) if dist.total_cmp(&best_dist).is_lt() => {
                    best = Some((item.entity, dist));
                }
                None => best = Some((item.entity, dist)),
                _ => {}
            }
        }
        best
    }

    pub fn position_of(&self, entity: Entity) -> Option<Vec3> {
        self.items
            .iter()
            .find(|item| item.entity == entity)
            .map(|item| item.position)
    }
}

/// Rebuild the snapshot from tick-start transforms. Runs first in the tick,
/// right after the clock advance; projectiles carry no `HitVolume`, so they
/// never appear here.
pub fn rebuild_spatial_snapshot(
    clock: Res<TickClock>,
    mut snapshot: ResMut<SpatialSnapshot>,
    query: Query<(Entity, &Actor, &HitVolume, &Transform)>,
) {
    snapshot.rebuild(
        clock.tick,
        query.iter().map(|(entity, actor, hit_volume, transform)| {
            (
                entity,
                actor.kind,
                actor.is_alive(),
                transform.translation,
                hit_volume.to_world(transform.translation),
            )
        }),
    );
}
