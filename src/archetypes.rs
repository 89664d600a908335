//! Data-driven actor archetypes
//!
//! Actor stat blocks are defined in `assets/config/archetypes.ron` instead
//! of hardcoded in Rust, so balance changes don't require recompilation. The
//! built-in set is embedded in the binary and validated at startup; scenario
//! configs reference archetypes by name.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::registry::{Actor, EntityKind};
use crate::spatial::HitVolume;

const DEFAULT_ARCHETYPES: &str = include_str!("../assets/config/archetypes.ron");

/// Hit volume shape as written in config.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub enum HullConfig {
    Sphere { radius: f32 },
    Capsule { half_height: f32, radius: f32 },
    Box { half_extents: [f32; 3] },
}

impl HullConfig {
    pub fn to_hit_volume(&self) -> HitVolume {
        match *self {
            HullConfig::Sphere { radius } => HitVolume::Sphere { radius },
            HullConfig::Capsule {
                half_height,
                radius,
            } => HitVolume::Capsule {
                half_height,
                radius,
            },
            HullConfig::Box { half_extents } => HitVolume::Box {
                half_extents: Vec3::from_array(half_extents),
            },
        }
    }
}

/// How an archetype attacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackStyle {
    Melee,
    Projectile,
}

fn default_attack_style() -> AttackStyle {
    AttackStyle::Melee
}

/// Projectile launch parameters for ranged archetypes.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ProjectileConfig {
    /// Launch speed in units/second.
    pub speed: f32,
    /// Lifetime in ticks before the projectile expires harmlessly.
    pub ttl_ticks: u32,
    /// Overlap probe radius at the projectile's position.
    pub hit_radius: f32,
}

fn default_stamina() -> u32 {
    100
}

/// One archetype's complete stat block.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchetypeConfig {
    pub max_health: u32,
    #[serde(default = "default_stamina")]
    pub stamina: u32,
    pub attack_power: u32,
    /// World units per second.
    pub move_speed: f32,
    /// Minimum ticks between attacks.
    pub attack_cooldown_ticks: u32,
    /// Melee swing radius.
    pub attack_reach: f32,
    /// Distance at which this archetype notices a target.
    pub perception_radius: f32,
    /// Distance at which it starts attacking instead of chasing.
    pub attack_radius: f32,
    #[serde(default = "default_attack_style")]
    pub attack_style: AttackStyle,
    #[serde(default)]
    pub projectile: Option<ProjectileConfig>,
    pub hull: HullConfig,
}

impl ArchetypeConfig {
    /// Build the registry component for one actor of this archetype.
    pub fn actor(&self, kind: EntityKind, name: impl Into<String>) -> Actor {
        let mut actor = Actor::new(kind, name, self.max_health, self.attack_power);
        actor.stamina = self.stamina;
        actor.move_speed = self.move_speed;
        actor.attack_cooldown = self.attack_cooldown_ticks;
        actor
    }
}

/// Root structure for the archetypes.ron file.
#[derive(Debug, Serialize, Deserialize)]
pub struct ArchetypesConfig {
    pub archetypes: HashMap<String, ArchetypeConfig>,
}

/// Resource containing all archetype definitions, loaded at startup.
#[derive(Debug, Resource)]
pub struct ArchetypeDefinitions {
    definitions: HashMap<String, ArchetypeConfig>,
}

impl Default for ArchetypeDefinitions {
    fn default() -> Self {
        Self::load_default().expect("built-in archetype definitions must be valid")
    }
}

impl ArchetypeDefinitions {
    /// Load the embedded default definitions.
    pub fn load_default() -> Result<Self, String> {
        Self::parse(DEFAULT_ARCHETYPES, "built-in archetypes")
    }

    /// Load definitions from a RON file on disk.
    pub fn load_from_file(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path, e))?;
        Self::parse(&contents, path)
    }

    fn parse(contents: &str, origin: &str) -> Result<Self, String> {
        let config: ArchetypesConfig = ron::from_str(contents)
            .map_err(|e| format!("Failed to parse {}: {}", origin, e))?;
        let definitions = Self {
            definitions: config.archetypes,
        };
        definitions.validate().map_err(|e| format!("{}: {}", origin, e))?;
        Ok(definitions)
    }

    pub fn get(&self, name: &str) -> Option<&ArchetypeConfig> {
        self.definitions.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.definitions.is_empty() {
            return Err("no archetypes defined".to_string());
        }
        for (name, config) in &self.definitions {
            if config.max_health == 0 {
                return Err(format!("archetype '{}' has zero max_health", name));
            }
            if config.attack_reach <= 0.0 {
                return Err(format!("archetype '{}' has non-positive attack_reach", name));
            }
            if config.attack_radius > config.perception_radius {
                return Err(format!(
                    "archetype '{}' attack_radius exceeds perception_radius",
                    name
                ));
            }
            if config.attack_style == AttackStyle::Projectile && config.projectile.is_none() {
                return Err(format!(
                    "archetype '{}' has projectile attack style but no projectile config",
                    name
                ));
            }
        }
        Ok(())
    }
}

/// Loads and validates the built-in archetype definitions at startup.
pub struct ArchetypePlugin;

impl Plugin for ArchetypePlugin {
    fn build(&self, app: &mut App) {
        match ArchetypeDefinitions::load_default() {
            Ok(definitions) => {
                app.insert_resource(definitions);
            }
            Err(e) => {
                // Config must always be valid; fail loudly at startup.
                panic!("Failed to load archetype definitions: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn built_in_archetypes_load_and_validate() {
        let defs = ArchetypeDefinitions::load_default().unwrap();
        for name in ["knight", "grunt", "brute", "archer"] {
            assert!(defs.get(name).is_some(), "missing archetype {}", name);
        }
    }

    #[test]
    fn archer_carries_projectile_config() {
        let defs = ArchetypeDefinitions::load_default().unwrap();
        let archer = defs.get("archer").unwrap();
        assert_eq!(archer.attack_style, AttackStyle::Projectile);
        assert!(archer.projectile.is_some());
    }

    #[test]
    fn validation_rejects_projectile_style_without_config() {
        let bad = r#"(
            archetypes: {
                "broken": (
                    max_health: 10,
                    attack_power: 1,
                    move_speed: 1.0,
                    attack_cooldown_ticks: 10,
                    attack_reach: 1.0,
                    perception_radius: 5.0,
                    attack_radius: 1.0,
                    attack_style: Projectile,
                    hull: Sphere(radius: 0.5),
                ),
            },
        )"#;
        let err = ArchetypeDefinitions::parse(bad, "test").unwrap_err();
        assert!(err.contains("projectile"), "unexpected error: {}", err);
    }

    #[test]
    fn actor_builder_applies_stat_block() {
        let defs = ArchetypeDefinitions::load_default().unwrap();
        let grunt = defs.get("grunt").unwrap();
        let actor = grunt.actor(EntityKind::Enemy, "grunt-1");
        assert_eq!(actor.max_health, grunt.max_health);
        assert_eq!(actor.health, grunt.max_health);
        assert_eq!(actor.attack_cooldown, grunt.attack_cooldown_ticks);
        assert!(actor.is_alive());
    }
}
