//! JSON configuration parsing for headless scenarios
//!
//! Parses scenario files describing the player, enemy placements and the
//! player's scripted inputs, and validates them against the loaded
//! archetype definitions.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::archetypes::ArchetypeDefinitions;

/// One actor placement: an archetype name plus a spawn position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorPlacement {
    pub archetype: String,
    pub position: [f32; 3],
}

/// A scripted player input at a specific tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedAction {
    pub tick: u64,
    pub action: PlayerAction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PlayerAction {
    /// Melee swing with the player's archetype reach.
    Melee,
    /// Projectile launch in the given direction (normalized at runtime).
    Projectile { direction: [f32; 3] },
    /// Walk toward the given point every tick until it is reached or a
    /// later move order replaces it.
    MoveToward { position: [f32; 3] },
}

/// Scenario configuration loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// The player-controlled actor.
    pub player: ActorPlacement,
    /// Enemy placements (at least one).
    pub enemies: Vec<ActorPlacement>,
    /// Scripted player inputs, applied at their ticks.
    #[serde(default)]
    pub script: Vec<ScriptedAction>,
    /// Tick limit before the scenario times out (default: 900, 30 seconds).
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Random seed for deterministic reproduction.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Optional damage variance fraction (0.0 to 1.0); absent means
    /// fully deterministic damage.
    #[serde(default)]
    pub damage_variance: Option<f32>,
    /// Custom output path for the result JSON (optional).
    #[serde(default)]
    pub output_path: Option<String>,
}

fn default_max_ticks() -> u64 {
    900
}

impl ScenarioConfig {
    /// Load a scenario from a JSON file.
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read scenario file: {}", e))?;

        let config: ScenarioConfig = serde_json::from_str(&contents)
            .map_err(|e| format!("Failed to parse JSON: {}", e))?;

        Ok(config)
    }

    /// Validate the scenario against the loaded archetype definitions.
    pub fn validate(&self, archetypes: &ArchetypeDefinitions) -> Result<(), String> {
        if self.enemies.is_empty() {
            return Err("scenario must place at least one enemy".to_string());
        }
        if self.max_ticks == 0 {
            return Err("max_ticks must be positive".to_string());
        }

        for placement in std::iter::once(&self.player).chain(self.enemies.iter()) {
            if archetypes.get(&placement.archetype).is_none() {
                let known: Vec<&str> = archetypes.names().collect();
                return Err(format!(
                    "Unknown archetype: '{}'. Valid archetypes: {}",
                    placement.archetype,
                    known.join(", ")
                ));
            }
            if placement.position.iter().any(|c| !c.is_finite()) {
                return Err(format!(
                    "archetype '{}' has a non-finite spawn position",
                    placement.archetype
                ));
            }
        }

        if let Some(variance) = self.damage_variance {
            if !(0.0..=1.0).contains(&variance) {
                return Err("damage_variance must be between 0.0 and 1.0".to_string());
            }
        }

        for action in &self.script {
            if action.tick == 0 || action.tick > self.max_ticks {
                return Err(format!(
                    "scripted action at tick {} is outside the scenario's tick range",
                    action.tick
                ));
            }
        }

        Ok(())
    }
}
