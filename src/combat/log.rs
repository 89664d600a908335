//! Event log
//!
//! Ordered, serializable record of everything observable that happened in a
//! simulation: spawns, despawns, damage, deaths, dropped intents, tick
//! overruns. External consumers replay it with a cursor (`records_since`);
//! tests and the headless runner use the aggregation queries.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::registry::EntityKind;

/// What a single record describes. Actor references are display names, not
/// entity ids, so a serialized log stays meaningful outside the world that
/// produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    Spawned {
        kind: EntityKind,
        name: String,
    },
    Despawned {
        kind: EntityKind,
        name: String,
    },
    Damage {
        source: String,
        target: String,
        /// Damage actually applied, after clamping at remaining health.
        amount: u32,
        killing_blow: bool,
    },
    Died {
        victim: String,
        killer: Option<String>,
    },
    IntentDropped {
        actor: String,
        reason: String,
    },
    TickOverrun {
        elapsed_us: u64,
    },
    /// Scenario-level marker (start, end, outcome).
    Scenario(String),
}

/// One log entry. `seq` is assigned on insertion and equals the record's
/// index in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub tick: u64,
    pub kind: EventKind,
    pub message: String,
}

/// Per-actor end-of-scenario stats, collected into the saved summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorSummary {
    pub name: String,
    pub kind: EntityKind,
    pub max_health: u32,
    pub final_health: u32,
    pub survived: bool,
    pub damage_dealt: u32,
    pub damage_taken: u32,
}

/// Wrapper written to disk by `save_to_file`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub outcome: String,
    pub ticks_run: u64,
    pub seed: Option<u64>,
    pub actors: Vec<ActorSummary>,
    pub events: Vec<EventRecord>,
}

/// Resource that accumulates all simulation events in order.
#[derive(Resource, Default)]
pub struct EventLog {
    entries: Vec<EventRecord>,
}

impl EventLog {
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn record(&mut self, tick: u64, kind: EventKind, message: String) {
        let seq = self.entries.len() as u64;
        self.entries.push(EventRecord {
            seq,
            tick,
            kind,
            message,
        });
    }

    pub fn entries(&self) -> &[EventRecord] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records with `seq >= since`. Because `seq` equals the index, this is
    /// a direct slice; consumers keep their own cursor and call again with
    /// the next unseen sequence number.
    pub fn records_since(&self, since: u64) -> &[EventRecord] {
        let start = (since as usize).min(self.entries.len());
        &self.entries[start..]
    }

    /// Total damage applied by the named actor.
    pub fn total_damage_dealt(&self, name: &str) -> u32 {
        self.entries
            .iter()
            .filter_map(|r| match &r.kind {
                EventKind::Damage { source, amount, .. } if source == name => Some(*amount),
                _ => None,
            })
            .sum()
    }

    /// Total damage the named actor received.
    pub fn total_damage_taken(&self, name: &str) -> u32 {
        self.entries
            .iter()
            .filter_map(|r| match &r.kind {
                EventKind::Damage { target, amount, .. } if target == name => Some(*amount),
                _ => None,
            })
            .sum()
    }

    /// Damage applied, grouped by source name.
    pub fn damage_by_source(&self) -> HashMap<String, u32> {
        let mut totals: HashMap<String, u32> = HashMap::new();
        for record in &self.entries {
            if let EventKind::Damage { source, amount, .. } = &record.kind {
                *totals.entry(source.clone()).or_default() += amount;
            }
        }
        totals
    }

    /// Names of actors that died, in death order.
    pub fn deaths(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter_map(|r| match &r.kind {
                EventKind::Died { victim, .. } => Some(victim.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Write the full log plus summary as JSON. Returns the path written.
    pub fn save_to_file(
        &self,
        summary: &ScenarioSummary,
        path: Option<&str>,
    ) -> Result<String, String> {
        let path = path.unwrap_or("scenario_result.json").to_string();
        let json = serde_json::to_string_pretty(summary)
            .map_err(|e| format!("Failed to serialize scenario summary: {}", e))?;
        std::fs::write(&path, json)
            .map_err(|e| format!("Failed to write {}: {}", path, e))?;
        Ok(path)
    }
}
