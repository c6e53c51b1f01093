//! Replay sample and round type definitions
//! These are the shapes produced by the demo-parsing backend and served
//! by the backing store, one set per round.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Discrete simulation time unit, match-relative, at a fixed rate.
pub type Tick = u32;

/// Zero-based index of a round within the match.
pub type RoundIndex = u32;

/// Parser-assigned player/entity identifier.
pub type EntityId = u64;

/// Parser-assigned identifier for a single thrown object instance.
pub type ObjectId = u64;

/// One play segment of the match.
///
/// `end_tick` of round N is followed immediately by `start_tick` of round
/// N+1 in match-relative tick space, but entity state is discontinuous
/// across that boundary (players respawn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    pub round_index: RoundIndex,
    pub start_tick: Tick,
    pub end_tick: Tick,
    /// Tick at which freeze time ends and players become able to act.
    pub freeze_end_tick: Option<Tick>,
}

impl RoundInfo {
    /// Whether `tick` lies within this round's tick range (inclusive).
    pub fn contains(&self, tick: Tick) -> bool {
        tick >= self.start_tick && tick <= self.end_tick
    }

    /// The tick a round transition lands on: freeze end, else round start.
    pub fn landing_tick(&self) -> Tick {
        self.freeze_end_tick.unwrap_or(self.start_tick)
    }
}

/// A sub-sampled snapshot of one player's state at one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub tick: Tick,
    pub entity_id: EntityId,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    /// View direction in degrees, if captured
    pub facing_yaw: Option<f32>,
    pub team: String,
    pub display_name: String,
    pub health: Option<i32>,
    pub armor: Option<i32>,
    /// Normalized weapon name; legacy captures may emit an array form
    #[serde(default, deserialize_with = "de_weapon_name")]
    pub held_weapon: Option<String>,
}

/// One tracked tick of a single in-flight thrown object's trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrownObjectSample {
    pub tick: Tick,
    pub object_id: ObjectId,
    /// Projectile kind as named by the parser (e.g. "smoke", "flash")
    pub kind: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub owner_entity_id: EntityId,
}

/// A state change in a thrown object's lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThrownObjectLifecycleEvent {
    pub tick: Tick,
    pub object_id: ObjectId,
    pub kind: String,
    /// Lifecycle phase as named by the parser (e.g. "armed", "detonated", "expired")
    pub phase: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub owner_entity_id: EntityId,
}

/// A single weapon discharge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponFireSample {
    pub tick: Tick,
    pub entity_id: EntityId,
    pub weapon_name: String,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub facing_yaw: f32,
    pub pitch: Option<f32>,
    pub team: String,
}

/// Gameplay annotation or killfeed-style overlay event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscreteEvent {
    pub round_index: RoundIndex,
    #[serde(rename = "type")]
    pub event_type: String,
    pub start_tick: Tick,
    /// Set for events spanning a tick range, absent for instants
    pub end_tick: Option<Tick>,
    pub actor_entity_id: Option<EntityId>,
    pub victim_entity_id: Option<EntityId>,
    /// Free-form event payload from the parser
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Match-level metadata served once per match by the backing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchMeta {
    pub match_id: Uuid,
    pub map_name: String,
    /// Fixed simulation rate the match was recorded at
    #[serde(default = "default_tick_rate")]
    pub ticks_per_second: u32,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    /// Ordered round list, immutable for the playback session
    pub rounds: Vec<RoundInfo>,
}

impl MatchMeta {
    /// First tick of the match (start of the first round).
    pub fn min_tick(&self) -> Tick {
        self.rounds.first().map(|r| r.start_tick).unwrap_or(0)
    }

    /// Last tick of the match (end of the final round).
    pub fn max_tick(&self) -> Tick {
        self.rounds.last().map(|r| r.end_tick).unwrap_or(0)
    }
}

fn default_tick_rate() -> u32 {
    crate::util::time::DEFAULT_TICKS_PER_SECOND
}

/// Accepts a held-weapon field as either a plain string or the legacy
/// one-element array form, normalizing to a single name at the ingestion
/// boundary. Empty strings and empty arrays deserialize to `None`.
fn de_weapon_name<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        One(String),
        Many(Vec<String>),
    }

    let raw: Option<Raw> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(Raw::One(name)) if !name.is_empty() => Some(name),
        Some(Raw::Many(names)) => names.into_iter().find(|n| !n.is_empty()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_contains_is_inclusive() {
        let round = RoundInfo {
            round_index: 0,
            start_tick: 100,
            end_tick: 200,
            freeze_end_tick: Some(120),
        };
        assert!(round.contains(100));
        assert!(round.contains(200));
        assert!(!round.contains(99));
        assert!(!round.contains(201));
    }

    #[test]
    fn landing_tick_prefers_freeze_end() {
        let with_freeze = RoundInfo {
            round_index: 1,
            start_tick: 641,
            end_tick: 1280,
            freeze_end_tick: Some(700),
        };
        let without_freeze = RoundInfo {
            round_index: 1,
            start_tick: 641,
            end_tick: 1280,
            freeze_end_tick: None,
        };
        assert_eq!(with_freeze.landing_tick(), 700);
        assert_eq!(without_freeze.landing_tick(), 641);
    }

    #[test]
    fn held_weapon_accepts_string_form() {
        let sample: PositionSample = serde_json::from_str(
            r#"{"tick":10,"entity_id":7,"x":1.0,"y":2.0,"z":3.0,
                "facing_yaw":90.0,"team":"attackers","display_name":"alice",
                "health":100,"armor":50,"held_weapon":"ak47"}"#,
        )
        .unwrap();
        assert_eq!(sample.held_weapon.as_deref(), Some("ak47"));
    }

    #[test]
    fn held_weapon_normalizes_legacy_array_form() {
        let sample: PositionSample = serde_json::from_str(
            r#"{"tick":10,"entity_id":7,"x":1.0,"y":2.0,"z":3.0,
                "facing_yaw":null,"team":"attackers","display_name":"alice",
                "health":null,"armor":null,"held_weapon":["m4a1","knife"]}"#,
        )
        .unwrap();
        assert_eq!(sample.held_weapon.as_deref(), Some("m4a1"));
    }

    #[test]
    fn held_weapon_missing_or_empty_is_none() {
        let sample: PositionSample = serde_json::from_str(
            r#"{"tick":10,"entity_id":7,"x":1.0,"y":2.0,"z":3.0,
                "facing_yaw":null,"team":"defenders","display_name":"bob",
                "health":null,"armor":null}"#,
        )
        .unwrap();
        assert_eq!(sample.held_weapon, None);

        let sample: PositionSample = serde_json::from_str(
            r#"{"tick":10,"entity_id":7,"x":1.0,"y":2.0,"z":3.0,
                "facing_yaw":null,"team":"defenders","display_name":"bob",
                "health":null,"armor":null,"held_weapon":[]}"#,
        )
        .unwrap();
        assert_eq!(sample.held_weapon, None);
    }

    #[test]
    fn discrete_event_metadata_defaults_to_null() {
        let event: DiscreteEvent = serde_json::from_str(
            r#"{"round_index":0,"type":"kill","start_tick":500,
                "end_tick":null,"actor_entity_id":7,"victim_entity_id":9}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "kill");
        assert!(event.metadata.is_null());
    }
}
