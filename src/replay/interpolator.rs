//! Tick-to-state interpolation over the resident sample store

use tracing::trace;

use super::data_store::RoundDataStore;
use super::types::{EntityId, ObjectId, PositionSample, RoundInfo, ThrownObjectSample, Tick};

/// Where a playback tick lands after resolving round boundaries.
struct ResolvedTick {
    effective_tick: Tick,
    is_round_transition: bool,
}

/// Produces continuous state estimates from the sparse samples currently
/// resident in a [`RoundDataStore`].
///
/// Results are pure given the store contents; callers must not cache them
/// across residency changes, since evictions can change which brackets
/// exist.
pub struct Interpolator {
    rounds: Vec<RoundInfo>,
}

impl Interpolator {
    /// `rounds` is the match's ordered, immutable round list.
    pub fn new(rounds: Vec<RoundInfo>) -> Self {
        Self { rounds }
    }

    /// Estimate an entity's state at `tick`, or `None` when no resident
    /// sample brackets it. Position blends linearly between the bracketing
    /// samples; discrete attributes take the tick-closer sample. Across a
    /// round boundary the state teleports to the next round's spawn rather
    /// than blending through the respawn discontinuity.
    pub fn state_at(
        &self,
        store: &RoundDataStore,
        entity_id: EntityId,
        tick: Tick,
    ) -> Option<PositionSample> {
        let resolved = self.resolve_tick(store, entity_id, tick);
        let effective_tick = resolved.effective_tick;

        let lower = store.lower_position(entity_id, effective_tick);
        let upper = store.upper_position(entity_id, effective_tick);

        let (lower, upper) = match (lower, upper) {
            (None, None) => return None,
            // No extrapolation: a single-sided bracket is returned verbatim
            (Some(only), None) | (None, Some(only)) => return Some(only.clone()),
            (Some(lower), Some(upper)) => (lower, upper),
        };

        if lower.tick == effective_tick {
            return Some(lower.clone());
        }

        if resolved.is_round_transition {
            trace!(entity_id, tick, landing = upper.tick, "Round transition teleport");
            return Some(upper.clone());
        }

        Some(blend(lower, upper, effective_tick))
    }

    /// States for every entity with any resident sample, omitting entities
    /// with nothing at this tick.
    pub fn all_states_at(&self, store: &RoundDataStore, tick: Tick) -> Vec<PositionSample> {
        store
            .entities()
            .into_iter()
            .filter_map(|entity_id| self.state_at(store, entity_id, tick))
            .collect()
    }

    /// Estimate an in-flight thrown object's position at `tick`. Unlike
    /// players, a thrown object exists only between its first and last
    /// trajectory samples; outside that span this returns `None`.
    pub fn thrown_object_state_at(
        &self,
        store: &RoundDataStore,
        object_id: ObjectId,
        tick: Tick,
    ) -> Option<ThrownObjectSample> {
        let samples = store.thrown_samples_for_object(object_id);
        let (first, last) = (samples.first()?, samples.last()?);
        if tick < first.tick || tick > last.tick {
            return None;
        }

        let idx = samples.partition_point(|s| s.tick <= tick);
        let lower = samples[idx - 1];
        if lower.tick == tick || idx == samples.len() {
            return Some(lower.clone());
        }
        let upper = samples[idx];

        let f = fraction(lower.tick, upper.tick, tick);
        Some(ThrownObjectSample {
            tick,
            object_id,
            kind: lower.kind.clone(),
            x: lerp(lower.x, upper.x, f),
            y: lerp(lower.y, upper.y, f),
            z: lerp(lower.z, upper.z, f),
            owner_entity_id: lower.owner_entity_id,
        })
    }

    /// Positions of every thrown object in flight at `tick`.
    pub fn all_thrown_object_states(
        &self,
        store: &RoundDataStore,
        tick: Tick,
    ) -> Vec<ThrownObjectSample> {
        store
            .resident_object_ids()
            .into_iter()
            .filter_map(|object_id| self.thrown_object_state_at(store, object_id, tick))
            .collect()
    }

    /// Map a raw playback tick to the tick interpolation should evaluate
    /// at, detecting round transitions.
    ///
    /// A tick is a transition when it sits in the gap after a round's end,
    /// or inside a round the entity has produced no sample for yet (its
    /// nearest lower sample still belongs to the previous round). Either
    /// way the landing tick is the round's freeze end, falling back to its
    /// start. Ticks before the first round clamp to the first round's
    /// landing tick.
    fn resolve_tick(&self, store: &RoundDataStore, entity_id: EntityId, tick: Tick) -> ResolvedTick {
        let Some(first) = self.rounds.first() else {
            return ResolvedTick {
                effective_tick: tick,
                is_round_transition: false,
            };
        };

        if tick < first.start_tick {
            return ResolvedTick {
                effective_tick: first.landing_tick(),
                is_round_transition: false,
            };
        }

        if let Some(round) = self.rounds.iter().find(|r| r.contains(tick)) {
            let entered_without_samples = round.round_index != first.round_index
                && store
                    .lower_position(entity_id, tick)
                    .is_some_and(|s| s.tick < round.start_tick);
            if entered_without_samples {
                return ResolvedTick {
                    effective_tick: round.landing_tick(),
                    is_round_transition: true,
                };
            }
            return ResolvedTick {
                effective_tick: tick,
                is_round_transition: false,
            };
        }

        // Between rounds: land on the next round's spawn state
        if let Some(next) = self.rounds.iter().find(|r| r.start_tick > tick) {
            return ResolvedTick {
                effective_tick: next.landing_tick(),
                is_round_transition: true,
            };
        }

        // Past the last round; bracketing degrades to the final sample
        ResolvedTick {
            effective_tick: tick,
            is_round_transition: false,
        }
    }
}

/// Lerp position, take discrete attributes from the tick-closer sample
/// (ties resolve to the lower one).
fn blend(lower: &PositionSample, upper: &PositionSample, tick: Tick) -> PositionSample {
    let f = fraction(lower.tick, upper.tick, tick);
    let nearest = if tick - lower.tick <= upper.tick - tick {
        lower
    } else {
        upper
    };

    PositionSample {
        tick,
        entity_id: lower.entity_id,
        x: lerp(lower.x, upper.x, f),
        y: lerp(lower.y, upper.y, f),
        z: lerp(lower.z, upper.z, f),
        facing_yaw: nearest.facing_yaw,
        team: nearest.team.clone(),
        display_name: nearest.display_name.clone(),
        health: nearest.health,
        armor: nearest.armor,
        held_weapon: nearest.held_weapon.clone(),
    }
}

fn fraction(lower: Tick, upper: Tick, at: Tick) -> f32 {
    (at - lower) as f32 / (upper - lower) as f32
}

fn lerp(a: f32, b: f32, f: f32) -> f32 {
    a + (b - a) * f
}
