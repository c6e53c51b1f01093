//! Resident sample storage for loaded rounds

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use super::types::{
    DiscreteEvent, EntityId, ObjectId, PositionSample, RoundIndex, RoundInfo, ThrownObjectLifecycleEvent,
    ThrownObjectSample, Tick, WeaponFireSample,
};

/// Everything the backing store returns for one round, collected before the
/// merge so partial fetches are never observable.
#[derive(Debug, Clone, Default)]
pub struct RoundData {
    pub positions: Vec<PositionSample>,
    pub events: Vec<DiscreteEvent>,
    pub thrown_trajectory: Vec<ThrownObjectSample>,
    pub thrown_lifecycle: Vec<ThrownObjectLifecycleEvent>,
    pub weapon_fire: Vec<WeaponFireSample>,
}

/// Owned store for the sample sets of whichever rounds are currently
/// resident. Mutated only by loader merges and window-manager evictions;
/// everything else reads.
///
/// Positions live in a tick-to-entity index (the samples themselves do not
/// carry a round index), so eviction scrubs them by tick-range membership.
/// The other four sample kinds are kept as per-round lists.
pub struct RoundDataStore {
    positions: BTreeMap<Tick, HashMap<EntityId, PositionSample>>,
    /// Per-entity tick index for bracketing lookups
    entity_ticks: HashMap<EntityId, BTreeSet<Tick>>,
    events: BTreeMap<RoundIndex, Vec<DiscreteEvent>>,
    thrown_trajectory: BTreeMap<RoundIndex, Vec<ThrownObjectSample>>,
    thrown_lifecycle: BTreeMap<RoundIndex, Vec<ThrownObjectLifecycleEvent>>,
    weapon_fire: BTreeMap<RoundIndex, Vec<WeaponFireSample>>,
}

impl RoundDataStore {
    pub fn new() -> Self {
        Self {
            positions: BTreeMap::new(),
            entity_ticks: HashMap::new(),
            events: BTreeMap::new(),
            thrown_trajectory: BTreeMap::new(),
            thrown_lifecycle: BTreeMap::new(),
            weapon_fire: BTreeMap::new(),
        }
    }

    /// Insert all of a round's samples. Called exactly once per resident
    /// round; a round that produced zero rows for some kind simply
    /// contributes nothing for that kind.
    pub fn merge_insert(&mut self, round_index: RoundIndex, data: RoundData) {
        debug!(
            round_index,
            positions = data.positions.len(),
            events = data.events.len(),
            trajectory = data.thrown_trajectory.len(),
            lifecycle = data.thrown_lifecycle.len(),
            weapon_fire = data.weapon_fire.len(),
            "Merging round data"
        );

        for sample in data.positions {
            self.entity_ticks
                .entry(sample.entity_id)
                .or_default()
                .insert(sample.tick);
            self.positions
                .entry(sample.tick)
                .or_default()
                .insert(sample.entity_id, sample);
        }

        if !data.events.is_empty() {
            self.events
                .entry(round_index)
                .or_default()
                .extend(data.events);
        }
        if !data.thrown_trajectory.is_empty() {
            self.thrown_trajectory
                .entry(round_index)
                .or_default()
                .extend(data.thrown_trajectory);
        }
        if !data.thrown_lifecycle.is_empty() {
            self.thrown_lifecycle
                .entry(round_index)
                .or_default()
                .extend(data.thrown_lifecycle);
        }
        if !data.weapon_fire.is_empty() {
            self.weapon_fire
                .entry(round_index)
                .or_default()
                .extend(data.weapon_fire);
        }
    }

    /// Remove every sample belonging to `round`. Positions are scrubbed by
    /// tick-range membership in the round; per-round lists are dropped by
    /// index. Evicting a round with nothing resident is a no-op.
    pub fn evict(&mut self, round: &RoundInfo) {
        let ticks_to_remove: Vec<Tick> = self
            .positions
            .range(round.start_tick..=round.end_tick)
            .map(|(tick, _)| *tick)
            .collect();

        let mut removed = 0usize;
        for tick in ticks_to_remove {
            if let Some(by_entity) = self.positions.remove(&tick) {
                removed += by_entity.len();
                for entity_id in by_entity.keys() {
                    if let Some(ticks) = self.entity_ticks.get_mut(entity_id) {
                        ticks.remove(&tick);
                        if ticks.is_empty() {
                            self.entity_ticks.remove(entity_id);
                        }
                    }
                }
            }
        }

        self.events.remove(&round.round_index);
        self.thrown_trajectory.remove(&round.round_index);
        self.thrown_lifecycle.remove(&round.round_index);
        self.weapon_fire.remove(&round.round_index);

        debug!(
            round_index = round.round_index,
            positions_removed = removed,
            "Evicted round data"
        );
    }

    /// All resident position ticks for an entity, in ascending order.
    pub fn position_ticks_for_entity(&self, entity_id: EntityId) -> Vec<Tick> {
        self.entity_ticks
            .get(&entity_id)
            .map(|ticks| ticks.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Exact-tick lookup of every entity sampled at `tick`.
    pub fn positions_at(&self, tick: Tick) -> Option<&HashMap<EntityId, PositionSample>> {
        self.positions.get(&tick)
    }

    /// The sample at the greatest resident tick at or below `tick`.
    pub fn lower_position(&self, entity_id: EntityId, tick: Tick) -> Option<&PositionSample> {
        let at = *self.entity_ticks.get(&entity_id)?.range(..=tick).next_back()?;
        self.positions.get(&at)?.get(&entity_id)
    }

    /// The sample at the smallest resident tick at or above `tick`.
    pub fn upper_position(&self, entity_id: EntityId, tick: Tick) -> Option<&PositionSample> {
        let at = *self.entity_ticks.get(&entity_id)?.range(tick..).next()?;
        self.positions.get(&at)?.get(&entity_id)
    }

    /// All entities with at least one resident position sample, ascending.
    pub fn entities(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.entity_ticks.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Events whose `start_tick` falls within `tick` ± `window_ticks`.
    pub fn events_near(&self, tick: Tick, window_ticks: Tick) -> Vec<&DiscreteEvent> {
        let low = tick.saturating_sub(window_ticks);
        let high = tick.saturating_add(window_ticks);
        self.events
            .values()
            .flatten()
            .filter(|e| e.start_tick >= low && e.start_tick <= high)
            .collect()
    }

    /// Lifecycle events within `tick` ± `window_ticks`.
    pub fn lifecycle_events_near(
        &self,
        tick: Tick,
        window_ticks: Tick,
    ) -> Vec<&ThrownObjectLifecycleEvent> {
        let low = tick.saturating_sub(window_ticks);
        let high = tick.saturating_add(window_ticks);
        self.thrown_lifecycle
            .values()
            .flatten()
            .filter(|e| e.tick >= low && e.tick <= high)
            .collect()
    }

    /// Weapon-fire samples within `tick` ± `window_ticks`.
    pub fn weapon_fire_near(&self, tick: Tick, window_ticks: Tick) -> Vec<&WeaponFireSample> {
        let low = tick.saturating_sub(window_ticks);
        let high = tick.saturating_add(window_ticks);
        self.weapon_fire
            .values()
            .flatten()
            .filter(|s| s.tick >= low && s.tick <= high)
            .collect()
    }

    /// One thrown object's resident trajectory, in ascending tick order.
    /// Per-round lists are tick-ordered and iterated in round order, so no
    /// re-sort is needed.
    pub fn thrown_samples_for_object(&self, object_id: ObjectId) -> Vec<&ThrownObjectSample> {
        self.thrown_trajectory
            .values()
            .flatten()
            .filter(|s| s.object_id == object_id)
            .collect()
    }

    /// All thrown objects with any resident trajectory sample, ascending.
    pub fn resident_object_ids(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .thrown_trajectory
            .values()
            .flatten()
            .map(|s| s.object_id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// Total resident position samples, for diagnostics.
    pub fn resident_position_count(&self) -> usize {
        self.positions.values().map(|m| m.len()).sum()
    }
}

impl Default for RoundDataStore {
    fn default() -> Self {
        Self::new()
    }
}
