//! Asynchronous per-round data loading

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use super::data_store::{RoundData, RoundDataStore};
use super::types::{RoundIndex, RoundInfo};
use crate::store::{RoundFetcher, StoreError};

/// Per-round load state. Absence from the loader's map means `Unloaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Unloaded,
    Loading,
    Loaded,
}

/// Fetches a round's five sample sets from the backing store and merges
/// them into the shared [`RoundDataStore`].
///
/// Load state is shared across every caller, so duplicate concurrent
/// requests for the same round collapse to a single fetch. A failed fetch
/// leaves the round unloaded and is retried whenever the round is next
/// requested; a partially failed fetch never reaches the store.
pub struct RoundLoader {
    fetcher: Arc<dyn RoundFetcher>,
    data: Arc<RwLock<RoundDataStore>>,
    match_id: Uuid,
    states: DashMap<RoundIndex, LoadState>,
}

impl RoundLoader {
    pub fn new(
        fetcher: Arc<dyn RoundFetcher>,
        data: Arc<RwLock<RoundDataStore>>,
        match_id: Uuid,
    ) -> Self {
        Self {
            fetcher,
            data,
            match_id,
            states: DashMap::new(),
        }
    }

    pub fn load_state(&self, round_index: RoundIndex) -> LoadState {
        self.states
            .get(&round_index)
            .map(|s| *s)
            .unwrap_or(LoadState::Unloaded)
    }

    pub fn is_loaded(&self, round_index: RoundIndex) -> bool {
        self.load_state(round_index) == LoadState::Loaded
    }

    pub fn is_loading(&self, round_index: RoundIndex) -> bool {
        self.load_state(round_index) == LoadState::Loading
    }

    /// Load a round's data. No-op if the round is already loaded or a load
    /// is in flight anywhere else.
    pub async fn load(&self, round_index: RoundIndex) {
        // Claim the round before any I/O so concurrent requests collapse
        match self.states.entry(round_index) {
            Entry::Occupied(_) => return,
            Entry::Vacant(vacant) => {
                vacant.insert(LoadState::Loading);
            }
        }

        match self.fetch_round(round_index).await {
            Ok(data) => {
                self.data.write().merge_insert(round_index, data);
                self.states.insert(round_index, LoadState::Loaded);
                info!(round_index, "Round loaded");
            }
            Err(err) => {
                // Retriable: the next request for this round fetches again
                warn!(round_index, error = %err, "Round load failed");
                self.states.remove(&round_index);
            }
        }
    }

    /// Drop a round's samples from the store and reset its load state.
    pub fn evict(&self, round: &RoundInfo) {
        self.data.write().evict(round);
        self.states.remove(&round.round_index);
    }

    /// The five per-round fetches are independent and issued concurrently;
    /// the round counts as loaded only once all five have returned.
    async fn fetch_round(&self, round_index: RoundIndex) -> Result<RoundData, StoreError> {
        let (positions, events, thrown_trajectory, thrown_lifecycle, weapon_fire) = futures::try_join!(
            self.fetcher.fetch_positions(self.match_id, round_index),
            self.fetcher.fetch_events(self.match_id, round_index),
            self.fetcher.fetch_thrown_trajectory(self.match_id, round_index),
            self.fetcher.fetch_thrown_lifecycle(self.match_id, round_index),
            self.fetcher.fetch_weapon_fire(self.match_id, round_index),
        )?;

        Ok(RoundData {
            positions,
            events,
            thrown_trajectory,
            thrown_lifecycle,
            weapon_fire,
        })
    }
}
