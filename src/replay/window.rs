//! Round residency control around the playback position

use std::cmp::Reverse;
use std::sync::Arc;

use tracing::{debug, info};

use super::loader::RoundLoader;
use super::types::{RoundIndex, RoundInfo, Tick};

/// How many rounds to each side of the active round stay resident.
const RETENTION_RADIUS: usize = 1;

/// Decides which rounds must be resident for the current playback tick:
/// the active round plus its immediate neighbors. Bounding residency to
/// three rounds keeps memory roughly constant regardless of match length
/// while pre-warming the next round during forward playback.
pub struct WindowManager {
    rounds: Vec<RoundInfo>,
    loader: Arc<RoundLoader>,
    active_round: Option<RoundIndex>,
}

impl WindowManager {
    /// `rounds` is the match's ordered round list, immutable for the
    /// session.
    pub fn new(rounds: Vec<RoundInfo>, loader: Arc<RoundLoader>) -> Self {
        Self {
            rounds,
            loader,
            active_round: None,
        }
    }

    pub fn active_round(&self) -> Option<RoundIndex> {
        self.active_round
    }

    /// Compute the initial window and load it before the first render.
    /// Neighbor load failures are non-fatal; they are retried on the next
    /// window recomputation that still wants them.
    pub async fn on_session_start(&mut self, initial_tick: Tick) {
        let Some(position) = self.position_for_tick(initial_tick) else {
            return;
        };
        let active = self.rounds[position].round_index;
        self.active_round = Some(active);
        info!(round_index = active, tick = initial_tick, "Starting playback session");

        let loads = self
            .window_positions(position)
            .into_iter()
            .map(|p| self.rounds[p].round_index)
            .map(|round_index| {
                let loader = self.loader.clone();
                async move { loader.load(round_index).await }
            });
        futures::future::join_all(loads).await;
    }

    /// React to a playback position change. When the active round changes,
    /// request loads for the new retention window and evict loaded rounds
    /// that fell more than one round away. Decisions are taken once per
    /// change from a single view of residency; the I/O itself runs in
    /// background tasks.
    pub fn on_tick_changed(&mut self, tick: Tick) {
        let Some(position) = self.position_for_tick(tick) else {
            return;
        };
        let active = self.rounds[position].round_index;
        if self.active_round == Some(active) {
            return;
        }
        self.active_round = Some(active);
        debug!(round_index = active, tick, "Active round changed");

        let window = self.window_positions(position);

        // Evict first so peak residency never exceeds window + 1 rounds.
        // Rounds still loading are left alone; the next change sweeps them.
        for (p, round) in self.rounds.iter().enumerate() {
            if !window.contains(&p) && self.loader.is_loaded(round.round_index) {
                self.loader.evict(round);
            }
        }

        for p in window {
            let round_index = self.rounds[p].round_index;
            if !self.loader.is_loaded(round_index) && !self.loader.is_loading(round_index) {
                let loader = self.loader.clone();
                tokio::spawn(async move {
                    loader.load(round_index).await;
                });
            }
        }
    }

    /// Positions (indices into the round list) of the retention window
    /// around the active position.
    fn window_positions(&self, active: usize) -> Vec<usize> {
        let lo = active.saturating_sub(RETENTION_RADIUS);
        let hi = (active + RETENTION_RADIUS).min(self.rounds.len() - 1);
        (lo..=hi).collect()
    }

    /// The round containing `tick`, or the nearest round when the tick
    /// falls between rounds or outside the match. Ties resolve toward the
    /// later round, since forward playback is about to need it.
    fn position_for_tick(&self, tick: Tick) -> Option<usize> {
        if self.rounds.is_empty() {
            return None;
        }
        if let Some(position) = self.rounds.iter().position(|r| r.contains(tick)) {
            return Some(position);
        }

        self.rounds
            .iter()
            .enumerate()
            .min_by_key(|(position, round)| {
                let distance = if tick < round.start_tick {
                    round.start_tick - tick
                } else {
                    tick - round.end_tick
                };
                (distance, Reverse(*position))
            })
            .map(|(position, _)| position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::data_store::RoundDataStore;
    use crate::replay::loader::LoadState;
    use crate::store::{RoundFetcher, StoreError};
    use crate::replay::types::{
        DiscreteEvent, EntityId, MatchMeta, PositionSample, ThrownObjectLifecycleEvent,
        ThrownObjectSample, WeaponFireSample,
    };
    use async_trait::async_trait;
    use parking_lot::RwLock;
    use std::time::Duration;
    use uuid::Uuid;

    const ROUND_TICKS: Tick = 640;

    /// Fetcher serving one synthetic sample per round, placed at the
    /// round's midpoint.
    struct FixtureFetcher;

    fn round_bounds(round_index: RoundIndex) -> (Tick, Tick) {
        let start = round_index * (ROUND_TICKS + 1);
        (start, start + ROUND_TICKS)
    }

    #[async_trait]
    impl RoundFetcher for FixtureFetcher {
        async fn fetch_match(&self, _match_id: Uuid) -> Result<MatchMeta, StoreError> {
            unimplemented!("window tests construct round lists directly")
        }

        async fn fetch_positions(
            &self,
            _match_id: Uuid,
            round_index: RoundIndex,
        ) -> Result<Vec<PositionSample>, StoreError> {
            let (start, end) = round_bounds(round_index);
            Ok(vec![PositionSample {
                tick: (start + end) / 2,
                entity_id: 1 as EntityId,
                x: round_index as f32,
                y: 0.0,
                z: 0.0,
                facing_yaw: None,
                team: "attackers".to_string(),
                display_name: "p1".to_string(),
                health: Some(100),
                armor: None,
                held_weapon: None,
            }])
        }

        async fn fetch_events(
            &self,
            _match_id: Uuid,
            _round_index: RoundIndex,
        ) -> Result<Vec<DiscreteEvent>, StoreError> {
            Ok(Vec::new())
        }

        async fn fetch_thrown_trajectory(
            &self,
            _match_id: Uuid,
            _round_index: RoundIndex,
        ) -> Result<Vec<ThrownObjectSample>, StoreError> {
            Ok(Vec::new())
        }

        async fn fetch_thrown_lifecycle(
            &self,
            _match_id: Uuid,
            _round_index: RoundIndex,
        ) -> Result<Vec<ThrownObjectLifecycleEvent>, StoreError> {
            Ok(Vec::new())
        }

        async fn fetch_weapon_fire(
            &self,
            _match_id: Uuid,
            _round_index: RoundIndex,
        ) -> Result<Vec<WeaponFireSample>, StoreError> {
            Ok(Vec::new())
        }
    }

    fn rounds(count: RoundIndex) -> Vec<RoundInfo> {
        (0..count)
            .map(|round_index| {
                let (start_tick, end_tick) = round_bounds(round_index);
                RoundInfo {
                    round_index,
                    start_tick,
                    end_tick,
                    freeze_end_tick: Some(start_tick + 64),
                }
            })
            .collect()
    }

    fn manager(round_count: RoundIndex) -> (WindowManager, Arc<RoundLoader>, Arc<RwLock<RoundDataStore>>) {
        let data = Arc::new(RwLock::new(RoundDataStore::new()));
        let loader = Arc::new(RoundLoader::new(
            Arc::new(FixtureFetcher),
            data.clone(),
            Uuid::new_v4(),
        ));
        (
            WindowManager::new(rounds(round_count), loader.clone()),
            loader,
            data,
        )
    }

    /// Background loads are spawned, not awaited; poll until they settle.
    async fn wait_for_loaded(loader: &RoundLoader, round_index: RoundIndex) {
        for _ in 0..200 {
            if loader.is_loaded(round_index) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        panic!("round {round_index} never finished loading");
    }

    #[tokio::test]
    async fn session_start_loads_active_round_and_valid_neighbors() {
        let (mut window, loader, _) = manager(4);

        window.on_session_start(50).await;

        assert_eq!(window.active_round(), Some(0));
        assert!(loader.is_loaded(0));
        assert!(loader.is_loaded(1));
        assert_eq!(loader.load_state(2), LoadState::Unloaded);
        assert_eq!(loader.load_state(3), LoadState::Unloaded);
    }

    #[tokio::test]
    async fn moving_into_a_new_round_shifts_the_window_and_evicts() {
        let (mut window, loader, data) = manager(4);
        window.on_session_start(50).await;

        // Move the playback position into round 2
        let (r2_start, _) = round_bounds(2);
        window.on_tick_changed(r2_start + 10);
        for r in 1..=3 {
            wait_for_loaded(&loader, r).await;
        }

        assert_eq!(window.active_round(), Some(2));
        assert_eq!(loader.load_state(0), LoadState::Unloaded);

        // Round 0's samples are gone; rounds 1-3 are intact
        let store = data.read();
        let ticks = store.position_ticks_for_entity(1);
        let (r0_start, r0_end) = round_bounds(0);
        assert!(ticks.iter().all(|t| *t < r0_start || *t > r0_end));
        assert_eq!(ticks.len(), 3);
    }

    #[tokio::test]
    async fn far_jump_evicts_everything_outside_the_new_window() {
        let (mut window, loader, data) = manager(7);
        window.on_session_start(50).await;

        let (r5_start, _) = round_bounds(5);
        window.on_tick_changed(r5_start + 1);
        for r in 4..=6 {
            wait_for_loaded(&loader, r).await;
        }

        for r in 0..=3 {
            assert_eq!(loader.load_state(r), LoadState::Unloaded, "round {r}");
        }
        assert_eq!(data.read().resident_position_count(), 3);
    }

    #[tokio::test]
    async fn unchanged_active_round_is_a_noop() {
        let (mut window, loader, _) = manager(4);
        window.on_session_start(50).await;

        // Ticks within round 0 never re-trigger window recomputation
        window.on_tick_changed(100);
        window.on_tick_changed(600);
        assert_eq!(window.active_round(), Some(0));
        assert!(loader.is_loaded(0));
        assert!(loader.is_loaded(1));
    }

    #[tokio::test]
    async fn tick_between_rounds_activates_the_later_round() {
        // Round list with a capture gap between rounds 0 and 1
        let gapped = vec![
            RoundInfo {
                round_index: 0,
                start_tick: 0,
                end_tick: 600,
                freeze_end_tick: None,
            },
            RoundInfo {
                round_index: 1,
                start_tick: 800,
                end_tick: 1400,
                freeze_end_tick: None,
            },
        ];
        let data = Arc::new(RwLock::new(RoundDataStore::new()));
        let loader = Arc::new(RoundLoader::new(
            Arc::new(FixtureFetcher),
            data,
            Uuid::new_v4(),
        ));
        let mut window = WindowManager::new(gapped, loader);

        // 700 is equidistant from both rounds; the later one wins
        window.on_session_start(700).await;
        assert_eq!(window.active_round(), Some(1));
    }

    #[tokio::test]
    async fn ticks_outside_the_match_clamp_to_the_edge_rounds() {
        let (mut window, _, _) = manager(4);
        window.on_session_start(0).await;
        assert_eq!(window.active_round(), Some(0));

        let (_, last_end) = round_bounds(3);
        window.on_tick_changed(last_end + 5000);
        assert_eq!(window.active_round(), Some(3));
    }
}
