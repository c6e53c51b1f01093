//! Playback session facade consumed by the rendering layer

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::info;

use super::clock::PlaybackClock;
use super::data_store::RoundDataStore;
use super::interpolator::Interpolator;
use super::loader::RoundLoader;
use super::types::{
    DiscreteEvent, EntityId, MatchMeta, PositionSample, ThrownObjectLifecycleEvent,
    ThrownObjectSample, Tick, WeaponFireSample,
};
use super::window::WindowManager;
use crate::store::RoundFetcher;

/// Read-only playback state published for UI binding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackStatus {
    pub tick: Tick,
    pub is_playing: bool,
    pub speed: f64,
}

/// One scrubbable playback of a recorded match.
///
/// Ties the clock, residency window, and interpolator together behind the
/// surface the rendering layer consumes. Every query degrades to "no data"
/// rather than erroring: a round that failed to load simply yields no
/// states until the window manager retries it.
pub struct ReplaySession {
    meta: MatchMeta,
    data: Arc<RwLock<RoundDataStore>>,
    window: WindowManager,
    interpolator: Interpolator,
    clock: PlaybackClock,
    status_tx: watch::Sender<PlaybackStatus>,
}

impl ReplaySession {
    pub fn new(fetcher: Arc<dyn RoundFetcher>, meta: MatchMeta) -> Self {
        let data = Arc::new(RwLock::new(RoundDataStore::new()));
        let loader = Arc::new(RoundLoader::new(fetcher, data.clone(), meta.match_id));
        let window = WindowManager::new(meta.rounds.clone(), loader);
        let interpolator = Interpolator::new(meta.rounds.clone());
        let clock = PlaybackClock::new(meta.min_tick(), meta.max_tick(), meta.ticks_per_second);

        let (status_tx, _) = watch::channel(PlaybackStatus {
            tick: clock.current_tick(),
            is_playing: false,
            speed: clock.speed(),
        });

        Self {
            meta,
            data,
            window,
            interpolator,
            clock,
            status_tx,
        }
    }

    pub fn meta(&self) -> &MatchMeta {
        &self.meta
    }

    /// Load the initial retention window so playback never starts with an
    /// empty active round.
    pub async fn start(&mut self, initial_tick: Tick) {
        info!(
            match_id = %self.meta.match_id,
            map = %self.meta.map_name,
            rounds = self.meta.rounds.len(),
            "Opening replay session"
        );
        self.clock.seek(initial_tick);
        self.window.on_session_start(self.clock.current_tick()).await;
        self.publish_status();
    }

    pub fn play(&mut self) {
        self.clock.play();
        self.publish_status();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
        self.publish_status();
    }

    pub fn stop(&mut self) {
        self.clock.stop();
        self.window.on_tick_changed(self.clock.current_tick());
        self.publish_status();
    }

    /// Jump the playback position; the target is clamped to the match's
    /// tick range.
    pub fn seek(&mut self, tick: Tick) {
        self.clock.seek(tick);
        self.window.on_tick_changed(self.clock.current_tick());
        self.publish_status();
    }

    pub fn set_speed(&mut self, multiplier: f64) {
        self.clock.set_speed(multiplier);
        self.publish_status();
    }

    /// Advance the timeline by one render frame's wall-clock delta and
    /// keep the residency window tracking the position. Returns the tick
    /// after advancing.
    pub fn advance(&mut self, wall_delta_ms: f64) -> Tick {
        let tick = self.clock.advance(wall_delta_ms);
        self.window.on_tick_changed(tick);
        self.publish_status();
        tick
    }

    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    pub fn speed(&self) -> f64 {
        self.clock.speed()
    }

    /// Subscribe to playback status changes for UI binding.
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status_tx.subscribe()
    }

    /// Interpolated state for one entity, or `None` when nothing resident
    /// brackets the tick.
    pub fn entity_state(&self, entity_id: EntityId, tick: Tick) -> Option<PositionSample> {
        let data = self.data.read();
        self.interpolator.state_at(&data, entity_id, tick)
    }

    /// Interpolated states for every entity with resident data.
    pub fn all_entity_states(&self, tick: Tick) -> Vec<PositionSample> {
        let data = self.data.read();
        self.interpolator.all_states_at(&data, tick)
    }

    /// Events whose start tick falls within `tick` ± `window_ticks`.
    pub fn visible_events(&self, tick: Tick, window_ticks: Tick) -> Vec<DiscreteEvent> {
        let data = self.data.read();
        data.events_near(tick, window_ticks)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Positions of thrown objects in flight at `tick`.
    pub fn thrown_object_states(&self, tick: Tick) -> Vec<ThrownObjectSample> {
        let data = self.data.read();
        self.interpolator.all_thrown_object_states(&data, tick)
    }

    /// Thrown-object lifecycle events within `tick` ± `window_ticks`.
    pub fn thrown_lifecycle_events(
        &self,
        tick: Tick,
        window_ticks: Tick,
    ) -> Vec<ThrownObjectLifecycleEvent> {
        let data = self.data.read();
        data.lifecycle_events_near(tick, window_ticks)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Weapon discharges within `tick` ± `window_ticks`.
    pub fn weapon_fire(&self, tick: Tick, window_ticks: Tick) -> Vec<WeaponFireSample> {
        let data = self.data.read();
        data.weapon_fire_near(tick, window_ticks)
            .into_iter()
            .cloned()
            .collect()
    }

    fn publish_status(&self) {
        let status = PlaybackStatus {
            tick: self.clock.current_tick(),
            is_playing: self.clock.is_playing(),
            speed: self.clock.speed(),
        };
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }
}
