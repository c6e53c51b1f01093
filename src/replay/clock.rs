//! Variable-speed timeline clock

use super::types::Tick;

/// Largest wall-clock gap a single frame may contribute, so a backgrounded
/// consumer does not jump the timeline when frames resume.
const MAX_FRAME_DELTA_MS: f64 = 100.0;

const MIN_SPEED: f64 = 0.1;
const MAX_SPEED: f64 = 10.0;

/// Advances the current tick over wall-clock time at a configurable speed
/// multiplier. A fractional accumulator carries sub-tick remainders between
/// frames so playback does not drift.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    current_tick: Tick,
    is_playing: bool,
    speed_multiplier: f64,
    min_tick: Tick,
    max_tick: Tick,
    ticks_per_second: u32,
    accumulator: f64,
}

impl PlaybackClock {
    pub fn new(min_tick: Tick, max_tick: Tick, ticks_per_second: u32) -> Self {
        Self {
            current_tick: min_tick,
            is_playing: false,
            speed_multiplier: 1.0,
            min_tick,
            max_tick,
            ticks_per_second,
            accumulator: 0.0,
        }
    }

    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn speed(&self) -> f64 {
        self.speed_multiplier
    }

    pub fn min_tick(&self) -> Tick {
        self.min_tick
    }

    pub fn max_tick(&self) -> Tick {
        self.max_tick
    }

    /// Start or resume playback. At the end of the timeline this restarts
    /// from the beginning rather than doing nothing.
    pub fn play(&mut self) {
        if self.current_tick >= self.max_tick {
            self.current_tick = self.min_tick;
            self.accumulator = 0.0;
        }
        self.is_playing = true;
    }

    /// Pause playback, retaining the current position.
    pub fn pause(&mut self) {
        self.is_playing = false;
    }

    /// Stop playback and reset to the start of the timeline.
    pub fn stop(&mut self) {
        self.is_playing = false;
        self.current_tick = self.min_tick;
        self.accumulator = 0.0;
    }

    /// Move the playback position, clamping silently to the timeline
    /// bounds. Valid whether playing or paused.
    pub fn seek(&mut self, tick: Tick) {
        self.current_tick = tick.clamp(self.min_tick, self.max_tick);
        self.accumulator = 0.0;
    }

    /// Change the speed multiplier, clamped to a sane range. Takes effect on
    /// the next advance; the accumulator is left alone so changing speed
    /// mid-playback never jumps the position.
    pub fn set_speed(&mut self, multiplier: f64) {
        self.speed_multiplier = multiplier.clamp(MIN_SPEED, MAX_SPEED);
    }

    /// Advance the clock by one render frame's wall-clock delta. Returns the
    /// tick after advancing. Reaching `max_tick` clamps there and pauses.
    pub fn advance(&mut self, wall_delta_ms: f64) -> Tick {
        if !self.is_playing {
            return self.current_tick;
        }

        let delta_ms = wall_delta_ms.clamp(0.0, MAX_FRAME_DELTA_MS);
        self.accumulator +=
            self.ticks_per_second as f64 * self.speed_multiplier * delta_ms / 1000.0;

        if self.accumulator >= 1.0 {
            let whole = self.accumulator.floor();
            self.accumulator -= whole;

            let target = self.current_tick as u64 + whole as u64;
            if target >= self.max_tick as u64 {
                self.current_tick = self.max_tick;
                self.pause();
            } else {
                self.current_tick = target as Tick;
            }
        }

        self.current_tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_advances_accumulate_without_drift() {
        let mut clock = PlaybackClock::new(0, 1280, 64);
        clock.play();

        // 10ms at 64 tps is 0.64 ticks; the first frame carries a remainder
        assert_eq!(clock.advance(10.0), 0);
        assert_eq!(clock.advance(10.0), 1);

        // 100 frames of 10ms = 1 second = 64 ticks total
        let mut clock = PlaybackClock::new(0, 1280, 64);
        clock.play();
        for _ in 0..100 {
            clock.advance(10.0);
        }
        assert_eq!(clock.current_tick(), 64);
    }

    #[test]
    fn long_frame_gaps_are_capped() {
        let mut clock = PlaybackClock::new(0, 1280, 64);
        clock.play();

        // 5 seconds backgrounded counts as one 100ms frame
        clock.advance(5000.0);
        assert_eq!(clock.current_tick(), 6);
    }

    #[test]
    fn speed_multiplier_scales_advance() {
        let mut clock = PlaybackClock::new(0, 1280, 64);
        clock.set_speed(4.0);
        clock.play();

        clock.advance(100.0); // 0.1s * 64 tps * 4x = 25.6 ticks
        assert_eq!(clock.current_tick(), 25);
    }

    #[test]
    fn speed_change_keeps_the_accumulator() {
        let mut clock = PlaybackClock::new(0, 1280, 64);
        clock.play();

        clock.advance(10.0); // accumulator 0.64
        clock.set_speed(2.0);
        clock.advance(10.0); // + 1.28 = 1.92 -> one whole tick
        assert_eq!(clock.current_tick(), 1);
    }

    #[test]
    fn speed_is_clamped_to_sane_range() {
        let mut clock = PlaybackClock::new(0, 100, 64);
        clock.set_speed(100.0);
        assert_eq!(clock.speed(), 10.0);
        clock.set_speed(0.0);
        assert_eq!(clock.speed(), 0.1);
    }

    #[test]
    fn reaching_the_end_clamps_and_pauses_once() {
        let mut clock = PlaybackClock::new(0, 10, 64);
        clock.play();

        // 1 second at 64 tps would run far past max_tick
        for _ in 0..10 {
            clock.advance(100.0);
        }
        assert_eq!(clock.current_tick(), 10);
        assert!(!clock.is_playing());

        // Further advances while paused change nothing
        assert_eq!(clock.advance(100.0), 10);
        assert!(!clock.is_playing());
    }

    #[test]
    fn play_at_end_restarts_from_the_beginning() {
        let mut clock = PlaybackClock::new(5, 10, 64);
        clock.seek(10);
        clock.play();
        assert_eq!(clock.current_tick(), 5);
        assert!(clock.is_playing());
    }

    #[test]
    fn stop_resets_to_min_tick() {
        let mut clock = PlaybackClock::new(5, 100, 64);
        clock.seek(50);
        clock.play();
        clock.stop();
        assert_eq!(clock.current_tick(), 5);
        assert!(!clock.is_playing());
    }

    #[test]
    fn seek_clamps_silently() {
        let mut clock = PlaybackClock::new(10, 100, 64);
        clock.seek(5);
        assert_eq!(clock.current_tick(), 10);
        clock.seek(500);
        assert_eq!(clock.current_tick(), 100);
        clock.seek(42);
        assert_eq!(clock.current_tick(), 42);
    }
}
