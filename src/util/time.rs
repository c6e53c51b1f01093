//! Time utilities for playback

use std::time::Instant;

/// Tick rate assumed when match metadata does not carry one.
pub const DEFAULT_TICKS_PER_SECOND: u32 = 64;

/// A simple timer for measuring frame deltas
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    pub fn reset(&mut self) {
        self.start = Instant::now();
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
