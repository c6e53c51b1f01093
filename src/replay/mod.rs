//! Playback and interpolation engine modules

pub mod clock;
pub mod data_store;
pub mod interpolator;
pub mod loader;
pub mod session;
pub mod types;
pub mod window;

pub use clock::PlaybackClock;
pub use data_store::{RoundData, RoundDataStore};
pub use interpolator::Interpolator;
pub use loader::{LoadState, RoundLoader};
pub use session::{PlaybackStatus, ReplaySession};
pub use window::WindowManager;
