//! Playback and interpolation engine for recorded multiplayer match replays
//!
//! Reconciles sparse, per-round, tick-indexed samples fetched on demand
//! from a backing store with a smooth, scrubbable, variable-speed playback
//! position. Residency is bounded to the active round and its immediate
//! neighbors; entity state interpolates within a round and teleports across
//! round boundaries.
//!
//! The rendering layer consumes [`replay::ReplaySession`]; everything else
//! is internal machinery it composes.

pub mod config;
pub mod replay;
pub mod store;
pub mod util;
