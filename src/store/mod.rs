//! Backing store access for parsed replay data

pub mod client;
pub mod rounds;

pub use client::{StoreClient, StoreError};
pub use rounds::{RoundFetcher, RoundStore};
