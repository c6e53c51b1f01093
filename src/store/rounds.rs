//! Typed per-round fetch surface over the backing store

use async_trait::async_trait;
use uuid::Uuid;

use super::client::{StoreClient, StoreError};
use crate::replay::types::{
    DiscreteEvent, MatchMeta, PositionSample, RoundIndex, ThrownObjectLifecycleEvent,
    ThrownObjectSample, WeaponFireSample,
};

/// The fetch seam between the playback engine and the backing store.
///
/// The five per-round sample fetches are logically independent; the loader
/// issues them concurrently and only merges a round once all five have
/// succeeded. Implementations must be safe to call concurrently for
/// different rounds.
#[async_trait]
pub trait RoundFetcher: Send + Sync {
    /// Match-level metadata: the ordered round list and tick rate.
    async fn fetch_match(&self, match_id: Uuid) -> Result<MatchMeta, StoreError>;

    async fn fetch_positions(
        &self,
        match_id: Uuid,
        round_index: RoundIndex,
    ) -> Result<Vec<PositionSample>, StoreError>;

    async fn fetch_events(
        &self,
        match_id: Uuid,
        round_index: RoundIndex,
    ) -> Result<Vec<DiscreteEvent>, StoreError>;

    async fn fetch_thrown_trajectory(
        &self,
        match_id: Uuid,
        round_index: RoundIndex,
    ) -> Result<Vec<ThrownObjectSample>, StoreError>;

    async fn fetch_thrown_lifecycle(
        &self,
        match_id: Uuid,
        round_index: RoundIndex,
    ) -> Result<Vec<ThrownObjectLifecycleEvent>, StoreError>;

    async fn fetch_weapon_fire(
        &self,
        match_id: Uuid,
        round_index: RoundIndex,
    ) -> Result<Vec<WeaponFireSample>, StoreError>;
}

/// Production [`RoundFetcher`] backed by the store's REST API.
#[derive(Clone)]
pub struct RoundStore {
    client: StoreClient,
}

impl RoundStore {
    pub fn new(client: StoreClient) -> Self {
        Self { client }
    }

    fn round_path(match_id: Uuid, round_index: RoundIndex, kind: &str) -> String {
        format!("matches/{match_id}/rounds/{round_index}/{kind}")
    }
}

#[async_trait]
impl RoundFetcher for RoundStore {
    async fn fetch_match(&self, match_id: Uuid) -> Result<MatchMeta, StoreError> {
        self.client.get(&format!("matches/{match_id}")).await
    }

    async fn fetch_positions(
        &self,
        match_id: Uuid,
        round_index: RoundIndex,
    ) -> Result<Vec<PositionSample>, StoreError> {
        self.client
            .get(&Self::round_path(match_id, round_index, "positions"))
            .await
    }

    async fn fetch_events(
        &self,
        match_id: Uuid,
        round_index: RoundIndex,
    ) -> Result<Vec<DiscreteEvent>, StoreError> {
        self.client
            .get(&Self::round_path(match_id, round_index, "events"))
            .await
    }

    async fn fetch_thrown_trajectory(
        &self,
        match_id: Uuid,
        round_index: RoundIndex,
    ) -> Result<Vec<ThrownObjectSample>, StoreError> {
        self.client
            .get(&Self::round_path(match_id, round_index, "thrown/trajectory"))
            .await
    }

    async fn fetch_thrown_lifecycle(
        &self,
        match_id: Uuid,
        round_index: RoundIndex,
    ) -> Result<Vec<ThrownObjectLifecycleEvent>, StoreError> {
        self.client
            .get(&Self::round_path(match_id, round_index, "thrown/lifecycle"))
            .await
    }

    async fn fetch_weapon_fire(
        &self,
        match_id: Uuid,
        round_index: RoundIndex,
    ) -> Result<Vec<WeaponFireSample>, StoreError> {
        self.client
            .get(&Self::round_path(match_id, round_index, "weapon_fire"))
            .await
    }
}
