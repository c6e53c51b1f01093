//! REST client for the replay backing store

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::config::Config;

/// HTTP client for the store that serves parsed demo data. Owns the base
/// URL and API key; the typed fetch surface lives in [`super::RoundStore`].
#[derive(Clone)]
pub struct StoreClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl StoreClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            base_url: config.store_url.clone(),
            api_key: config.store_api_key.clone(),
        }
    }

    /// Get the API URL for a resource path
    fn resource_url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Make an authenticated GET request and decode the JSON body
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
        let url = self.resource_url(path);

        let response = self
            .client
            .get(&url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .send()
            .await
            .map_err(StoreError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(StoreError::Decode)
    }
}

/// Backing store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(reqwest::Error),
}
