//! Fetch/cache orchestration for each handled strategy.

use std::sync::Arc;

use url::Url;

use super::StrategyError;
use crate::cache::{CacheStore, GenerationId, RequestKey};
use crate::network::Network;
use crate::request::ProxyRequest;
use crate::response::CachedResponse;

/// Runs the handled strategies against the current generation.
#[derive(Clone)]
pub struct StrategyExecutor {
    generation: GenerationId,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    offline_url: Url,
    offline_key: RequestKey,
}

impl StrategyExecutor {
    pub fn new(
        generation: GenerationId, store: Arc<dyn CacheStore>, network: Arc<dyn Network>, offline_url: Url,
    ) -> Self {
        let offline_key = RequestKey::get(&offline_url);
        Self { generation, store, network, offline_url, offline_key }
    }

    /// Network, falling back to the offline document.
    ///
    /// A successful network response is returned as-is and never cached.
    pub async fn navigation_fallback(&self, request: &ProxyRequest) -> Result<CachedResponse, StrategyError> {
        match self.network.fetch(request).await {
            Ok(response) => Ok(response),
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "navigation failed, serving offline document");
                self.cached(&self.offline_key)
                    .await
                    .ok_or_else(|| StrategyError::AssetUnavailable(self.offline_url.to_string()))
            }
        }
    }

    /// Network, then cache. Successful responses are written back on a
    /// detached task.
    pub async fn network_first(&self, request: &ProxyRequest) -> Result<CachedResponse, StrategyError> {
        let key = request.key();
        match self.network.fetch(request).await {
            Ok(response) => {
                self.spawn_write(key, response.clone());
                Ok(response)
            }
            Err(err) => {
                tracing::debug!(url = %request.url, error = %err, "network failed, trying cache");
                self.cached(&key)
                    .await
                    .ok_or_else(|| StrategyError::CacheMiss(request.url.to_string()))
            }
        }
    }

    /// Cache, then network. Network results are not written back.
    pub async fn cache_first(&self, request: &ProxyRequest) -> Result<CachedResponse, StrategyError> {
        if let Some(hit) = self.cached(&request.key()).await {
            tracing::debug!(url = %request.url, "cache hit");
            return Ok(hit);
        }

        tracing::debug!(url = %request.url, "cache miss, fetching");
        self.network.fetch(request).await.map_err(|err| {
            tracing::debug!(url = %request.url, error = %err, "network failed after cache miss");
            StrategyError::CacheMiss(request.url.to_string())
        })
    }

    /// Store lookup where a failing store reads as a miss.
    async fn cached(&self, key: &RequestKey) -> Option<CachedResponse> {
        match self.store.lookup(&self.generation, key).await {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!(generation = %self.generation, url = %key.url, error = %err, "cache lookup failed");
                None
            }
        }
    }

    /// Queue a write into the current generation without waiting on it.
    ///
    /// The task outlives the request that spawned it; its failure is only
    /// logged.
    fn spawn_write(&self, key: RequestKey, response: CachedResponse) {
        let store = Arc::clone(&self.store);
        let generation = self.generation.clone();
        tokio::spawn(async move {
            match store.put(&generation, &key, &response).await {
                Ok(()) => tracing::debug!(generation = %generation, url = %key.url, "cached network response"),
                Err(err) => {
                    tracing::warn!(generation = %generation, url = %key.url, error = %err, "background cache write failed")
                }
            }
        });
    }
}
