//! Cache generation lifecycle: provisioning the current generation and
//! retiring every other one.

use std::sync::Arc;

use tokio::task::JoinSet;
use url::Url;

use crate::Error;
use crate::cache::{CacheStore, GenerationId, RequestKey};
use crate::network::Network;
use crate::request::ProxyRequest;

/// A static asset that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetFailure {
    pub url: Url,
    pub reason: String,
}

/// Outcome of provisioning a generation.
#[derive(Debug, Clone)]
pub struct ProvisionReport {
    pub generation: GenerationId,
    /// Assets now present in the generation, in configured order.
    pub stored: Vec<Url>,
    /// Assets that failed, in configured order.
    pub failed: Vec<AssetFailure>,
}

impl ProvisionReport {
    pub fn total(&self) -> usize {
        self.stored.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Turn any asset failure into an error, for callers that cannot run
    /// with a partially provisioned generation.
    pub fn into_strict(self) -> Result<Self, Error> {
        if self.is_complete() {
            Ok(self)
        } else {
            Err(Error::ProvisioningPartialFailure { failed: self.failed.len(), total: self.total() })
        }
    }
}

/// Owns the current generation identifier and its static asset list.
#[derive(Clone)]
pub struct GenerationManager {
    current: GenerationId,
    assets: Vec<Url>,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
}

impl GenerationManager {
    pub fn new(current: GenerationId, assets: Vec<Url>, store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Self {
        Self { current, assets, store, network }
    }

    pub fn current(&self) -> &GenerationId {
        &self.current
    }

    /// Create the current generation and fetch every static asset into it.
    ///
    /// Assets are fetched concurrently and independently: one failing never
    /// stops the others, and asset failures do not fail the call. Only a
    /// failure to open the generation itself is returned as an error.
    pub async fn provision(&self) -> Result<ProvisionReport, Error> {
        self.store.open(&self.current).await?;

        let mut join_set = JoinSet::new();
        for (index, url) in self.assets.iter().cloned().enumerate() {
            let manager = self.clone();
            join_set.spawn(async move {
                let outcome = manager.store_asset(&url).await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Result<(), String>> =
            vec![Err("provisioning task did not complete".to_string()); self.assets.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = outcome,
                Err(e) => tracing::warn!(generation = %self.current, error = %e, "provisioning task failed"),
            }
        }

        let mut report = ProvisionReport { generation: self.current.clone(), stored: Vec::new(), failed: Vec::new() };
        for (url, outcome) in self.assets.iter().zip(outcomes) {
            match outcome {
                Ok(()) => report.stored.push(url.clone()),
                Err(reason) => {
                    tracing::warn!(generation = %self.current, url = %url, reason = %reason, "failed to provision asset");
                    report.failed.push(AssetFailure { url: url.clone(), reason });
                }
            }
        }

        tracing::info!(
            generation = %self.current,
            stored = report.stored.len(),
            failed = report.failed.len(),
            "provisioned cache generation"
        );

        Ok(report)
    }

    async fn store_asset(&self, url: &Url) -> Result<(), String> {
        let request = ProxyRequest::get(url.clone());
        let response = self.network.fetch(&request).await.map_err(|e| e.to_string())?;

        if !response.status.is_success() {
            return Err(format!("status {}", response.status.as_u16()));
        }

        self.store
            .put(&self.current, &RequestKey::get(url), &response)
            .await
            .map_err(|e| e.to_string())
    }

    /// Delete every generation other than the current one.
    ///
    /// Returns the retired identifiers; an empty list when there was
    /// nothing stale.
    pub async fn retire_others(&self) -> Result<Vec<GenerationId>, Error> {
        let mut retired = Vec::new();
        for generation in self.store.generations().await? {
            if generation == self.current {
                continue;
            }
            if self.store.delete(&generation).await? {
                tracing::info!(generation = %generation, current = %self.current, "retired stale cache generation");
                retired.push(generation);
            }
        }
        Ok(retired)
    }
}
