//! In-process cache store.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CacheStore, GenerationId, RequestKey};
use crate::Error;
use crate::response::CachedResponse;

type Entries = HashMap<String, CachedResponse>;

/// Cache store held entirely in memory.
///
/// Uses a HashMap behind a tokio RwLock. Clones share the same data, so a
/// test can keep a handle while the proxy owns another.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    generations: Arc<RwLock<HashMap<GenerationId, Entries>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries stored in a generation (0 if it does not exist).
    pub async fn entry_count(&self, generation: &GenerationId) -> usize {
        self.generations
            .read()
            .await
            .get(generation)
            .map_or(0, HashMap::len)
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, generation: &GenerationId) -> Result<(), Error> {
        self.generations
            .write()
            .await
            .entry(generation.clone())
            .or_default();
        Ok(())
    }

    async fn put(&self, generation: &GenerationId, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        self.generations
            .write()
            .await
            .entry(generation.clone())
            .or_default()
            .insert(key.hash.clone(), response.clone());
        Ok(())
    }

    async fn lookup(&self, generation: &GenerationId, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        let generations = self.generations.read().await;
        Ok(generations
            .get(generation)
            .and_then(|entries| entries.get(&key.hash))
            .cloned())
    }

    async fn generations(&self) -> Result<BTreeSet<GenerationId>, Error> {
        Ok(self.generations.read().await.keys().cloned().collect())
    }

    async fn delete(&self, generation: &GenerationId) -> Result<bool, Error> {
        Ok(self.generations.write().await.remove(generation).is_some())
    }
}
