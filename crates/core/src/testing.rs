//! Test doubles for the network and the cache store.

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::Error;
use crate::cache::{CacheStore, GenerationId, MemoryStore, RequestKey};
use crate::network::{Network, NetworkError};
use crate::request::ProxyRequest;
use crate::response::CachedResponse;

/// Network answering from a fixed table of URL → response.
///
/// Unknown URLs and every request while `offline` fail with a connect error.
#[derive(Default)]
pub struct ScriptedNetwork {
    routes: HashMap<String, CachedResponse>,
    offline: AtomicBool,
    calls: Mutex<Vec<String>>,
}

impl ScriptedNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, response: CachedResponse) -> Self {
        self.routes.insert(url.to_string(), response);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<CachedResponse, NetworkError> {
        self.calls.lock().unwrap().push(request.url.to_string());
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::Connect("offline".into()));
        }
        self.routes
            .get(request.url.as_str())
            .cloned()
            .ok_or_else(|| NetworkError::Connect(format!("no route to {}", request.url)))
    }
}

/// Store wrapper whose writes and/or reads can be made to fail or hang.
///
/// With `gate_puts` set, each write waits for one `release_puts` permit.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub fail_puts: AtomicBool,
    pub fail_lookups: AtomicBool,
    pub hang_puts: AtomicBool,
    pub gate_puts: AtomicBool,
    pub release_puts: Notify,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for FaultyStore {
    async fn open(&self, generation: &GenerationId) -> Result<(), Error> {
        self.inner.open(generation).await
    }

    async fn put(&self, generation: &GenerationId, key: &RequestKey, response: &CachedResponse) -> Result<(), Error> {
        if self.hang_puts.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.gate_puts.load(Ordering::SeqCst) {
            self.release_puts.notified().await;
        }
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(Error::CorruptEntry("disk full".into()));
        }
        self.inner.put(generation, key, response).await
    }

    async fn lookup(&self, generation: &GenerationId, key: &RequestKey) -> Result<Option<CachedResponse>, Error> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(Error::CorruptEntry("unreadable".into()));
        }
        self.inner.lookup(generation, key).await
    }

    async fn generations(&self) -> Result<BTreeSet<GenerationId>, Error> {
        self.inner.generations().await
    }

    async fn delete(&self, generation: &GenerationId) -> Result<bool, Error> {
        self.inner.delete(generation).await
    }
}

/// Poll until a detached write lands, or give up after one second.
pub async fn wait_for_entry(store: &dyn CacheStore, generation: &GenerationId, key: &RequestKey) -> Option<CachedResponse> {
    for _ in 0..200 {
        if let Ok(Some(hit)) = store.lookup(generation, key).await {
            return Some(hit);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    None
}
