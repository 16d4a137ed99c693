//! The storage interface the proxy orchestrates.

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::RequestKey;
use crate::Error;
use crate::response::CachedResponse;

/// Version token naming one cache generation (e.g. `ff-v2`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GenerationId(String);

impl GenerationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GenerationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for GenerationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Persistent mapping of generation → (request key → response).
///
/// Writing into a generation that was never opened creates it.
/// Concurrent writes to the same key are last-write-wins.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the generation if it does not exist yet.
    async fn open(&self, generation: &GenerationId) -> Result<(), Error>;

    /// Store (or replace) the response for `key` in `generation`.
    async fn put(&self, generation: &GenerationId, key: &RequestKey, response: &CachedResponse) -> Result<(), Error>;

    /// Look up the response stored for `key` in `generation`.
    async fn lookup(&self, generation: &GenerationId, key: &RequestKey) -> Result<Option<CachedResponse>, Error>;

    /// All generations currently present.
    async fn generations(&self) -> Result<BTreeSet<GenerationId>, Error>;

    /// Delete a generation and every entry in it.
    ///
    /// Returns false if the generation did not exist.
    async fn delete(&self, generation: &GenerationId) -> Result<bool, Error>;
}
