//! Request keys for cached entries.

use http::Method;
use sha2::{Digest, Sha256};
use url::Url;

use crate::url::normalize;

/// Normalized identity of a cached request: method plus canonical URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: String,
    pub url: String,
    pub hash: String,
}

impl RequestKey {
    pub fn new(method: &Method, url: &Url) -> Self {
        let method = method.as_str().to_ascii_uppercase();
        let url = normalize(url).to_string();
        let hash = compute_cache_key(&method, &url);
        Self { method, url, hash }
    }

    /// Key for a plain GET, as used for static assets.
    pub fn get(url: &Url) -> Self {
        Self::new(&Method::GET, url)
    }
}

/// Compute the storage hash for a method and canonical URL.
pub fn compute_cache_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
