//! The network as seen by the proxy.

use async_trait::async_trait;

use crate::request::ProxyRequest;
use crate::response::CachedResponse;

/// Why the network could not produce a response.
///
/// Any HTTP status (including 4xx/5xx) is a response, not an error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("failed to read response body: {0}")]
    Body(String),

    #[error("response too large: {0}")]
    TooLarge(String),
}

/// Something that can perform a request against the real network.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &ProxyRequest) -> Result<CachedResponse, NetworkError>;
}
