//! HTTP network access for the proxy.
//!
//! ### Forwarding
//! - Method, headers, and body of the intercepted request are replayed
//! - Hop-by-hop headers are dropped in both directions
//! - Bodies are passed through verbatim (no transparent decompression)
//! - Redirects are returned to the caller, not followed (configurable)
//!
//! ### Limits
//! - Max body bytes: 5MB (configurable)
//! - Request timeout: 20s (configurable)
//!
//! Only transport problems are errors; any HTTP status is a response.
//!
//! Requests the proxy declines go through [`HttpNetwork::forward`] instead,
//! which streams both bodies and applies neither limit.

pub mod forward;
pub mod headers;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, redirect};
use shelter_core::{AppConfig, CachedResponse, Error, Network, NetworkError, ProxyRequest};

pub use forward::{Forwarded, Upload};
pub use headers::{outbound, strip_hop_by_hop};

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent for requests that carry none (default: "shelter/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Redirects to follow before handing the response back (default: 0)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "shelter/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 0,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// reqwest-backed [`Network`].
#[derive(Clone)]
pub struct HttpNetwork {
    http: Client,
    passthrough: Client,
    config: FetchConfig,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let policy = match config.max_redirects {
            0 => redirect::Policy::none(),
            max => redirect::Policy::limited(max),
        };

        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(policy)
            .use_rustls_tls()
            .build()
            .map_err(|e| NetworkError::Connect(format!("failed to build HTTP client: {e}")))?;

        let passthrough = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .redirect(redirect::Policy::none())
            .use_rustls_tls()
            .build()
            .map_err(|e| NetworkError::Connect(format!("failed to build pass-through client: {e}")))?;

        Ok(Self { http, passthrough, config })
    }

    async fn send(&self, request: &ProxyRequest) -> Result<CachedResponse, NetworkError> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.as_str())
            .headers(outbound(&request.headers))
            .body(request.body.clone())
            .send()
            .await
            .map_err(|e| classify(&e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(NetworkError::TooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);

        let body = response
            .bytes()
            .await
            .map_err(|e| if e.is_timeout() { classify(&e) } else { NetworkError::Body(e.to_string()) })?;

        if body.len() > self.config.max_bytes {
            return Err(NetworkError::TooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(CachedResponse::new(status, headers, body))
    }
}

fn classify(err: &reqwest::Error) -> NetworkError {
    if err.is_timeout() { NetworkError::Timeout(err.to_string()) } else { NetworkError::Connect(err.to_string()) }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<CachedResponse, NetworkError> {
        self.send(request).await
    }
}
