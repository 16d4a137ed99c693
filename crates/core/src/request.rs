//! Intercepted requests and the read-only descriptor used for routing.

use bytes::Bytes;
use http::{HeaderMap, Method, header};
use url::Url;

use crate::cache::RequestKey;

/// A request handed to the proxy by its host.
///
/// Carries everything needed to replay the request against the network;
/// routing only ever looks at the [`RequestDescriptor`] derived from it.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Whether this is a full-page (top-level document) navigation.
    pub navigate: bool,
}

impl ProxyRequest {
    /// Create a sub-resource request with no headers and an empty body.
    pub fn new(method: Method, url: Url) -> Self {
        Self { method, url, headers: HeaderMap::new(), body: Bytes::new(), navigate: false }
    }

    /// Sub-resource GET.
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    /// Top-level document navigation.
    pub fn navigation(url: Url) -> Self {
        Self { navigate: true, ..Self::get(url) }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.navigate = self.navigate || is_navigation(&self.method, &headers);
        self.headers = headers;
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Routing view of this request.
    pub fn descriptor(&self) -> RequestDescriptor {
        RequestDescriptor { method: self.method.clone(), url: self.url.clone(), navigate: self.navigate }
    }

    /// Cache key for this request (method + canonical URL).
    pub fn key(&self) -> RequestKey {
        RequestKey::new(&self.method, &self.url)
    }
}

/// The attributes strategy selection is allowed to depend on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: Url,
    pub navigate: bool,
}

/// Decide whether raw HTTP request headers describe a document navigation.
///
/// Browsers send `Sec-Fetch-Mode: navigate` for top-level loads. Older
/// clients are recognised by a GET whose `Accept` leads with `text/html`.
pub fn is_navigation(method: &Method, headers: &HeaderMap) -> bool {
    if let Some(mode) = headers.get("sec-fetch-mode").and_then(|v| v.to_str().ok()) {
        return mode.eq_ignore_ascii_case("navigate");
    }

    if *method != Method::GET {
        return false;
    }

    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .and_then(|accept| accept.split(',').next())
        .is_some_and(|first| first.trim().starts_with("text/html"))
}
