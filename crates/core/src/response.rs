//! Response snapshots as served to callers and stored in the cache.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};

use crate::Error;

/// A fully buffered response: status, headers, and body at the time it
/// was produced. Cloning is cheap (the body is reference counted), which is
/// how a network response is duplicated before being written to the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self { status, headers, body: body.into() }
    }

    /// A 200 response with the given body and no headers.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::new(StatusCode::OK, HeaderMap::new(), body)
    }

    /// Builder-style header insertion. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Serialize headers as a JSON array of `[name, hex(value)]` pairs.
    ///
    /// Repeated headers keep their order. Values are stored as raw bytes so
    /// non-UTF-8 values survive a round trip unchanged.
    pub fn headers_json(&self) -> String {
        let pairs: Vec<(&str, String)> =
            self.headers.iter().map(|(name, value)| (name.as_str(), hex::encode(value.as_bytes()))).collect();
        serde_json::to_string(&pairs).unwrap_or_else(|_| "[]".to_string())
    }

    /// Rebuild a snapshot from its stored parts.
    pub fn from_stored(status: u16, headers_json: &str, body: Vec<u8>) -> Result<Self, Error> {
        let status = StatusCode::from_u16(status).map_err(|e| Error::CorruptEntry(e.to_string()))?;
        let pairs: Vec<(String, String)> =
            serde_json::from_str(headers_json).map_err(|e| Error::CorruptEntry(e.to_string()))?;

        let mut headers = HeaderMap::with_capacity(pairs.len());
        for (name, value) in pairs {
            let name = HeaderName::try_from(name.as_str()).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            let raw = hex::decode(&value).map_err(|e| Error::CorruptEntry(format!("header {name}: {e}")))?;
            let value = HeaderValue::from_bytes(&raw).map_err(|e| Error::CorruptEntry(e.to_string()))?;
            headers.append(name, value);
        }

        Ok(Self { status, headers, body: Bytes::from(body) })
    }
}
