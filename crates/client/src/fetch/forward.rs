//! Streaming pass-through for requests the proxy does not answer itself.

use std::time::Instant;

use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStream, TryStreamExt};
use http::{HeaderMap, StatusCode};
use reqwest::Body;
use shelter_core::{NetworkError, ProxyRequest};

use super::{HttpNetwork, classify, outbound, strip_hop_by_hop};

/// A request body streamed upstream as it arrives from the client.
pub struct Upload(Body);

impl Upload {
    pub fn stream<S>(stream: S) -> Self
    where
        S: TryStream + Send + 'static,
        S::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
        Bytes: From<S::Ok>,
    {
        Self(Body::wrap_stream(stream))
    }
}

/// Upstream status and headers, with the body still in flight.
pub struct Forwarded {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: BoxStream<'static, Result<Bytes, NetworkError>>,
}

impl HttpNetwork {
    /// Send a request upstream and return its response as it arrives.
    ///
    /// `upload` replaces the buffered `request.body` when present. Nothing
    /// is buffered and neither the body size limit nor the request timeout
    /// applies; only connecting is bounded.
    pub async fn forward(&self, request: &ProxyRequest, upload: Option<Upload>) -> Result<Forwarded, NetworkError> {
        let start = Instant::now();

        let builder = self
            .passthrough
            .request(request.method.clone(), request.url.as_str())
            .headers(outbound(&request.headers));
        let builder = match upload {
            Some(Upload(body)) => builder.body(body),
            None if !request.body.is_empty() => builder.body(request.body.clone()),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| classify(&e))?;

        let status = response.status();
        let mut headers = response.headers().clone();
        strip_hop_by_hop(&mut headers);

        tracing::debug!(
            "forwarded {} {} -> {} in {}ms",
            request.method,
            request.url,
            status.as_u16(),
            start.elapsed().as_millis()
        );

        let body = response
            .bytes_stream()
            .map_err(|e| NetworkError::Body(e.to_string()))
            .boxed();

        Ok(Forwarded { status, headers, body })
    }
}
