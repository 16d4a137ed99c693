//! HTTP host adapter.
//!
//! Every request that reaches the listener is turned into a
//! [`ProxyRequest`] and offered to the controller. Handled requests are
//! buffered and answered from its result. Declined ones are streamed to
//! upstream and back without buffering or size limits.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, HttpBody, to_bytes},
    extract::{Request, State},
    http::request::Parts,
    response::{IntoResponse, Response},
};
use shelter_client::{Forwarded, HttpNetwork, Upload};
use shelter_core::{CachedResponse, Interception, ProxyController, ProxyRequest};
use tower_http::trace::TraceLayer;
use url::Url;

use crate::error::ProxyError;

/// Shared state for the proxy handler.
#[derive(Clone)]
pub struct ProxyState {
    pub controller: Arc<ProxyController>,
    /// Forwarder for requests the controller declines.
    pub upstream: HttpNetwork,
    /// Origin that relative request targets are resolved against.
    pub origin: Url,
    /// Maximum accepted body size in bytes for handled requests.
    pub max_body_bytes: usize,
}

/// Build the router: a single fallback route that proxies everything.
pub fn router(state: ProxyState) -> Router {
    Router::new()
        .fallback(proxy)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn proxy(State(state): State<ProxyState>, request: Request) -> Response {
    match handle(&state, request).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(error = %err, "proxy error");
            err.into_response()
        }
    }
}

async fn handle(state: &ProxyState, request: Request) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let url = target_url(&state.origin, &parts)?;
    let request = ProxyRequest::new(parts.method, url).with_headers(parts.headers);

    if !state.controller.handles(&request.descriptor()) {
        let upload = (!body.is_end_stream()).then(|| Upload::stream(body.into_data_stream()));
        return forward(state, &request, upload).await;
    }

    let body = to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|e| ProxyError::BodyTooLarge(e.to_string()))?;
    let request = request.with_body(body);

    match state.controller.intercept(&request).await {
        Interception::Respond(result) => Ok(into_http(result?)),
        Interception::PassThrough => forward(state, &request, None).await,
    }
}

async fn forward(state: &ProxyState, request: &ProxyRequest, upload: Option<Upload>) -> Result<Response, ProxyError> {
    let Forwarded { status, headers, body } = state.upstream.forward(request, upload).await?;

    let mut response = Response::new(Body::from_stream(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Absolute-form targets (forward-proxy use) are taken as-is; origin-form
/// targets resolve against the application origin.
fn target_url(origin: &Url, parts: &Parts) -> Result<Url, ProxyError> {
    let uri = &parts.uri;
    let target = if uri.scheme().is_some() && uri.authority().is_some() {
        Url::parse(&uri.to_string())
    } else {
        let path = uri.path_and_query().map_or("/", |pq| pq.as_str());
        origin.join(path)
    };

    target.map_err(|e| ProxyError::BadTarget(format!("{uri}: {e}")))
}

fn into_http(response: CachedResponse) -> Response {
    let mut http = Response::new(Body::from(response.body));
    *http.status_mut() = response.status;
    *http.headers_mut() = response.headers;
    http
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::http::{self, StatusCode};
    use shelter_client::FetchConfig;
    use shelter_core::{MemoryStore, Network, NetworkError, ProxySettings};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tower::ServiceExt;

    const BODY_LIMIT: usize = 1024;

    #[derive(Default)]
    struct FakeUpstream {
        routes: HashMap<String, CachedResponse>,
        offline: AtomicBool,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Network for FakeUpstream {
        async fn fetch(&self, request: &ProxyRequest) -> Result<CachedResponse, NetworkError> {
            self.seen.lock().unwrap().push(format!("{} {}", request.method, request.url));
            if self.offline.load(Ordering::SeqCst) {
                return Err(NetworkError::Connect("offline".into()));
            }
            self.routes
                .get(request.url.as_str())
                .cloned()
                .ok_or_else(|| NetworkError::Connect("no route".into()))
        }
    }

    fn origin() -> Url {
        Url::parse("https://app.test").unwrap()
    }

    async fn app(upstream: Arc<FakeUpstream>) -> Router {
        let settings = ProxySettings {
            generation: "v5".into(),
            origin: origin(),
            static_assets: vec![origin().join("/app.js").unwrap(), origin().join("/offline.html").unwrap()],
            dynamic_prefixes: vec!["/search".into()],
            offline_fallback: origin().join("/offline.html").unwrap(),
        };
        let controller = Arc::new(ProxyController::new(settings, Arc::new(MemoryStore::new()), upstream));
        controller.start().await.unwrap();

        // Buffered fetches share the body limit; pass-through must not.
        let forwarder = HttpNetwork::new(FetchConfig { max_bytes: BODY_LIMIT, ..Default::default() }).unwrap();
        router(ProxyState { controller, upstream: forwarder, origin: origin(), max_body_bytes: BODY_LIMIT })
    }

    fn upstream() -> FakeUpstream {
        let mut routes = HashMap::new();
        routes.insert(
            "https://app.test/app.js".to_string(),
            CachedResponse::ok("console.log('ff')").with_header("content-type", "text/javascript"),
        );
        routes.insert("https://app.test/offline.html".to_string(), CachedResponse::ok("<h1>offline</h1>"));
        FakeUpstream { routes, ..Default::default() }
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    async fn body_string(response: Response) -> String {
        String::from_utf8(body_bytes(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_serves_cached_asset_offline() {
        let upstream = Arc::new(upstream());
        let app = app(upstream.clone()).await;
        upstream.offline.store(true, Ordering::SeqCst);

        let response = app
            .oneshot(http::Request::builder().uri("/app.js").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-type").unwrap(), "text/javascript");
        assert_eq!(body_string(response).await, "console.log('ff')");
    }

    #[tokio::test]
    async fn test_offline_navigation_gets_offline_page() {
        let upstream = Arc::new(upstream());
        let app = app(upstream.clone()).await;
        upstream.offline.store(true, Ordering::SeqCst);

        let request = http::Request::builder()
            .uri("/restaurants/3")
            .header("sec-fetch-mode", "navigate")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<h1>offline</h1>");
    }

    #[tokio::test]
    async fn test_cache_miss_is_gateway_timeout() {
        let upstream = Arc::new(upstream());
        let app = app(upstream.clone()).await;
        upstream.offline.store(true, Ordering::SeqCst);

        let response = app
            .oneshot(http::Request::builder().uri("/missing.css").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(body_string(response).await.starts_with("CACHE_MISS"));
    }

    #[tokio::test]
    async fn test_cross_origin_passes_through_unbuffered() {
        let mut server = mockito::Server::new_async().await;
        let payload = vec![7u8; 6 * 1024 * 1024];
        let mock = server
            .mock("GET", "/tiles/1.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(&payload)
            .create_async()
            .await;

        let upstream = Arc::new(upstream());
        let app = app(upstream.clone()).await;
        let target = format!("{}/tiles/1.png", server.url());

        let response = app
            .oneshot(http::Request::builder().uri(&target).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get("content-type").unwrap(), "image/png");
        let body = body_bytes(response).await;
        assert_eq!(body.len(), payload.len());
        assert!(body == payload);
        assert!(!upstream.seen.lock().unwrap().iter().any(|s| s.contains("/tiles/1.png")));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_pass_through_streams_large_upload() {
        let mut server = mockito::Server::new_async().await;
        let upload = "x".repeat(BODY_LIMIT * 64);
        let mock = server
            .mock("POST", "/checkins")
            .match_body(upload.as_str())
            .with_status(201)
            .with_body("created")
            .create_async()
            .await;

        let app = app(Arc::new(upstream())).await;
        let request = http::Request::builder()
            .method("POST")
            .uri(format!("{}/checkins", server.url()))
            .body(Body::from(upload.clone()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_string(response).await, "created");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_pass_through_upstream_down_is_bad_gateway() {
        let app = app(Arc::new(upstream())).await;

        let request = http::Request::builder()
            .method("POST")
            .uri("http://127.0.0.1:1/checkins")
            .body(Body::from("restaurant_id=7"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_oversized_body_on_handled_request_rejected() {
        let app = app(Arc::new(upstream())).await;

        let request = http::Request::builder()
            .method("POST")
            .uri("/restaurants/3")
            .header("sec-fetch-mode", "navigate")
            .body(Body::from(vec![b'x'; BODY_LIMIT * 4]))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_target_url_resolution() {
        let (parts, _) = http::Request::builder()
            .uri("/search?q=pho")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(target_url(&origin(), &parts).unwrap().as_str(), "https://app.test/search?q=pho");

        let (parts, _) = http::Request::builder()
            .uri("http://other.test/x")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(target_url(&origin(), &parts).unwrap().as_str(), "http://other.test/x");
    }
}
