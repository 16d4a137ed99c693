//! The proxy's host-facing surface.
//!
//! A host adapter (HTTP server, CLI, test harness) drives three hooks:
//!
//! - [`ProxyController::on_init`] once per process, to provision the
//!   current generation
//! - [`ProxyController::on_activate`] after init, to retire stale
//!   generations and start intercepting
//! - [`ProxyController::intercept`] for every outbound request

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Error;
use crate::cache::{CacheStore, GenerationId};
use crate::config::ProxySettings;
use crate::generation::{GenerationManager, ProvisionReport};
use crate::network::Network;
use crate::request::{ProxyRequest, RequestDescriptor};
use crate::response::CachedResponse;
use crate::strategy::{RoutingRules, Strategy, StrategyError, StrategyExecutor};

/// What the host should do with an intercepted request.
#[derive(Debug, PartialEq)]
pub enum Interception {
    /// The proxy handled the request; answer with this result.
    Respond(Result<CachedResponse, StrategyError>),
    /// The proxy declined; let the request proceed untouched.
    PassThrough,
}

/// Coordinates generation lifecycle and per-request strategy execution.
pub struct ProxyController {
    rules: RoutingRules,
    generations: GenerationManager,
    executor: StrategyExecutor,
    active: AtomicBool,
}

impl ProxyController {
    pub fn new(settings: ProxySettings, store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Self {
        let rules = RoutingRules::new(&settings.origin, settings.dynamic_prefixes);
        let generations = GenerationManager::new(
            settings.generation.clone(),
            settings.static_assets,
            Arc::clone(&store),
            Arc::clone(&network),
        );
        let executor = StrategyExecutor::new(settings.generation, store, network, settings.offline_fallback);

        Self { rules, generations, executor, active: AtomicBool::new(false) }
    }

    pub fn generation(&self) -> &GenerationId {
        self.generations.current()
    }

    pub fn rules(&self) -> &RoutingRules {
        &self.rules
    }

    /// Whether activation has completed and requests are being intercepted.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Initialization hook: provision the current generation.
    pub async fn on_init(&self) -> Result<ProvisionReport, Error> {
        self.generations.provision().await
    }

    /// Activation hook: retire every stale generation, then start
    /// intercepting. If retiring fails the controller stays inactive.
    pub async fn on_activate(&self) -> Result<Vec<GenerationId>, Error> {
        let retired = self.generations.retire_others().await?;
        self.active.store(true, Ordering::Release);
        tracing::info!(generation = %self.generation(), retired = retired.len(), "proxy active");
        Ok(retired)
    }

    /// Run both lifecycle hooks in order.
    pub async fn start(&self) -> Result<ProvisionReport, Error> {
        let report = self.on_init().await?;
        self.on_activate().await?;
        Ok(report)
    }

    /// Strategy `intercept` would apply right now. Everything is
    /// [`Strategy::Unhandled`] until activation has completed.
    pub fn route(&self, descriptor: &RequestDescriptor) -> Strategy {
        if !self.is_active() {
            return Strategy::Unhandled;
        }
        self.rules.select(descriptor)
    }

    /// Whether `intercept` would answer this request itself. Hosts use it to
    /// stream declined requests without buffering them first.
    pub fn handles(&self, descriptor: &RequestDescriptor) -> bool {
        self.route(descriptor).is_handled()
    }

    /// Request-interception hook.
    ///
    /// Requests arriving before activation, and requests classified
    /// [`Strategy::Unhandled`], pass through without substitution.
    pub async fn intercept(&self, request: &ProxyRequest) -> Interception {
        let strategy = self.route(&request.descriptor());
        tracing::debug!(method = %request.method, url = %request.url, strategy = %strategy, "routing request");

        let result = match strategy {
            Strategy::NavigationFallback => self.executor.navigation_fallback(request).await,
            Strategy::NetworkFirst => self.executor.network_first(request).await,
            Strategy::CacheFirst => self.executor.cache_first(request).await,
            Strategy::Unhandled => return Interception::PassThrough,
        };

        if let Err(err) = &result {
            tracing::warn!(url = %request.url, strategy = %strategy, error = %err, "request failed");
        }

        Interception::Respond(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{MemoryStore, RequestKey};
    use crate::testing::ScriptedNetwork;
    use http::Method;
    use std::collections::BTreeSet;
    use url::Url;

    fn url(path: &str) -> Url {
        Url::parse("https://app.test").unwrap().join(path).unwrap()
    }

    fn settings() -> ProxySettings {
        ProxySettings {
            generation: "v5".into(),
            origin: url("/"),
            static_assets: ["/a.js", "/b.css", "/c.png", "/offline.html"].into_iter().map(url).collect(),
            dynamic_prefixes: vec!["/search".into()],
            offline_fallback: url("/offline.html"),
        }
    }

    fn site() -> ScriptedNetwork {
        ScriptedNetwork::new()
            .route("https://app.test/a.js", CachedResponse::ok("a"))
            .route("https://app.test/b.css", CachedResponse::ok("b"))
            .route("https://app.test/c.png", CachedResponse::ok("c"))
            .route("https://app.test/offline.html", CachedResponse::ok("<h1>offline</h1>"))
    }

    async fn started(store: &MemoryStore, network: Arc<ScriptedNetwork>) -> ProxyController {
        let controller = ProxyController::new(settings(), Arc::new(store.clone()), network);
        controller.start().await.unwrap();
        controller
    }

    #[tokio::test]
    async fn test_inactive_controller_passes_through() {
        let controller = ProxyController::new(settings(), Arc::new(MemoryStore::new()), Arc::new(site()));
        controller.on_init().await.unwrap();

        assert!(!controller.is_active());
        let request = ProxyRequest::get(url("/a.js"));
        assert!(!controller.handles(&request.descriptor()));
        assert_eq!(controller.intercept(&request).await, Interception::PassThrough);
    }

    #[tokio::test]
    async fn test_route_after_activation() {
        let controller = started(&MemoryStore::new(), Arc::new(site())).await;

        assert_eq!(controller.route(&ProxyRequest::get(url("/a.js")).descriptor()), Strategy::CacheFirst);
        assert_eq!(controller.route(&ProxyRequest::navigation(url("/")).descriptor()), Strategy::NavigationFallback);
        let cross_origin = ProxyRequest::get(Url::parse("https://tiles.map.test/1.png").unwrap());
        assert!(!controller.handles(&cross_origin.descriptor()));
        assert_eq!(controller.rules().select(&cross_origin.descriptor()), Strategy::Unhandled);
    }

    #[tokio::test]
    async fn test_unhandled_requests_pass_through_untouched() {
        let network = Arc::new(site());
        let controller = started(&MemoryStore::new(), network.clone()).await;
        let calls_after_start = network.calls().len();

        let cross_origin = ProxyRequest::get(Url::parse("https://tiles.map.test/1/1/1.png").unwrap());
        let post = ProxyRequest::new(Method::POST, url("/checkins")).with_body("restaurant_id=7");

        assert_eq!(controller.intercept(&cross_origin).await, Interception::PassThrough);
        assert_eq!(controller.intercept(&post).await, Interception::PassThrough);
        assert_eq!(network.calls().len(), calls_after_start);
    }

    #[tokio::test]
    async fn test_cache_hit_without_network() {
        let network = Arc::new(site());
        let controller = started(&MemoryStore::new(), network.clone()).await;
        network.set_offline(true);
        let calls_after_start = network.calls().len();

        let outcome = controller.intercept(&ProxyRequest::get(url("/a.js"))).await;

        assert_eq!(outcome, Interception::Respond(Ok(CachedResponse::ok("a"))));
        assert_eq!(network.calls().len(), calls_after_start);
    }

    #[tokio::test]
    async fn test_missing_asset_offline_is_cache_miss() {
        let network = Arc::new(site());
        let controller = started(&MemoryStore::new(), network.clone()).await;
        network.set_offline(true);

        let outcome = controller.intercept(&ProxyRequest::get(url("/d.js"))).await;

        assert_eq!(outcome, Interception::Respond(Err(StrategyError::CacheMiss("https://app.test/d.js".into()))));
    }

    #[tokio::test]
    async fn test_offline_navigation_serves_offline_page() {
        let network = Arc::new(site());
        let controller = started(&MemoryStore::new(), network.clone()).await;
        network.set_offline(true);

        let outcome = controller.intercept(&ProxyRequest::navigation(url("/restaurants/12"))).await;

        assert_eq!(outcome, Interception::Respond(Ok(CachedResponse::ok("<h1>offline</h1>"))));
    }

    #[tokio::test]
    async fn test_offline_navigation_without_provisioned_fallback() {
        let network = Arc::new(
            ScriptedNetwork::new()
                .route("https://app.test/a.js", CachedResponse::ok("a"))
                .route("https://app.test/b.css", CachedResponse::ok("b")),
        );
        let controller = started(&MemoryStore::new(), network.clone()).await;
        network.set_offline(true);

        let outcome = controller.intercept(&ProxyRequest::navigation(url("/"))).await;

        assert!(matches!(outcome, Interception::Respond(Err(StrategyError::AssetUnavailable(_)))));
    }

    #[tokio::test]
    async fn test_search_is_network_first_and_cached() {
        let network = Arc::new(site().route("https://app.test/search?q=halal", CachedResponse::ok("fresh")));
        let store = MemoryStore::new();
        let controller = started(&store, network.clone()).await;
        let request = ProxyRequest::get(url("/search?q=halal"));

        assert_eq!(controller.intercept(&request).await, Interception::Respond(Ok(CachedResponse::ok("fresh"))));
        crate::testing::wait_for_entry(&store, &"v5".into(), &request.key()).await;

        network.set_offline(true);
        assert_eq!(controller.intercept(&request).await, Interception::Respond(Ok(CachedResponse::ok("fresh"))));
    }

    #[tokio::test]
    async fn test_activation_retires_stale_generations() {
        let store = MemoryStore::new();
        store.open(&"v3".into()).await.unwrap();
        store
            .put(&"v4".into(), &RequestKey::get(&url("/a.js")), &CachedResponse::ok("old"))
            .await
            .unwrap();
        let controller = ProxyController::new(settings(), Arc::new(store.clone()), Arc::new(site()));

        controller.on_init().await.unwrap();
        assert_eq!(store.generations().await.unwrap().len(), 3);
        assert!(!controller.is_active());

        let retired = controller.on_activate().await.unwrap();

        assert_eq!(retired.len(), 2);
        let expected: BTreeSet<GenerationId> = [GenerationId::from("v5")].into_iter().collect();
        assert_eq!(store.generations().await.unwrap(), expected);
        assert!(controller.is_active());
    }

    #[tokio::test]
    async fn test_instances_do_not_share_generation() {
        let store = MemoryStore::new();
        let v5 = ProxyController::new(settings(), Arc::new(store.clone()), Arc::new(site()));
        let v6 = ProxyController::new(
            ProxySettings { generation: "v6".into(), ..settings() },
            Arc::new(store.clone()),
            Arc::new(site()),
        );

        assert_eq!(v5.generation(), &GenerationId::from("v5"));
        assert_eq!(v6.generation(), &GenerationId::from("v6"));
    }
}
