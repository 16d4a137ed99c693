//! Request classification.

use http::Method;
use url::{Origin, Url};

use super::Strategy;
use crate::request::RequestDescriptor;

/// Inputs to strategy selection that come from configuration.
#[derive(Debug, Clone)]
pub struct RoutingRules {
    origin: Origin,
    dynamic_prefixes: Vec<String>,
}

impl RoutingRules {
    /// Rules for an application served from `app_url`'s origin.
    pub fn new(app_url: &Url, dynamic_prefixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { origin: app_url.origin(), dynamic_prefixes: dynamic_prefixes.into_iter().map(Into::into).collect() }
    }

    /// Classify a request.
    ///
    /// Priority is fixed: navigation, then dynamic path prefix, then
    /// same-origin GET. The path check does not look at origin or method.
    pub fn select(&self, descriptor: &RequestDescriptor) -> Strategy {
        if descriptor.navigate {
            return Strategy::NavigationFallback;
        }

        let path = descriptor.url.path();
        if self.dynamic_prefixes.iter().any(|prefix| path.starts_with(prefix.as_str())) {
            return Strategy::NetworkFirst;
        }

        if descriptor.method == Method::GET && descriptor.url.origin() == self.origin {
            return Strategy::CacheFirst;
        }

        Strategy::Unhandled
    }
}
