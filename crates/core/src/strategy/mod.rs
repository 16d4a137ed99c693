//! Strategy selection and execution.
//!
//! Every intercepted request is classified into one [`Strategy`]:
//!
//! | Strategy             | Order                          | Writes cache |
//! |----------------------|--------------------------------|--------------|
//! | `NavigationFallback` | network, then offline document | no           |
//! | `NetworkFirst`       | network, then cache            | yes (async)  |
//! | `CacheFirst`         | cache, then network            | no           |
//! | `Unhandled`          | not intercepted                | no           |

pub mod executor;
pub mod selector;

use std::fmt;

pub use executor::StrategyExecutor;
pub use selector::RoutingRules;

/// How a request is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    NavigationFallback,
    NetworkFirst,
    CacheFirst,
    Unhandled,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NavigationFallback => "navigation_fallback",
            Self::NetworkFirst => "network_first",
            Self::CacheFirst => "cache_first",
            Self::Unhandled => "unhandled",
        }
    }

    /// Whether the proxy commits to answering requests with this strategy.
    pub fn is_handled(&self) -> bool {
        !matches!(self, Self::Unhandled)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failures of a handled request.
///
/// Network and store errors never escape a strategy; they are absorbed by a
/// fallback or turned into one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    /// No network response and nothing cached for the request URL.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Navigation failed offline and the fallback document was never cached.
    #[error("ASSET_UNAVAILABLE: {0}")]
    AssetUnavailable(String),
}
