//! Core of the shelter offline-first caching proxy.
//!
//! This crate provides:
//! - Strategy selection and execution for intercepted requests
//! - Cache generation provisioning and retirement
//! - The `CacheStore` interface with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod generation;
pub mod network;
pub mod request;
pub mod response;
pub mod strategy;
pub mod url;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{CacheDb, CacheStore, GenerationId, MemoryStore, RequestKey};
pub use config::{AppConfig, ConfigError, ProxySettings};
pub use controller::{Interception, ProxyController};
pub use error::Error;
pub use generation::{AssetFailure, GenerationManager, ProvisionReport};
pub use network::{Network, NetworkError};
pub use request::{ProxyRequest, RequestDescriptor, is_navigation};
pub use response::CachedResponse;
pub use strategy::{RoutingRules, Strategy, StrategyError, StrategyExecutor};
