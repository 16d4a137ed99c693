//! Generation-scoped response cache.
//!
//! The proxy only ever talks to the [`CacheStore`] trait. Two backends
//! are provided:
//!
//! - [`CacheDb`]: SQLite via tokio-rusqlite, WAL mode, migrated schema
//! - [`MemoryStore`]: in-process map, used by tests and ephemeral runs

pub mod connection;
pub mod entries;
pub mod key;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use key::RequestKey;
pub use memory::MemoryStore;
pub use store::{CacheStore, GenerationId};
