//! Network access for shelter.
//!
//! This crate provides the reqwest-backed [`Network`](shelter_core::Network)
//! used by the proxy server and CLI for strategy fetches, and the
//! streaming forwarder the server uses for pass-through requests.

pub mod fetch;

pub use fetch::{FetchConfig, Forwarded, HttpNetwork, Upload};
