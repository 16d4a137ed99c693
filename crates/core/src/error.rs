//! Unified error types for shelter.
//!
//! Display strings carry a stable upper-case code prefix so hosts can
//! log and match on them without depending on the variant layout.
//! Per-request failures are [`StrategyError`](crate::StrategyError); this
//! type covers lifecycle, storage and configuration.

use tokio_rusqlite::rusqlite;

use crate::network::NetworkError;

/// Unified error types for the shelter proxy.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The network could not produce a response.
    #[error("NETWORK_FAILURE: {0}")]
    NetworkFailure(#[from] NetworkError),

    /// Some static assets could not be stored while provisioning.
    #[error("PROVISIONING_PARTIAL_FAILURE: {failed} of {total} assets failed")]
    ProvisioningPartialFailure { failed: usize, total: usize },

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}
