//! Proxy failures as HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use shelter_core::{NetworkError, StrategyError};

/// Failures the proxy reports to its clients.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// A handled request could not be served.
    #[error(transparent)]
    Strategy(#[from] StrategyError),

    /// A pass-through request could not reach upstream.
    #[error("UPSTREAM_UNREACHABLE: {0}")]
    Upstream(#[from] NetworkError),

    /// The client sent a body larger than the configured limit.
    #[error("BODY_TOO_LARGE: {0}")]
    BodyTooLarge(String),

    /// The request target could not be turned into a URL.
    #[error("INVALID_TARGET: {0}")]
    BadTarget(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::Strategy(StrategyError::CacheMiss(_)) => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Strategy(StrategyError::AssetUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ProxyError::BodyTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::BadTarget(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}
