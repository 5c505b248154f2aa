//! Error taxonomy for pool construction and request dispatch.
//!
//! # Propagation
//! - `InvalidAddress`, `EmptyPool`: startup only, fatal to the process
//! - `NoAvailableUpstream`: recovered per request, answered with 503
//! - `UpstreamUnreachable`, `UpstreamProtocolError`: recovered per request,
//!   answered with 502 (no retry against another upstream)

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Errors produced by the selection and relay engine.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// Upstream address failed URL validation.
    #[error("invalid upstream address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// No upstreams were configured.
    #[error("upstream pool is empty")]
    EmptyPool,

    /// Every upstream was unhealthy during one full scan.
    #[error("no available upstream ({checked} checked)")]
    NoAvailableUpstream { checked: usize },

    /// Connect failure, reset, or relay timeout.
    #[error("upstream {address} unreachable: {reason}")]
    UpstreamUnreachable { address: String, reason: String },

    /// Upstream answered with something that is not valid HTTP.
    #[error("upstream {address} protocol error: {reason}")]
    UpstreamProtocolError { address: String, reason: String },
}

impl ProxyError {
    /// Short machine-readable kind, used in error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::InvalidAddress { .. } => "invalid_address",
            ProxyError::EmptyPool => "empty_pool",
            ProxyError::NoAvailableUpstream { .. } => "no_available_upstream",
            ProxyError::UpstreamUnreachable { .. } => "upstream_unreachable",
            ProxyError::UpstreamProtocolError { .. } => "upstream_protocol_error",
        }
    }

    /// Status code returned to the client for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::NoAvailableUpstream { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::UpstreamUnreachable { .. } | ProxyError::UpstreamProtocolError { .. } => {
                StatusCode::BAD_GATEWAY
            }
            // Startup errors never reach a client in practice.
            ProxyError::InvalidAddress { .. } | ProxyError::EmptyPool => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        let json = serde_json::to_vec(&body).unwrap_or_default();

        let mut response = Response::new(axum::body::Body::from(json));
        *response.status_mut() = self.status();
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    }
}
