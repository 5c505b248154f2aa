//! Request entry point.
//!
//! Every inbound request goes through `Dispatcher::handle`: pick the next
//! upstream, relay, and turn any failure into an HTTP error response. There
//! is no retry against a different upstream when a relay fails.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response},
    response::IntoResponse,
};

use crate::error::ProxyError;
use crate::load_balancer::Pool;

/// Owns the pool and serves every request.
#[derive(Debug)]
pub struct Dispatcher {
    pool: Pool,
}

impl Dispatcher {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Serve one request. Never fails; errors become 502/503 responses.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        match self.relay(&request_id, request).await {
            Ok(response) => response,
            Err(err @ ProxyError::NoAvailableUpstream { .. }) => {
                tracing::warn!(request_id = %request_id, error = %err, "No upstream available");
                err.into_response()
            }
            Err(err) => {
                tracing::error!(request_id = %request_id, error = %err, "Relay failed");
                err.into_response()
            }
        }
    }

    async fn relay(
        &self,
        request_id: &str,
        request: Request<Body>,
    ) -> Result<Response<Body>, ProxyError> {
        let upstream = self.pool.next()?;

        tracing::info!(
            request_id = %request_id,
            upstream = %upstream.address(),
            method = %request.method(),
            path = %request.uri().path(),
            "Forwarding request"
        );

        let response = upstream.relay(request).await?;

        tracing::debug!(
            request_id = %request_id,
            upstream = %upstream.address(),
            status = %response.status(),
            in_flight = upstream.in_flight(),
            "Upstream responded"
        );
        Ok(response)
    }
}

/// Axum handler for every path and method.
pub async fn dispatch(
    State(dispatcher): State<Arc<Dispatcher>>,
    request: Request<Body>,
) -> Response<Body> {
    dispatcher.handle(request).await
}
