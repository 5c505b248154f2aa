//! Upstream abstraction.
//!
//! # Responsibilities
//! - Represent a single backend target by its validated base URL
//! - Track liveness (readable/writable from any task)
//! - Track in-flight relays with an RAII guard
//! - Relay one request/response pair through the shared `Forwarder`

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use url::Url;

use crate::error::ProxyError;
use crate::http::forwarder::Forwarder;

/// Capability interface for a backend target.
#[async_trait]
pub trait Upstream: Send + Sync + fmt::Debug {
    /// The base URL this upstream was constructed from.
    fn address(&self) -> &str;

    /// Current liveness.
    fn is_alive(&self) -> bool;

    /// Update liveness. Hook for a health checker.
    fn set_alive(&self, alive: bool);

    /// Number of relays currently in progress.
    fn in_flight(&self) -> usize;

    /// Forward `request` to this upstream and return its response.
    async fn relay(&self, request: Request<Body>) -> Result<Response<Body>, ProxyError>;
}

/// Parse and validate an upstream base URL.
///
/// Accepts `http` URLs with a host and no path, query, fragment or
/// credentials. A trailing `/` is tolerated.
pub fn parse_address(address: &str) -> Result<Url, ProxyError> {
    let invalid = |reason: &str| ProxyError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(address).map_err(|e| invalid(&e.to_string()))?;

    if url.scheme() != "http" {
        return Err(invalid("only the http scheme is supported"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host"));
    }
    if url.path() != "/" {
        return Err(invalid("base URL must not contain a path"));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("base URL must not contain a query or fragment"));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(invalid("credentials are not allowed"));
    }
    Ok(url)
}

/// A live HTTP-backed upstream.
#[derive(Debug)]
pub struct HttpUpstream {
    /// Address as configured, used for logging and identity.
    address: String,
    /// Parsed base URL.
    base_url: Url,
    alive: AtomicBool,
    in_flight: Arc<AtomicUsize>,
    forwarder: Forwarder,
}

impl HttpUpstream {
    /// Validate `address` and build an upstream relaying through `forwarder`.
    pub fn parse(address: &str, forwarder: Forwarder) -> Result<Self, ProxyError> {
        let base_url = parse_address(address)?;
        Ok(Self {
            address: address.to_string(),
            base_url,
            alive: AtomicBool::new(true),
            in_flight: Arc::new(AtomicUsize::new(0)),
            forwarder,
        })
    }

    fn track(&self) -> InFlightGuard {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        InFlightGuard {
            count: Arc::clone(&self.in_flight),
        }
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    fn set_alive(&self, alive: bool) {
        let was = self.alive.swap(alive, Ordering::AcqRel);
        if was != alive {
            tracing::info!(upstream = %self.address, alive, "Upstream liveness changed");
        }
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    async fn relay(&self, request: Request<Body>) -> Result<Response<Body>, ProxyError> {
        // Held across the await; dropped on every exit path, including the
        // handler future being dropped when the client goes away.
        let _guard = self.track();
        self.forwarder.forward(&self.base_url, request).await
    }
}

/// A RAII guard that manages the in-flight relay count.
#[derive(Debug)]
struct InFlightGuard {
    count: Arc<AtomicUsize>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.count.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeoutConfig;

    fn forwarder() -> Forwarder {
        Forwarder::new(&TimeoutConfig::default())
    }

    #[test]
    fn accepts_plain_base_urls() {
        assert!(parse_address("http://127.0.0.1:8080").is_ok());
        assert!(parse_address("http://backend.internal").is_ok());
        assert!(parse_address("http://backend.internal/").is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "not a url",
            "127.0.0.1:8080",
            "https://example.com",
            "http://example.com/api",
            "http://example.com/?q=1",
            "http://user:pw@example.com",
        ] {
            let err = parse_address(bad).unwrap_err();
            assert!(
                matches!(err, ProxyError::InvalidAddress { ref address, .. } if address == bad),
                "{bad} should be rejected, got {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn liveness_is_mutable() {
        let upstream = HttpUpstream::parse("http://127.0.0.1:9", forwarder()).unwrap();
        assert!(upstream.is_alive());
        upstream.set_alive(false);
        assert!(!upstream.is_alive());
        upstream.set_alive(true);
        assert!(upstream.is_alive());
        assert_eq!(upstream.address(), "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn in_flight_guard_released_after_failed_relay() {
        // Bind then drop to get a port with nothing listening.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let upstream = HttpUpstream::parse(&format!("http://{addr}"), forwarder()).unwrap();
        let request = Request::builder().uri("/").body(Body::empty()).unwrap();

        let err = upstream.relay(request).await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamUnreachable { .. }));
        assert_eq!(upstream.in_flight(), 0);
    }
}
