//! In-memory upstream for tests and local experiments.
//!
//! Returns canned responses without any network I/O and counts how often
//! it was checked and relayed to.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode};

use crate::error::ProxyError;
use crate::load_balancer::upstream::Upstream;

/// What a stub does when relayed to.
#[derive(Debug, Clone)]
pub enum StubBehavior {
    /// Answer with a fixed status and body.
    Respond { status: StatusCode, body: String },
    /// Fail as if the connection was refused.
    Unreachable,
    /// Fail as if the upstream sent garbage.
    ProtocolError,
}

/// A canned-response upstream.
#[derive(Debug)]
pub struct StubUpstream {
    address: String,
    alive: AtomicBool,
    behavior: StubBehavior,
    checks: AtomicUsize,
    relays: AtomicUsize,
}

impl StubUpstream {
    /// A healthy stub answering `200 OK` with `body`.
    pub fn new(address: impl Into<String>, body: impl Into<String>) -> Self {
        Self::with_behavior(
            address,
            StubBehavior::Respond {
                status: StatusCode::OK,
                body: body.into(),
            },
        )
    }

    pub fn with_behavior(address: impl Into<String>, behavior: StubBehavior) -> Self {
        Self {
            address: address.into(),
            alive: AtomicBool::new(true),
            behavior,
            checks: AtomicUsize::new(0),
            relays: AtomicUsize::new(0),
        }
    }

    /// Builder-style liveness override.
    pub fn alive(self, alive: bool) -> Self {
        self.alive.store(alive, Ordering::Release);
        self
    }

    /// Number of `is_alive` calls observed.
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }

    /// Number of relays served.
    pub fn relays(&self) -> usize {
        self.relays.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Upstream for StubUpstream {
    fn address(&self) -> &str {
        &self.address
    }

    fn is_alive(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.alive.load(Ordering::Acquire)
    }

    fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Release);
    }

    // Stub relays finish without suspending.
    fn in_flight(&self) -> usize {
        0
    }

    async fn relay(&self, _request: Request<Body>) -> Result<Response<Body>, ProxyError> {
        self.relays.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            StubBehavior::Respond { status, body } => {
                let mut response = Response::new(Body::from(body.clone()));
                *response.status_mut() = *status;
                Ok(response)
            }
            StubBehavior::Unreachable => Err(ProxyError::UpstreamUnreachable {
                address: self.address.clone(),
                reason: "connection refused".into(),
            }),
            StubBehavior::ProtocolError => Err(ProxyError::UpstreamProtocolError {
                address: self.address.clone(),
                reason: "invalid HTTP response".into(),
            }),
        }
    }
}
