//! Upstream pool.
//!
//! # Responsibilities
//! - Own the ordered, non-empty list of upstreams
//! - Apply round-robin rotation to pick the next alive upstream
//! - Reject empty or malformed configurations at construction

use std::sync::Arc;

use crate::error::ProxyError;
use crate::http::forwarder::Forwarder;
use crate::load_balancer::{
    round_robin::RoundRobin,
    upstream::{HttpUpstream, Upstream},
};

/// Ordered upstreams plus the rotation cursor.
#[derive(Debug)]
pub struct Pool {
    members: Vec<Arc<dyn Upstream>>,
    rotation: RoundRobin,
}

impl Pool {
    /// Build a pool of HTTP upstreams, one per address, in order.
    pub fn new<S: AsRef<str>>(addresses: &[S], forwarder: &Forwarder) -> Result<Self, ProxyError> {
        if addresses.is_empty() {
            return Err(ProxyError::EmptyPool);
        }

        let members = addresses
            .iter()
            .map(|address| {
                HttpUpstream::parse(address.as_ref(), forwarder.clone())
                    .map(|u| Arc::new(u) as Arc<dyn Upstream>)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::from_upstreams(members)
    }

    /// Build a pool from already constructed upstreams of any variant.
    pub fn from_upstreams(members: Vec<Arc<dyn Upstream>>) -> Result<Self, ProxyError> {
        if members.is_empty() {
            return Err(ProxyError::EmptyPool);
        }

        for (position, upstream) in members.iter().enumerate() {
            tracing::debug!(position, upstream = %upstream.address(), "Upstream registered");
        }

        Ok(Self {
            members,
            rotation: RoundRobin::new(),
        })
    }

    /// Select the next alive upstream in rotation order.
    pub fn next(&self) -> Result<Arc<dyn Upstream>, ProxyError> {
        let selected = self.rotation.next_server(&self.members);
        if let Err(err) = &selected {
            let addresses: Vec<&str> = self.members.iter().map(|u| u.address()).collect();
            tracing::debug!(error = %err, upstreams = ?addresses, "No alive upstream in pool");
        }
        selected
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Returns `true` if the pool has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in rotation order.
    pub fn members(&self) -> &[Arc<dyn Upstream>] {
        &self.members
    }

    /// Index of the upstream that will be considered next.
    pub fn cursor(&self) -> usize {
        self.rotation.position()
    }

    /// Number of members currently alive.
    pub fn alive_count(&self) -> usize {
        self.members.iter().filter(|u| u.is_alive()).count()
    }
}
