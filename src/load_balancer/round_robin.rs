//! Round-robin rotation cursor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::ProxyError;
use crate::load_balancer::upstream::Upstream;

/// Round-robin selector.
///
/// Holds the index of the member to be considered next. A selection scans
/// forward from the cursor for the first alive member and moves the cursor
/// one past it. The read-scan-advance step is published with a
/// compare-and-swap, so concurrent selections are serialized: a caller that
/// loses the race rescans from the winner's cursor.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor value, always in `[0, len)` for the pool it serves.
    pub fn position(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Select the next alive member.
    ///
    /// Performs at most `members.len()` liveness checks per attempt. Leaves
    /// the cursor untouched when nothing is alive.
    pub fn next_server(
        &self,
        members: &[Arc<dyn Upstream>],
    ) -> Result<Arc<dyn Upstream>, ProxyError> {
        let len = members.len();
        if len == 0 {
            return Err(ProxyError::NoAvailableUpstream { checked: 0 });
        }

        let mut start = self.cursor.load(Ordering::Acquire);
        loop {
            let index = (0..len)
                .map(|i| (start + i) % len)
                .find(|&index| members[index].is_alive())
                .ok_or(ProxyError::NoAvailableUpstream { checked: len })?;

            match self.cursor.compare_exchange_weak(
                start,
                (index + 1) % len,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(Arc::clone(&members[index])),
                Err(current) => start = current,
            }
        }
    }
}
