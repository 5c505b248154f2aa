//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request (dispatcher)
//!     → pool.rs (ordered upstream list)
//!     → round_robin.rs (scan from cursor for first alive upstream, advance)
//!     → upstream.rs (relay through the shared forwarder)
//!     → Return response or error
//! ```
//!
//! # Design Decisions
//! - Members are fixed at startup; only liveness changes afterwards
//! - Cursor advance is a single compare-and-swap step
//! - Unhealthy upstreams are skipped; an all-dead scan stops after one cycle
//! - Upstream is a trait so tests can substitute an in-memory stub

pub mod pool;
pub mod round_robin;
pub mod stub;
pub mod upstream;

pub use pool::Pool;
pub use stub::{StubBehavior, StubUpstream};
pub use upstream::{HttpUpstream, Upstream};
