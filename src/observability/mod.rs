//! Observability subsystem.
//!
//! Structured logging only: `tracing` events from every subsystem, one
//! `TraceLayer` span per inbound request, `x-request-id` on every event
//! the dispatcher emits.

pub mod logging;

pub use logging::init_logging;
