//! Lifecycle management.
//!
//! Startup is linear: parse config → init logging → build pool → bind →
//! serve. Any startup error is fatal. `shutdown.rs` stops the serving loop
//! on Ctrl-C; in-flight connection draining is not attempted beyond what
//! axum's graceful shutdown does.

pub mod shutdown;

pub use shutdown::Shutdown;
