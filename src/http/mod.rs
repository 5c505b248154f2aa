//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → dispatcher.rs (pick upstream from the pool)
//!     → forwarder.rs (rewrite target, relay, stream response)
//!     → Send to client
//! ```

pub mod dispatcher;
pub mod forwarder;
pub mod server;

pub use dispatcher::Dispatcher;
pub use forwarder::Forwarder;
pub use server::HttpServer;
