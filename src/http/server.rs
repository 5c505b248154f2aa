//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the pool and dispatcher from configuration
//! - Create the Axum router that sends every request to the dispatcher
//! - Wire up middleware (request ID, tracing)
//! - Serve on a bound listener until shutdown

use axum::{routing::any, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::error::ProxyError;
use crate::http::dispatcher::{dispatch, Dispatcher};
use crate::http::forwarder::Forwarder;
use crate::load_balancer::Pool;

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    dispatcher: Arc<Dispatcher>,
}

impl HttpServer {
    /// Create a server over HTTP upstreams built from `config.upstreams`.
    ///
    /// Fails with `EmptyPool` or `InvalidAddress`.
    pub fn new(config: ProxyConfig) -> Result<Self, ProxyError> {
        let forwarder = Forwarder::new(&config.timeouts);
        let pool = Pool::new(config.upstreams.as_slice(), &forwarder)?;

        tracing::info!(
            upstreams = pool.len(),
            relay_timeout_secs = config.timeouts.relay_secs,
            "Upstream pool ready"
        );

        Ok(Self::with_pool(config, pool))
    }

    /// Create a server over an already built pool.
    pub fn with_pool(config: ProxyConfig, pool: Pool) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(pool));
        let router = Self::build_router(Arc::clone(&dispatcher));
        Self {
            router,
            config,
            dispatcher,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(dispatcher: Arc<Dispatcher>) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(dispatcher)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstreams = self.dispatcher.pool().len(),
            "HTTP server starting"
        );

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Router with middleware, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
