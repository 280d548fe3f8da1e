//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Wrap the route router in the server-wide layers (timeout, body limit,
//!   request ID, tracing)
//! - Bind to a listener and serve until shutdown

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderName;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};

/// HTTP server for discovered routes.
pub struct HttpServer {
    router: Router,
    config: Config,
}

impl HttpServer {
    /// Wrap `routes` (usually from `AxumRegistrar::into_router`).
    pub fn new(config: Config, routes: Router) -> Self {
        let router = Self::build_router(&config, routes);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &Config, routes: Router) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        routes
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, UuidRequestId))
    }

    /// The fully layered router, for driving without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

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

    /// Get a reference to the config.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
