//! HTTP server for the management and public surfaces.

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::Request;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::classify::ServerErrorsFailureClass;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::routes;
use crate::config::CoreConfig;
use crate::registry::{InterestRegistry, ServiceRegistry};
use crate::{Error, Result};

/// Listener configuration for one HTTP surface.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Address to bind to
    pub bind_address: String,
    /// Port to listen on, 0 for an OS-assigned port
    pub port: u16,
    /// Whether to allow cross-origin requests
    pub enable_cors: bool,
}

impl ApiServerConfig {
    /// Listener settings for the management surface.
    pub fn management(config: &CoreConfig) -> Self {
        Self {
            bind_address: config.management_bind.clone(),
            port: config.management_port,
            enable_cors: false,
        }
    }

    /// Listener settings for the public surface.
    pub fn public(config: &CoreConfig) -> Self {
        Self {
            bind_address: config.api_bind.clone(),
            port: config.api_port,
            enable_cors: true,
        }
    }
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8081,
            enable_cors: true,
        }
    }
}

/// Shared state for API handlers.
#[derive(Clone)]
pub struct AppState {
    /// Process start time, used for uptime reporting.
    pub start_time: Instant,
    /// Service registry shared with the orchestrator.
    pub registry: Arc<ServiceRegistry>,
    /// Interest registry slot, bound once storage-backed configuration is
    /// available. Handlers answer 503 while it is empty.
    interests: Arc<OnceLock<Arc<InterestRegistry>>>,
}

impl AppState {
    /// Create state over a service registry. The interest registry starts
    /// unbound.
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self {
            start_time: Instant::now(),
            registry,
            interests: Arc::new(OnceLock::new()),
        }
    }

    /// The interest registry, if bootstrap has bound one yet.
    pub fn interests(&self) -> Option<Arc<InterestRegistry>> {
        self.interests.get().cloned()
    }

    /// Bind the interest registry. Later calls are ignored with a warning.
    pub fn bind_interests(&self, interests: Arc<InterestRegistry>) {
        if self.interests.set(interests).is_err() {
            tracing::warn!("Interest registry already bound, ignoring");
        }
    }
}

/// Which route set a listener serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Surface {
    Management,
    Public,
}

impl Surface {
    fn name(self) -> &'static str {
        match self {
            Surface::Management => "management",
            Surface::Public => "public",
        }
    }
}

/// One HTTP listener of the core.
pub struct ApiServer {
    config: ApiServerConfig,
    surface: Surface,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    /// Create the management surface server.
    pub fn management(config: ApiServerConfig, state: AppState) -> Self {
        Self {
            config,
            surface: Surface::Management,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Create the public surface server.
    pub fn public(config: ApiServerConfig, state: AppState) -> Self {
        Self {
            config,
            surface: Surface::Public,
            state,
            cancel_token: CancellationToken::new(),
        }
    }

    /// Build the router with all middleware and routes.
    fn build_router(&self) -> Router {
        let mut router = match self.surface {
            Surface::Management => routes::management_router(self.state.clone()),
            Surface::Public => routes::public_router(self.state.clone()),
        };

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            router = router.layer(cors);
        }

        // Health monitors hit /ping every few seconds; keep those requests
        // out of the logs.
        router = router.layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    if req.uri().path() == "/ping" {
                        Span::none()
                    } else {
                        tracing::info_span!(
                            "request",
                            method = %req.method(),
                            path = %req.uri().path(),
                        )
                    }
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        tracing::info!(
                            parent: span,
                            status = res.status().as_u16(),
                            latency_ms = latency.as_millis() as u64,
                            "request completed"
                        );
                    },
                )
                .on_failure(
                    |class: ServerErrorsFailureClass, _latency: Duration, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        tracing::error!(parent: span, classification = %class, "request failed");
                    },
                ),
        );
        router
    }

    /// Bind the listener and start serving on a background task.
    ///
    /// Returns the bound address, which differs from the configured one
    /// when the port was 0. The task serves until the cancellation token
    /// fires, then drains in-flight connections.
    pub async fn bind(&self) -> Result<BoundApi> {
        let addr: SocketAddr = format!("{}:{}", self.config.bind_address, self.config.port)
            .parse()
            .map_err(|e| Error::config(format!("invalid bind address: {e}")))?;

        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;
        let surface = self.surface.name();
        tracing::info!("{surface} API listening on http://{local_addr}");

        let router = self.build_router();
        let cancel_token = self.cancel_token.clone();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel_token.cancelled().await;
                    tracing::info!("{surface} API shutting down");
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "{surface} API server error");
            }
        });

        Ok(BoundApi {
            surface: self.surface,
            local_addr,
            handle,
        })
    }

    /// Signal the listener to stop accepting and drain.
    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}

/// Handle to a bound, serving listener.
pub struct BoundApi {
    surface: Surface,
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl BoundApi {
    /// The address the listener is actually bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait up to `grace` for the serve task to finish draining.
    ///
    /// Returns false if the drain window elapsed; the task is left to
    /// finish on its own in that case.
    pub async fn join(self, grace: Duration) -> bool {
        match tokio::time::timeout(grace, self.handle).await {
            Ok(_) => true,
            Err(_) => {
                tracing::warn!(
                    surface = self.surface.name(),
                    grace_secs = grace.as_secs(),
                    "API listener did not drain within the grace period"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod server_tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = ApiServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 8081);
        assert!(config.enable_cors);
    }

    #[test]
    fn management_config_disables_cors() {
        let core = CoreConfig::default();
        let config = ApiServerConfig::management(&core);
        assert_eq!(config.port, 0);
        assert!(!config.enable_cors);
    }

    #[test]
    fn interests_start_unbound() {
        let state = AppState::new(Arc::new(ServiceRegistry::new()));
        assert!(state.interests().is_none());
    }

    #[tokio::test]
    async fn bind_reports_ephemeral_port() {
        let state = AppState::new(Arc::new(ServiceRegistry::new()));
        let config = ApiServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
            enable_cors: false,
        };
        let server = ApiServer::management(config, state);
        let bound = server.bind().await.expect("bind should succeed");
        assert_ne!(bound.local_addr().port(), 0);

        server.shutdown();
        assert!(bound.join(Duration::from_secs(5)).await);
    }
}
