//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Mount the API under the configured base path
//! - Wire up middleware (tracing, request ID, timeout, body limit, metrics)
//! - Serve until the shutdown signal fires

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::HttpConfig;
use crate::http::{feature, request, voice};
use crate::query::ServerQuery;
use crate::reconcile::ConfigReconciler;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<ConfigReconciler>,
    pub query: Arc<dyn ServerQuery>,
}

/// HTTP server for the control API.
pub struct HttpServer {
    router: Router,
    config: HttpConfig,
}

impl HttpServer {
    pub fn new(config: &HttpConfig, state: AppState) -> Self {
        Self {
            router: Self::build_router(config, state),
            config: config.clone(),
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(config: &HttpConfig, state: AppState) -> Router {
        let api = Router::new()
            .route("/", get(feature::ping))
            .route("/config/control", post(feature::control))
            .route("/config/all", get(feature::list_all))
            .route("/config/{id}", get(feature::get_config).post(feature::set_config))
            .route("/reload/{id}", get(feature::reload))
            .route("/servertree", get(voice::server_tree))
            .route("/servergroups", get(voice::server_groups))
            .route("/channelgroups", get(voice::channel_groups))
            .route("/find", get(voice::find));

        let base = config.base_path.trim_end_matches('/');
        let app = if base.is_empty() {
            api
        } else {
            Router::new().nest(base, api)
        };

        app.with_state(state)
            .layer(middleware::from_fn(request::track_metrics))
            .layer(DefaultBodyLimit::max(config.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request::make_request_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs))),
            )
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            base_path = %self.config.base_path,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
