use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::info;

use loopgraph_core::config::GatewayConfig;
use loopgraph_engine::WorkflowEngine;

use crate::routes;
use crate::state::AppState;

/// HTTP gateway in front of a [`WorkflowEngine`], built on axum.
pub struct GatewayServer {
    config: GatewayConfig,
    engine: Arc<WorkflowEngine>,
}

impl GatewayServer {
    pub fn new(config: GatewayConfig, engine: Arc<WorkflowEngine>) -> Self {
        Self { config, engine }
    }

    /// Run the gateway server until the cancellation token is triggered.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let state = Arc::new(AppState {
            engine: self.engine.clone(),
        });
        let app = router(state);

        let listener = TcpListener::bind(&self.config.bind).await?;
        info!(bind = %self.config.bind, "Gateway listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await?;

        info!("Gateway shut down");
        Ok(())
    }
}

/// All gateway routes over the given state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(routes::health))
        .route("/graph/create", post(routes::create_graph))
        .route("/graph/run", post(routes::run_graph))
        .route("/graph/state/{run_id}", get(routes::get_state))
        .route("/graph/{graph_id}", get(routes::get_graph))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
