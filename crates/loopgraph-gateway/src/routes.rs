use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use tracing::{error, info, warn};

use loopgraph_core::definition::GraphDefinition;
use loopgraph_core::error::LoopgraphError;
use loopgraph_core::types::{GraphId, RunId};
use loopgraph_core::value::Fields;
use loopgraph_engine::{Checkpoint, CompiledGraph};

use crate::state::AppState;

/// Error body returned by every failing route: `{"error": ...}`, plus the
/// run id when the failed run has a checkpoint.
pub struct ApiError {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiError {
    fn from_engine(err: &LoopgraphError, run_id: Option<&RunId>) -> Self {
        let status = if err.is_not_found() {
            StatusCode::NOT_FOUND
        } else if err.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %err, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };

        let mut body = serde_json::json!({ "error": err.to_string() });
        if let Some(run_id) = run_id {
            body["run_id"] = serde_json::json!(run_id);
        }
        Self { status, body }
    }

    fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(error = %message, "Request failed");
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: serde_json::json!({ "error": message }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// GET /api/health
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// POST /graph/create
pub async fn create_graph(
    State(state): State<Arc<AppState>>,
    Json(def): Json<GraphDefinition>,
) -> Result<Json<serde_json::Value>, ApiError> {
    match state.engine.create(&def) {
        Ok(graph_id) => Ok(Json(serde_json::json!({ "graph_id": graph_id }))),
        Err(e) => {
            warn!(error = %e, "Rejected graph definition");
            Err(ApiError::from_engine(&e, None))
        }
    }
}

#[derive(Deserialize)]
pub struct RunRequest {
    pub graph_id: String,
    #[serde(default)]
    pub initial_state: Fields,
}

// POST /graph/run
pub async fn run_graph(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RunRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let graph_id = GraphId::from_string(&body.graph_id);
    let run_id = RunId::new();

    // Steps are synchronous; keep them off the async workers.
    let engine = state.engine.clone();
    let task_graph_id = graph_id.clone();
    let task_run_id = run_id.clone();
    let result = tokio::task::spawn_blocking(move || {
        engine.run_with_id(&task_graph_id, task_run_id, body.initial_state)
    })
    .await
    .map_err(|e| ApiError::internal(format!("run task panicked: {}", e)))?;

    match result {
        Ok(outcome) => {
            info!(
                graph_id = %graph_id,
                run_id = %outcome.run_id,
                steps = outcome.state.steps(),
                "Run completed"
            );
            Ok(Json(serde_json::json!({
                "run_id": outcome.run_id,
                "execution_log": outcome.state.log,
                "final_state": outcome.state,
            })))
        }
        Err(e) => {
            warn!(graph_id = %graph_id, run_id = %run_id, error = %e, "Run failed");
            // Only point the caller at runs that left a checkpoint behind.
            let started = state.engine.checkpoint(&run_id).is_ok();
            Err(ApiError::from_engine(&e, started.then_some(&run_id)))
        }
    }
}

// GET /graph/state/{run_id}
pub async fn get_state(
    State(state): State<Arc<AppState>>,
    Path(run_id): Path<String>,
) -> Result<Json<Checkpoint>, ApiError> {
    state
        .engine
        .checkpoint(&RunId::from_string(&run_id))
        .map(Json)
        .map_err(|e| ApiError::from_engine(&e, None))
}

// GET /graph/{graph_id}
pub async fn get_graph(
    State(state): State<Arc<AppState>>,
    Path(graph_id): Path<String>,
) -> Result<Json<CompiledGraph>, ApiError> {
    let graph = state
        .engine
        .graph(&GraphId::from_string(&graph_id))
        .map_err(|e| ApiError::from_engine(&e, None))?;
    Ok(Json(graph.as_ref().clone()))
}
