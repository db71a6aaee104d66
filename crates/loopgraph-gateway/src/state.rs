use std::sync::Arc;

use loopgraph_engine::WorkflowEngine;

/// Shared application state for axum handlers.
pub struct AppState {
    pub engine: Arc<WorkflowEngine>,
}
