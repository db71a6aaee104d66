use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use loopgraph_core::config::EngineConfig;
use loopgraph_core::definition::GraphDefinition;
use loopgraph_core::error::Result;
use loopgraph_core::types::{GraphId, RunId, RunState};
use loopgraph_core::value::Fields;
use loopgraph_steps::StepRegistry;

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::executor::Executor;
use crate::graph::{validate, CompiledGraph};
use crate::registry::GraphRegistry;

/// Result of a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutcome {
    pub run_id: RunId,
    /// Final fields plus the execution log.
    pub state: RunState,
}

/// The engine's boundary: create graphs, run them, read checkpoints.
///
/// Each instance owns its own graph registry and checkpoint store, so tests
/// and embedders can hold as many isolated engines as they like. Share one
/// across threads behind an `Arc`; every operation takes `&self`.
pub struct WorkflowEngine {
    graphs: GraphRegistry,
    checkpoints: Arc<CheckpointStore>,
    executor: Executor,
}

impl WorkflowEngine {
    pub fn new(steps: Arc<StepRegistry>, config: &EngineConfig) -> Self {
        let checkpoints = Arc::new(CheckpointStore::new());
        Self {
            graphs: GraphRegistry::new(),
            executor: Executor::new(steps, checkpoints.clone(), config.max_steps),
            checkpoints,
        }
    }

    /// Engine with the built-in steps and default configuration.
    pub fn with_builtins() -> Self {
        Self::new(
            Arc::new(StepRegistry::with_builtins()),
            &EngineConfig::default(),
        )
    }

    /// Validate and register a definition. Nothing is stored if it is invalid.
    pub fn create(&self, def: &GraphDefinition) -> Result<GraphId> {
        let graph = validate(def)?;
        let nodes = graph.node_count();
        let id = self.graphs.register(graph)?;
        info!(graph_id = %id, nodes, start = %def.start, "Graph created");
        Ok(id)
    }

    /// Look up a compiled graph.
    pub fn graph(&self, id: &GraphId) -> Result<Arc<CompiledGraph>> {
        self.graphs.lookup(id)
    }

    pub fn graph_ids(&self) -> Vec<GraphId> {
        self.graphs.ids()
    }

    /// Run a graph under a fresh run id.
    pub fn run(&self, graph_id: &GraphId, initial: Fields) -> Result<RunOutcome> {
        self.run_with_id(graph_id, RunId::new(), initial)
    }

    /// Run a graph under a caller-chosen run id.
    ///
    /// Useful when the caller needs the id to inspect the checkpoint of a
    /// run that fails.
    pub fn run_with_id(
        &self,
        graph_id: &GraphId,
        run_id: RunId,
        initial: Fields,
    ) -> Result<RunOutcome> {
        let graph = self.graphs.lookup(graph_id)?;
        let state = self.executor.run(graph_id, &graph, &run_id, initial)?;
        Ok(RunOutcome { run_id, state })
    }

    /// Latest checkpoint of a run, in flight or finished.
    pub fn checkpoint(&self, run_id: &RunId) -> Result<Checkpoint> {
        self.checkpoints.get(run_id)
    }

    pub fn steps(&self) -> &StepRegistry {
        self.executor.steps()
    }

    pub fn max_steps(&self) -> usize {
        self.executor.max_steps()
    }
}
