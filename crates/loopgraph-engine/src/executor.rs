use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, warn};

use loopgraph_core::error::{LoopgraphError, Result};
use loopgraph_core::types::{GraphId, LogEntry, RunId, RunState, LOG_FIELD};
use loopgraph_core::value::Fields;
use loopgraph_steps::StepRegistry;

use crate::checkpoint::{Checkpoint, CheckpointStore, RunStatus};
use crate::graph::{CompiledGraph, Transition};

/// Interprets a compiled graph for one run at a time.
///
/// Starting at the graph's entry node, it invokes each node's step on the
/// current fields, folds the update in through the graph's merge policy,
/// checkpoints, and then picks the successor: the loop target while the
/// node's loop predicate holds, otherwise the default edge. A run ends at
/// a terminal transition or fails once `max_steps` nodes have executed
/// without reaching one.
pub struct Executor {
    steps: Arc<StepRegistry>,
    checkpoints: Arc<CheckpointStore>,
    max_steps: usize,
}

impl Executor {
    pub fn new(
        steps: Arc<StepRegistry>,
        checkpoints: Arc<CheckpointStore>,
        max_steps: usize,
    ) -> Self {
        Self {
            steps,
            checkpoints,
            max_steps,
        }
    }

    pub fn steps(&self) -> &StepRegistry {
        &self.steps
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Execute `graph` from its start node with the given initial fields.
    ///
    /// On failure the run's checkpoint is marked failed and keeps the log
    /// up to the last completed node.
    pub fn run(
        &self,
        graph_id: &GraphId,
        graph: &CompiledGraph,
        run_id: &RunId,
        initial: Fields,
    ) -> Result<RunState> {
        if initial.contains_key(LOG_FIELD) {
            return Err(LoopgraphError::InvalidInput(format!(
                "'{}' is reserved for the execution log",
                LOG_FIELD
            )));
        }

        let started = Instant::now();
        let mut state = RunState::new(initial);
        self.save(run_id, graph_id, &state, RunStatus::Running)?;

        info!(
            run_id = %run_id,
            graph_id = %graph_id,
            start = graph.start(),
            "Starting run"
        );

        let mut current = Transition::node(graph.start());
        while let Transition::Node(node) = current {
            if state.steps() >= self.max_steps {
                return Err(self.fail(
                    run_id,
                    graph_id,
                    &state,
                    LoopgraphError::StepLimitExceeded(self.max_steps),
                ));
            }

            if let Err(e) = self.execute_node(graph, &node, &mut state) {
                return Err(self.fail(run_id, graph_id, &state, e));
            }
            self.save(run_id, graph_id, &state, RunStatus::Running)?;

            current = match graph.next_after(&node, &state.fields) {
                Ok(next) => next,
                Err(e) => return Err(self.fail(run_id, graph_id, &state, e)),
            };
            debug!(run_id = %run_id, from = %node, to = ?current, "Transition");
        }

        self.save(run_id, graph_id, &state, RunStatus::Completed)?;
        info!(
            run_id = %run_id,
            steps = state.steps(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Run complete"
        );
        Ok(state)
    }

    /// Invoke one node's step and merge its update into `state`.
    fn execute_node(&self, graph: &CompiledGraph, node: &str, state: &mut RunState) -> Result<()> {
        let step_id = graph.step_for(node).ok_or_else(|| {
            LoopgraphError::Internal(format!("compiled graph has no node '{}'", node))
        })?;

        let node_start = Instant::now();
        let update = self
            .steps
            .invoke(step_id, &state.fields)
            .map_err(|e| LoopgraphError::StepExecution {
                node: node.to_string(),
                cause: e.to_string(),
            })?;

        let updated: Vec<&str> = update.keys().map(|k| k.as_str()).collect();
        debug!(
            node,
            step = step_id,
            updated = ?updated,
            elapsed_ms = node_start.elapsed().as_millis() as u64,
            "Node executed"
        );

        let entry = LogEntry {
            node: node.to_string(),
            step: step_id.to_string(),
            update,
        };
        graph.merge_policy().apply(state, entry)
    }

    fn save(
        &self,
        run_id: &RunId,
        graph_id: &GraphId,
        state: &RunState,
        status: RunStatus,
    ) -> Result<()> {
        self.checkpoints.put(Checkpoint {
            run_id: run_id.clone(),
            graph_id: graph_id.clone(),
            step: state.steps(),
            status,
            state: state.clone(),
            updated_at: Utc::now(),
        })
    }

    /// Mark the run failed and hand back the error that failed it.
    fn fail(
        &self,
        run_id: &RunId,
        graph_id: &GraphId,
        state: &RunState,
        error: LoopgraphError,
    ) -> LoopgraphError {
        warn!(run_id = %run_id, steps = state.steps(), error = %error, "Run failed");

        let status = RunStatus::Failed {
            reason: error.to_string(),
        };
        if let Err(e) = self.save(run_id, graph_id, state, status) {
            warn!(run_id = %run_id, error = %e, "Failed to checkpoint failed run");
        }
        error
    }
}
