use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use loopgraph_core::error::{LoopgraphError, Result};
use loopgraph_core::types::{GraphId, RunId, RunState};

/// Where a run stands as of its latest checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Completed,
    Failed { reason: String },
}

/// Snapshot of a run after its most recent completed step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub run_id: RunId,
    pub graph_id: GraphId,
    /// Node executions completed so far.
    pub step: usize,
    pub status: RunStatus,
    pub state: RunState,
    /// When the checkpoint was written.
    pub updated_at: DateTime<Utc>,
}

/// In-memory checkpoint store, keyed by run id.
///
/// Keeps only the latest snapshot per run. Nothing is evicted, so it is
/// bounded only by process memory.
pub struct CheckpointStore {
    entries: Mutex<HashMap<RunId, Checkpoint>>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Save a checkpoint, replacing any earlier one for the same run.
    pub fn put(&self, cp: Checkpoint) -> Result<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| LoopgraphError::Internal(format!("checkpoint store lock: {}", e)))?;
        entries.insert(cp.run_id.clone(), cp);
        Ok(())
    }

    /// Load the latest checkpoint for a run.
    pub fn get(&self, run_id: &RunId) -> Result<Checkpoint> {
        let entries = self
            .entries
            .lock()
            .map_err(|e| LoopgraphError::Internal(format!("checkpoint store lock: {}", e)))?;
        entries
            .get(run_id)
            .cloned()
            .ok_or_else(|| LoopgraphError::RunNotFound(run_id.to_string()))
    }

    pub fn contains(&self, run_id: &RunId) -> bool {
        self.entries
            .lock()
            .map(|e| e.contains_key(run_id))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}
