use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::value::{Fields, Value};

/// Name of the execution-log field in a serialized run state.
///
/// Reserved: steps never write it and callers never seed it.
pub const LOG_FIELD: &str = "log";

/// Unique identifier of a registered graph.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GraphId(pub String);

impl GraphId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier of a single run; keys the checkpoint store.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One executed node in a run's trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Node that ran.
    pub node: String,
    /// Step the node is bound to.
    pub step: String,
    /// The partial update the step returned.
    pub update: Fields,
}

/// Mutable state of one run: the field bag plus the append-only log.
///
/// Serializes as a flat object, `{"<field>": ..., "log": [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(flatten)]
    pub fields: Fields,
    #[serde(default)]
    pub log: Vec<LogEntry>,
}

impl RunState {
    pub fn new(fields: Fields) -> Self {
        Self {
            fields,
            log: Vec::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Number of node executions recorded so far.
    pub fn steps(&self) -> usize {
        self.log.len()
    }

    /// Node names in execution order.
    pub fn trace(&self) -> Vec<&str> {
        self.log.iter().map(|e| e.node.as_str()).collect()
    }
}
