use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use loopgraph_core::error::{LoopgraphError, Result};
use loopgraph_core::value::{Fields, Value};

use crate::merge::MergePolicy;

/// Where execution goes after a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transition {
    /// Run the named node next.
    Node(String),
    /// Stop; the run is complete.
    End,
}

impl Transition {
    pub fn node(name: impl Into<String>) -> Self {
        Transition::Node(name.into())
    }

    pub fn is_end(&self) -> bool {
        matches!(self, Transition::End)
    }
}

/// Comparison operator of a loop condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Gt,
    Lt,
}

impl CompareOp {
    /// Parse a declared operator. `None` for anything unsupported.
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "gt" => Some(CompareOp::Gt),
            "lt" => Some(CompareOp::Lt),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CompareOp::Gt => "gt",
            CompareOp::Lt => "lt",
        }
    }

    fn holds(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Lt => ordering == Ordering::Less,
        }
    }
}

/// `fields[key] <op> value`, checked against the post-update state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub key: String,
    pub op: CompareOp,
    pub value: Value,
}

impl Predicate {
    /// Evaluate against the given fields.
    ///
    /// A missing key reads as integer zero. `None` when the present value
    /// cannot be ordered against the condition's value.
    pub fn evaluate(&self, fields: &Fields) -> Option<bool> {
        let ordering = self.current(fields).compare(&self.value)?;
        Some(self.op.holds(ordering))
    }

    fn current<'a>(&self, fields: &'a Fields) -> &'a Value {
        const ZERO: &Value = &Value::Integer(0);
        fields.get(&self.key).unwrap_or(ZERO)
    }
}

/// The conditional branch point after a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopTransition {
    pub predicate: Predicate,
    /// Taken while the predicate holds.
    pub target: String,
    /// Taken once it does not.
    pub fallthrough: Transition,
}

/// A validated, immutable workflow graph.
///
/// Built only by [`crate::graph::validate`]. Every node name it mentions is
/// guaranteed to exist in `nodes`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledGraph {
    pub(crate) nodes: BTreeMap<String, String>,
    pub(crate) default_next: BTreeMap<String, Transition>,
    pub(crate) loop_next: BTreeMap<String, LoopTransition>,
    pub(crate) start: String,
    pub(crate) merge: MergePolicy,
}

impl CompiledGraph {
    /// Entry node.
    pub fn start(&self) -> &str {
        &self.start
    }

    /// Step identifier bound to a node.
    pub fn step_for(&self, node: &str) -> Option<&str> {
        self.nodes.get(node).map(|s| s.as_str())
    }

    /// All node names, sorted.
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.keys().map(|s| s.as_str()).collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Unconditional successor of a node.
    pub fn default_next(&self, node: &str) -> Transition {
        self.default_next
            .get(node)
            .cloned()
            .unwrap_or(Transition::End)
    }

    /// Conditional branch after a node, if one is declared.
    pub fn loop_for(&self, node: &str) -> Option<&LoopTransition> {
        self.loop_next.get(node)
    }

    pub fn merge_policy(&self) -> &MergePolicy {
        &self.merge
    }

    /// Decide the successor of `node` given the post-update fields.
    ///
    /// Fails the node when its loop condition cannot be compared.
    pub fn next_after(&self, node: &str, fields: &Fields) -> Result<Transition> {
        let Some(lp) = self.loop_for(node) else {
            return Ok(self.default_next(node));
        };

        let predicate = &lp.predicate;
        match predicate.evaluate(fields) {
            Some(true) => Ok(Transition::Node(lp.target.clone())),
            Some(false) => Ok(lp.fallthrough.clone()),
            None => {
                let current = predicate.current(fields);
                Err(LoopgraphError::StepExecution {
                    node: node.to_string(),
                    cause: format!(
                        "loop condition cannot compare field '{}' ({}) with {} ({})",
                        predicate.key,
                        current.kind(),
                        predicate.value,
                        predicate.value.kind()
                    ),
                })
            }
        }
    }
}
