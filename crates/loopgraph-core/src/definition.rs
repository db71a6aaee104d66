use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A caller-supplied workflow declaration: nodes, default edges, and
/// conditional loop-backs.
///
/// This is raw input. Nothing here is checked until it is compiled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphDefinition {
    /// Nodes in declaration order.
    pub nodes: Vec<NodeDef>,
    /// Default successor per source node.
    #[serde(default)]
    pub edges: BTreeMap<String, String>,
    /// Conditional loop-backs, evaluated after their `after` node.
    #[serde(default)]
    pub loops: Vec<LoopDef>,
    /// Entry node.
    pub start: String,
    /// Per-field merge rules. Fields not listed are replaced.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub merge: BTreeMap<String, MergeRule>,
}

/// A named node bound to a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDef {
    pub name: String,
    #[serde(alias = "tool")]
    pub step: String,
}

/// A conditional transition evaluated after `after` runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoopDef {
    pub after: String,
    pub condition: ConditionDef,
    pub back_to: String,
}

/// `fields[key] <op> value`. The operator stays a string until compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionDef {
    pub key: String,
    pub op: String,
    pub value: Value,
}

/// How a step's output for a field is folded into the running state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeRule {
    /// Last writer wins.
    #[default]
    Replace,
    /// Accumulate into a list.
    Append,
}

impl GraphDefinition {
    /// Start an empty definition with the given entry node.
    pub fn new(start: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            ..Self::default()
        }
    }

    /// Add a node.
    pub fn with_node(mut self, name: impl Into<String>, step: impl Into<String>) -> Self {
        self.nodes.push(NodeDef {
            name: name.into(),
            step: step.into(),
        });
        self
    }

    /// Add a default edge.
    pub fn with_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.insert(from.into(), to.into());
        self
    }

    /// Add a loop-back: after `after`, go to `back_to` while `key op value` holds.
    pub fn with_loop(
        mut self,
        after: impl Into<String>,
        key: impl Into<String>,
        op: impl Into<String>,
        value: impl Into<Value>,
        back_to: impl Into<String>,
    ) -> Self {
        self.loops.push(LoopDef {
            after: after.into(),
            condition: ConditionDef {
                key: key.into(),
                op: op.into(),
                value: value.into(),
            },
            back_to: back_to.into(),
        });
        self
    }

    /// Set the merge rule for a field.
    pub fn with_merge_rule(mut self, field: impl Into<String>, rule: MergeRule) -> Self {
        self.merge.insert(field.into(), rule);
        self
    }
}
