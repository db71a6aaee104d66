use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

use tracing::warn;

use loopgraph_core::definition::GraphDefinition;
use loopgraph_core::error::{LoopgraphError, Result};
use loopgraph_core::types::LOG_FIELD;
use loopgraph_core::value::Value;

use super::compiled::{CompareOp, CompiledGraph, LoopTransition, Predicate, Transition};
use crate::merge::MergePolicy;

fn invalid(reason: impl Into<String>) -> LoopgraphError {
    LoopgraphError::Validation(reason.into())
}

/// Validate a definition and compile it.
///
/// Pure: the definition is only read, and nothing is registered.
pub fn validate(def: &GraphDefinition) -> Result<CompiledGraph> {
    if def.nodes.is_empty() {
        return Err(invalid("graph has no nodes"));
    }

    let mut nodes = BTreeMap::new();
    for node in &def.nodes {
        if node.name.trim().is_empty() {
            return Err(invalid("node name must not be empty"));
        }
        if node.step.trim().is_empty() {
            return Err(invalid(format!("node '{}' has no step", node.name)));
        }
        if nodes
            .insert(node.name.clone(), node.step.clone())
            .is_some()
        {
            return Err(invalid(format!("duplicate node name '{}'", node.name)));
        }
    }

    if def.start.is_empty() {
        return Err(invalid("start node must not be empty"));
    }
    if !nodes.contains_key(&def.start) {
        return Err(invalid(format!("start node '{}' is not declared", def.start)));
    }

    let mut default_next = BTreeMap::new();
    for (from, to) in &def.edges {
        if !nodes.contains_key(from) {
            return Err(invalid(format!("edge source '{}' is not declared", from)));
        }
        if !nodes.contains_key(to) {
            return Err(invalid(format!(
                "edge '{}' -> '{}' targets an undeclared node",
                from, to
            )));
        }
        default_next.insert(from.clone(), Transition::Node(to.clone()));
    }

    if let Some(node) = find_default_cycle(&default_next) {
        return Err(invalid(format!(
            "default edges form a cycle through '{}'; use a loop for repetition",
            node
        )));
    }

    let mut loop_next = BTreeMap::new();
    for lp in &def.loops {
        if !nodes.contains_key(&lp.after) {
            return Err(invalid(format!("loop 'after' node '{}' is not declared", lp.after)));
        }
        if !nodes.contains_key(&lp.back_to) {
            return Err(invalid(format!(
                "loop 'back_to' node '{}' is not declared",
                lp.back_to
            )));
        }
        let op = CompareOp::parse(&lp.condition.op).ok_or_else(|| {
            invalid(format!(
                "loop after '{}' uses unsupported operator '{}' (expected gt or lt)",
                lp.after, lp.condition.op
            ))
        })?;
        if lp.condition.key.trim().is_empty() {
            return Err(invalid(format!("loop after '{}' has an empty condition key", lp.after)));
        }
        if !matches!(
            lp.condition.value,
            Value::Integer(_) | Value::Float(_) | Value::Text(_)
        ) {
            return Err(invalid(format!(
                "loop after '{}' compares against {}, expected a number or text",
                lp.after,
                lp.condition.value.kind()
            )));
        }

        let transition = LoopTransition {
            predicate: Predicate {
                key: lp.condition.key.clone(),
                op,
                value: lp.condition.value.clone(),
            },
            target: lp.back_to.clone(),
            fallthrough: default_next
                .get(&lp.after)
                .cloned()
                .unwrap_or(Transition::End),
        };
        if loop_next.insert(lp.after.clone(), transition).is_some() {
            return Err(invalid(format!(
                "node '{}' has more than one loop; combine the conditions into one",
                lp.after
            )));
        }
    }

    if def.merge.contains_key(LOG_FIELD) {
        return Err(invalid(format!(
            "'{}' is reserved for the execution log and takes no merge rule",
            LOG_FIELD
        )));
    }

    let graph = CompiledGraph {
        nodes,
        default_next,
        loop_next,
        start: def.start.clone(),
        merge: MergePolicy::new(def.merge.clone()),
    };

    {
        let reachable = reachable_from_start(&graph);
        for name in graph.node_names() {
            if !reachable.contains(name) {
                warn!(node = name, start = %graph.start, "Node is unreachable from start");
            }
        }
    }

    Ok(graph)
}

/// Find a node on a cycle made only of default edges.
///
/// Each node has at most one default successor, so following the chain from
/// every node either ends or revisits a node on the current path.
fn find_default_cycle(default_next: &BTreeMap<String, Transition>) -> Option<String> {
    let mut cleared: HashSet<&str> = HashSet::new();

    for origin in default_next.keys() {
        let mut path: Vec<&str> = Vec::new();
        let mut current = origin.as_str();
        loop {
            if cleared.contains(current) {
                break;
            }
            if path.contains(&current) {
                return Some(current.to_string());
            }
            path.push(current);
            match default_next.get(current) {
                Some(Transition::Node(next)) => current = next.as_str(),
                _ => break,
            }
        }
        cleared.extend(path);
    }
    None
}

fn reachable_from_start(graph: &CompiledGraph) -> BTreeSet<&str> {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::from([graph.start.as_str()]);

    while let Some(node) = queue.pop_front() {
        if !seen.insert(node) {
            continue;
        }
        if let Some(Transition::Node(next)) = graph.default_next.get(node) {
            queue.push_back(next.as_str());
        }
        if let Some(lp) = graph.loop_next.get(node) {
            queue.push_back(lp.target.as_str());
        }
    }
    seen
}
