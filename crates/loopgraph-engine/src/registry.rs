use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use loopgraph_core::error::{LoopgraphError, Result};
use loopgraph_core::types::GraphId;

use crate::graph::CompiledGraph;

/// Table of compiled graphs, keyed by a freshly generated id.
///
/// Append-only: an entry is never replaced or removed. Reads hand out
/// shared `Arc`s, so any number of runs can execute one graph at once.
pub struct GraphRegistry {
    graphs: RwLock<HashMap<GraphId, Arc<CompiledGraph>>>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self {
            graphs: RwLock::new(HashMap::new()),
        }
    }

    /// Store a compiled graph under a new id.
    pub fn register(&self, graph: CompiledGraph) -> Result<GraphId> {
        let id = GraphId::new();
        let mut graphs = self
            .graphs
            .write()
            .map_err(|e| LoopgraphError::Internal(format!("graph registry lock: {}", e)))?;
        graphs.insert(id.clone(), Arc::new(graph));
        Ok(id)
    }

    pub fn lookup(&self, id: &GraphId) -> Result<Arc<CompiledGraph>> {
        let graphs = self
            .graphs
            .read()
            .map_err(|e| LoopgraphError::Internal(format!("graph registry lock: {}", e)))?;
        graphs
            .get(id)
            .cloned()
            .ok_or_else(|| LoopgraphError::GraphNotFound(id.to_string()))
    }

    /// All registered ids, sorted.
    pub fn ids(&self) -> Vec<GraphId> {
        let mut ids: Vec<GraphId> = match self.graphs.read() {
            Ok(graphs) => graphs.keys().cloned().collect(),
            Err(_) => return vec![],
        };
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.graphs.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GraphRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::validate;
    use loopgraph_core::definition::GraphDefinition;

    fn compiled() -> CompiledGraph {
        validate(&GraphDefinition::new("only").with_node("only", "noop")).unwrap()
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = GraphRegistry::new();
        let id = registry.register(compiled()).unwrap();

        let graph = registry.lookup(&id).unwrap();
        assert_eq!(graph.start(), "only");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_same_graph_gets_distinct_ids() {
        let registry = GraphRegistry::new();
        let a = registry.register(compiled()).unwrap();
        let b = registry.register(compiled()).unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.ids().len(), 2);
    }

    #[test]
    fn test_lookup_unknown() {
        let registry = GraphRegistry::new();
        let err = registry.lookup(&GraphId::from_string("nope")).unwrap_err();
        assert!(matches!(err, LoopgraphError::GraphNotFound(ref id) if id == "nope"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(GraphRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        registry.register(compiled()).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 200);
    }
}
