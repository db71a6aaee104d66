use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use loopgraph_core::error::{LoopgraphError, Result};
use loopgraph_core::traits::Step;
use loopgraph_core::value::Fields;

/// A step backed by a plain function or closure.
pub struct FnStep<F> {
    name: String,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(&Fields) -> Result<Fields> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> Step for FnStep<F>
where
    F: Fn(&Fields) -> Result<Fields> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, fields: &Fields) -> Result<Fields> {
        (self.func)(fields)
    }
}

/// Registry of available steps, keyed by step name.
pub struct StepRegistry {
    steps: HashMap<String, Arc<dyn Step>>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self {
            steps: HashMap::new(),
        }
    }

    /// Register a step. A step with the same name is replaced.
    pub fn register(&mut self, step: impl Step) {
        let name = step.name().to_string();
        self.steps.insert(name, Arc::new(step));
    }

    /// Register a closure as a step.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, func: F)
    where
        F: Fn(&Fields) -> Result<Fields> + Send + Sync + 'static,
    {
        self.register(FnStep::new(name, func));
    }

    /// Get a step by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Step>> {
        self.steps.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.steps.contains_key(name)
    }

    /// List all registered step names, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.steps.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Invoke a step by name.
    pub fn invoke(&self, name: &str, fields: &Fields) -> Result<Fields> {
        let step = self
            .get(name)
            .ok_or_else(|| LoopgraphError::StepInput(format!("unknown step '{}'", name)))?;

        debug!(step = name, "Invoking step");
        step.invoke(fields)
    }

    /// Create a registry with all built-in steps registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        // ── Summarization pipeline ──────────────────────────────
        registry.register(crate::builtin::summarize::SplitText);
        registry.register(crate::builtin::summarize::GenerateSummaries);
        registry.register(crate::builtin::summarize::MergeSummaries);
        registry.register(crate::builtin::summarize::RefineSummary);

        registry
    }
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}
