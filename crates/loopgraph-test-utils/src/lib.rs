//! Shared fixtures for loopgraph tests: deterministic steps and canned
//! graph definitions.

use loopgraph_core::definition::GraphDefinition;
use loopgraph_core::error::LoopgraphError;
use loopgraph_core::value::{Fields, Value};
use loopgraph_steps::StepRegistry;

/// Build a field map from a JSON object literal.
///
/// Panics if `json` is not an object.
pub fn fields(json: serde_json::Value) -> Fields {
    match Value::from(json) {
        Value::Map(map) => map,
        other => panic!("fields() expects a JSON object, got {}", other.kind()),
    }
}

/// Built-in steps plus the synthetic steps below.
///
/// - `countdown`: `counter = counter - 1` (missing counter reads as 0).
/// - `hold_zero`: `counter = 0`, every time.
/// - `noop`: returns an empty update.
/// - `always_fail`: errors with "synthetic failure".
/// - `stamp`: `stamp = "<visits>"` and `visits = visits + 1`.
pub fn test_registry() -> StepRegistry {
    let mut registry = StepRegistry::with_builtins();

    registry.register_fn("countdown", |f: &Fields| {
        let counter = f.get("counter").and_then(Value::as_integer).unwrap_or(0);
        let mut update = Fields::new();
        update.insert("counter".into(), Value::Integer(counter - 1));
        Ok(update)
    });

    registry.register_fn("hold_zero", |_: &Fields| {
        let mut update = Fields::new();
        update.insert("counter".into(), Value::Integer(0));
        Ok(update)
    });

    registry.register_fn("noop", |_: &Fields| Ok(Fields::new()));

    registry.register_fn("always_fail", |_: &Fields| {
        Err(LoopgraphError::StepInput("synthetic failure".into()))
    });

    registry.register_fn("stamp", |f: &Fields| {
        let visits = f.get("visits").and_then(Value::as_integer).unwrap_or(0);
        let mut update = Fields::new();
        update.insert("stamp".into(), Value::Text(visits.to_string()));
        update.insert("visits".into(), Value::Integer(visits + 1));
        Ok(update)
    });

    registry
}

/// `split -> summarize -> merge -> refine`, no loops.
pub fn summarize_definition() -> GraphDefinition {
    GraphDefinition::new("split")
        .with_node("split", "split_text")
        .with_node("summarize", "generate_summaries")
        .with_node("merge", "merge_summaries")
        .with_node("refine", "refine_summary")
        .with_edge("split", "summarize")
        .with_edge("summarize", "merge")
        .with_edge("merge", "refine")
}

/// The summarize pipeline, refining until `length` is at most `max_len`.
pub fn refine_until_definition(max_len: i64) -> GraphDefinition {
    summarize_definition().with_loop("refine", "length", "gt", max_len, "refine")
}

/// A single `tick` node running `countdown`, looping back while
/// `counter gt 0`.
pub fn countdown_definition() -> GraphDefinition {
    GraphDefinition::new("tick")
        .with_node("tick", "countdown")
        .with_loop("tick", "counter", "gt", 0i64, "tick")
}

/// A loop whose condition never turns false: `counter` is pinned at 0 and
/// the loop runs while `counter gt -1`.
pub fn runaway_definition() -> GraphDefinition {
    GraphDefinition::new("spin")
        .with_node("spin", "hold_zero")
        .with_loop("spin", "counter", "gt", -1i64, "spin")
}
