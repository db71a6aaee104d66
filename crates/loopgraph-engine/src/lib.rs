//! Workflow graph engine.
//!
//! A `GraphDefinition` is validated into an immutable `CompiledGraph`, stored
//! in a `GraphRegistry`, and interpreted node by node by the `Executor`. Each
//! step's output is folded into the run's fields by the `MergePolicy`, one
//! log entry is appended per executed node, and every intermediate state is
//! written to the `CheckpointStore` under the run id.

pub mod checkpoint;
pub mod engine;
pub mod executor;
pub mod graph;
pub mod merge;
pub mod registry;

pub use checkpoint::{Checkpoint, CheckpointStore, RunStatus};
pub use engine::{RunOutcome, WorkflowEngine};
pub use executor::Executor;
pub use graph::{validate, CompareOp, CompiledGraph, LoopTransition, Predicate, Transition};
pub use merge::MergePolicy;
pub use registry::GraphRegistry;
