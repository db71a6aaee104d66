//! Graph compilation: declaration in, validated immutable graph out.

pub mod compiled;
pub mod validate;

pub use compiled::{CompareOp, CompiledGraph, LoopTransition, Predicate, Transition};
pub use validate::validate;
