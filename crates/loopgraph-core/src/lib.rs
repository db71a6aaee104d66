pub mod config;
pub mod definition;
pub mod error;
pub mod traits;
pub mod types;
pub mod value;

pub use config::AppConfig;
pub use definition::{ConditionDef, GraphDefinition, LoopDef, MergeRule, NodeDef};
pub use error::{LoopgraphError, Result};
pub use traits::Step;
pub use types::*;
pub use value::{Fields, Value};
