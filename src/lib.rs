//! Load a table, narrow it down with chained filter expressions, export the result.

pub mod data;
pub mod engine;
pub mod error;

pub use data::filter::{FilterChain, FilterExpression};
pub use data::format::Format;
pub use data::model::{TabularDataset, Value};
pub use engine::{EngineConfig, EngineState, FilterEngine, ReloadPolicy};
pub use error::{CodecError, EngineError, FilterError, SchemaError};
