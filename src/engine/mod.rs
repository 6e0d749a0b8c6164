// Engine Module
// Universal abstraction layer over the warehouse and relational backends

pub mod context;
pub mod error;
pub mod registry;
pub mod traits;
pub mod types;

pub use context::{ContextConfig, ExecutionContext};
pub use error::EngineError;
pub use registry::SourceRegistry;
pub use traits::SourceEngine;
pub use types::*;
