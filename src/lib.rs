// joinpipe - Cross-backend join-and-project pipeline
// Core library

pub mod config;
pub mod engine;
pub mod join;
pub mod observability;
pub mod pipeline;
pub mod sink;
pub mod sources;

pub use config::HostConfig;
pub use engine::{ContextConfig, EngineError, ExecutionContext};
pub use pipeline::{PipelineOptions, PipelineReport, PipelineSpec};
