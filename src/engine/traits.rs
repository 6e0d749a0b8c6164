//! SourceEngine trait definition
//!
//! This is the core abstraction both backend readers implement. It provides
//! a unified interface for connecting, reading a full table, and releasing
//! sessions across the warehouse and relational backends.

use async_trait::async_trait;

use crate::engine::error::EngineResult;
use crate::engine::types::{SessionId, SourceDescriptor, Table};

/// Core trait that all source backends must implement
///
/// Each backend (warehouse catalog, relational database) implements this
/// trait to expose the same connect / read / disconnect lifecycle. Reads are
/// read-only against the source and independently cancellable: dropping the
/// future of an in-flight `read_table` abandons the read.
#[async_trait]
pub trait SourceEngine: Send + Sync {
    /// Returns the unique identifier for this backend (e.g., "warehouse", "relational")
    fn source_id(&self) -> &'static str;

    /// Returns a human-readable name for this backend
    fn source_name(&self) -> &'static str;

    /// Establishes a connection and returns a session identifier
    ///
    /// The session ID is used for all subsequent operations on this source.
    async fn connect(&self, descriptor: &SourceDescriptor) -> EngineResult<SessionId>;

    /// Closes a session and releases associated resources
    async fn disconnect(&self, session: SessionId) -> EngineResult<()>;

    /// Reads the named table in full into a [`Table`]
    ///
    /// Fails with `SourceNotFound` if the table is unknown to the backend,
    /// `SchemaError` if the underlying storage cannot be read into the
    /// universal value model.
    async fn read_table(&self, session: SessionId, table: &str) -> EngineResult<Table>;
}
