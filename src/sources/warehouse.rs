// SPDX-License-Identifier: Apache-2.0

//! Warehouse source
//!
//! Reads catalog-registered tables from the embedded analytical store
//! (DuckDB). The table is resolved by a metadata lookup against
//! `information_schema` under a fully qualified `schema.table` name, not a
//! connection string.
//!
//! ## Concurrency Model
//!
//! The `duckdb` crate provides a synchronous API. All operations are wrapped
//! in `tokio::task::spawn_blocking`. The `Connection` is `Send` but `!Sync`,
//! so it is protected by a `std::sync::Mutex`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use duckdb::Connection;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::SourceEngine;
use crate::engine::types::{
    ColumnInfo, Row, SessionId, SourceDescriptor, SourceLocation, Table, Value,
};

/// Holds the connection state for one warehouse session.
struct WarehouseSession {
    /// The DuckDB connection, protected by a std Mutex (Connection is !Sync).
    conn: std::sync::Mutex<Connection>,
}

/// Warehouse engine implementation over the embedded analytical store.
pub struct WarehouseEngine {
    sessions: Arc<RwLock<HashMap<SessionId, Arc<WarehouseSession>>>>,
}

impl WarehouseEngine {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn get_session(&self, session: SessionId) -> EngineResult<Arc<WarehouseSession>> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session)
            .cloned()
            .ok_or_else(|| EngineError::session_not_found(session.0.to_string()))
    }

    fn quote_ident(name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    /// Validates the catalog file path.
    fn validate_path(path: &str) -> EngineResult<()> {
        let path = path.trim();

        if path == ":memory:" {
            return Ok(());
        }

        if path.is_empty() {
            return Err(EngineError::connection_failed(
                "warehouse catalog path cannot be empty",
            ));
        }

        if path.contains("://") {
            return Err(EngineError::connection_failed(format!(
                "invalid warehouse catalog path: '{path}' (expected a file path, not a URI)"
            )));
        }

        Ok(())
    }

    fn open_connection(path: &str) -> EngineResult<Connection> {
        let path = path.trim();

        if path == ":memory:" {
            Connection::open_in_memory().map_err(|e| {
                EngineError::connection_failed(format!("failed to open in-memory catalog: {e}"))
            })
        } else {
            Connection::open(path).map_err(|e| {
                EngineError::connection_failed(format!(
                    "failed to open warehouse catalog '{path}': {e}"
                ))
            })
        }
    }

    /// Splits a fully qualified table name into (schema, table). Unqualified
    /// names resolve against the default `main` schema.
    fn split_qualified(table: &str) -> (&str, &str) {
        match table.split_once('.') {
            Some((schema, name)) => (schema, name),
            None => ("main", table),
        }
    }

    /// Runs a synchronous closure on the session's connection inside spawn_blocking.
    async fn with_conn<F, R>(session: &Arc<WarehouseSession>, f: F) -> EngineResult<R>
    where
        F: FnOnce(&Connection) -> EngineResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let session = Arc::clone(session);
        tokio::task::spawn_blocking(move || {
            let conn = session.conn.lock().map_err(|e| {
                EngineError::internal(format!("failed to lock catalog connection: {e}"))
            })?;
            f(&conn)
        })
        .await
        .map_err(|e| EngineError::internal(format!("warehouse task panicked: {e}")))?
    }

    /// Resolves the table in the metadata catalog; returns its column
    /// metadata in ordinal order or `SourceNotFound`.
    fn resolve_columns(conn: &Connection, schema: &str, name: &str) -> EngineResult<Vec<ColumnInfo>> {
        let mut stmt = conn
            .prepare(
                "SELECT column_name, data_type, is_nullable \
                 FROM information_schema.columns \
                 WHERE table_schema = ? AND table_name = ? \
                 ORDER BY ordinal_position",
            )
            .map_err(|e| EngineError::internal(format!("catalog lookup failed: {e}")))?;

        let rows = stmt
            .query_map([schema, name], |row| {
                let column: String = row.get(0)?;
                let data_type: String = row.get(1)?;
                let nullable: String = row.get(2)?;
                Ok(ColumnInfo {
                    name: column,
                    data_type,
                    nullable: nullable.eq_ignore_ascii_case("yes"),
                })
            })
            .map_err(|e| EngineError::internal(format!("catalog lookup failed: {e}")))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(
                row.map_err(|e| EngineError::internal(format!("catalog lookup failed: {e}")))?,
            );
        }

        if columns.is_empty() {
            return Err(EngineError::source_not_found(format!("{schema}.{name}")));
        }

        Ok(columns)
    }
}

impl Default for WarehouseEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Extracts a value from a DuckDB row and converts it to a universal Value.
fn extract_value(row: &duckdb::Row<'_>, idx: usize) -> Value {
    // Try types in order of likelihood
    if let Ok(v) = row.get::<_, Option<i64>>(idx) {
        return match v {
            Some(i) => Value::Int(i),
            None => Value::Null,
        };
    }
    if let Ok(v) = row.get::<_, Option<f64>>(idx) {
        return match v {
            Some(f) => Value::Float(f),
            None => Value::Null,
        };
    }
    if let Ok(v) = row.get::<_, Option<bool>>(idx) {
        return match v {
            Some(b) => Value::Bool(b),
            None => Value::Null,
        };
    }
    if let Ok(v) = row.get::<_, Option<String>>(idx) {
        return match v {
            Some(s) => Value::Text(s),
            None => Value::Null,
        };
    }
    if let Ok(v) = row.get::<_, Option<Vec<u8>>>(idx) {
        return match v {
            Some(b) => Value::Bytes(b),
            None => Value::Null,
        };
    }
    Value::Null
}

#[async_trait]
impl SourceEngine for WarehouseEngine {
    fn source_id(&self) -> &'static str {
        "warehouse"
    }

    fn source_name(&self) -> &'static str {
        "Warehouse Catalog"
    }

    #[instrument(skip(self, descriptor), fields(table = %descriptor.table))]
    async fn connect(&self, descriptor: &SourceDescriptor) -> EngineResult<SessionId> {
        let SourceLocation::Catalog { ref path } = descriptor.location else {
            return Err(EngineError::invalid_config(
                "warehouse source requires a catalog location",
            ));
        };

        Self::validate_path(path)?;

        let path = path.clone();
        let conn = tokio::task::spawn_blocking(move || Self::open_connection(&path))
            .await
            .map_err(|e| EngineError::internal(format!("warehouse task panicked: {e}")))??;

        let session_id = SessionId::new();
        let session = Arc::new(WarehouseSession {
            conn: std::sync::Mutex::new(conn),
        });

        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, session);

        Ok(session_id)
    }

    #[instrument(skip(self), fields(session_id = %session.0))]
    async fn disconnect(&self, session: SessionId) -> EngineResult<()> {
        let mut sessions = self.sessions.write().await;

        if sessions.remove(&session).is_some() {
            // Dropping the Connection closes the catalog handle.
            Ok(())
        } else {
            Err(EngineError::session_not_found(session.0.to_string()))
        }
    }

    #[instrument(skip(self), fields(session_id = %session.0, table = %table))]
    async fn read_table(&self, session: SessionId, table: &str) -> EngineResult<Table> {
        let session = self.get_session(session).await?;
        let table = table.to_string();

        Self::with_conn(&session, move |conn| {
            let (schema, name) = Self::split_qualified(&table);
            let columns = Self::resolve_columns(conn, schema, name)?;

            let sql = format!(
                "SELECT * FROM {}.{}",
                Self::quote_ident(schema),
                Self::quote_ident(name)
            );

            let mut stmt = conn.prepare(&sql).map_err(|e| {
                EngineError::schema_error(format!("failed to read table '{table}': {e}"))
            })?;

            let column_count = columns.len();
            let rows_iter = stmt
                .query_map([], |row| {
                    let values: Vec<Value> =
                        (0..column_count).map(|i| extract_value(row, i)).collect();
                    Ok(Row { values })
                })
                .map_err(|e| {
                    EngineError::schema_error(format!("failed to read table '{table}': {e}"))
                })?;

            let mut rows = Vec::new();
            for row in rows_iter {
                rows.push(row.map_err(|e| {
                    EngineError::schema_error(format!("row fetch failed for '{table}': {e}"))
                })?);
            }

            Ok(Table::new(columns, rows))
        })
        .await
    }
}
