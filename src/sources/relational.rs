// SPDX-License-Identifier: Apache-2.0

//! Relational source
//!
//! Reads full tables from the row-oriented relational backend (MySQL /
//! MariaDB) over a network connection using SQLx. The backend is identified
//! by a connection URI; credentials arrive as an opaque [`Credentials`]
//! object and are only exposed at the single point where the connection
//! string is assembled.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::mysql::{MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, Row as SqlxRow, TypeInfo};
use tokio::sync::RwLock;
use tracing::instrument;
use url::Url;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::traits::SourceEngine;
use crate::engine::types::{
    ColumnInfo, Credentials, Row, SessionId, SourceDescriptor, SourceLocation, Table, Value,
};

/// Relational engine implementation
pub struct RelationalEngine {
    sessions: Arc<RwLock<HashMap<SessionId, MySqlPool>>>,
}

impl RelationalEngine {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Builds the connection string from the URI and the opaque credentials.
    /// `Url` percent-encodes the username and password, so credentials with
    /// reserved characters survive the round trip.
    fn build_connection_string(uri: &str, credentials: &Credentials) -> EngineResult<String> {
        let mut url = Url::parse(uri)
            .map_err(|e| EngineError::invalid_config(format!("invalid relational URI: {e}")))?;

        if url.scheme() != "mysql" {
            return Err(EngineError::invalid_config(format!(
                "unsupported relational scheme '{}', expected 'mysql'",
                url.scheme()
            )));
        }

        url.set_username(&credentials.username)
            .map_err(|_| EngineError::invalid_config("relational URI cannot carry a username"))?;
        url.set_password(Some(credentials.password.expose().as_str()))
            .map_err(|_| EngineError::invalid_config("relational URI cannot carry a password"))?;

        Ok(url.into())
    }

    fn quote_ident(name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    async fn get_pool(&self, session: SessionId) -> EngineResult<MySqlPool> {
        let sessions = self.sessions.read().await;
        sessions
            .get(&session)
            .cloned()
            .ok_or_else(|| EngineError::session_not_found(session.0.to_string()))
    }

    /// Converts a SQLx row to our universal Row type
    fn convert_row(mysql_row: &MySqlRow) -> Row {
        let values: Vec<Value> = mysql_row
            .columns()
            .iter()
            .map(|col| Self::extract_value(mysql_row, col.ordinal()))
            .collect();

        Row { values }
    }

    /// Extracts a value from a MySqlRow at the given index
    fn extract_value(row: &MySqlRow, idx: usize) -> Value {
        // Try u64 first for BIGINT UNSIGNED columns
        if let Ok(v) = row.try_get::<Option<u64>, _>(idx) {
            return v.map(|u| Value::Int(u as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(idx) {
            return v.map(Value::Int).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(idx) {
            return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<u32>, _>(idx) {
            return v.map(|u| Value::Int(u as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(idx) {
            return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<u16>, _>(idx) {
            return v.map(|u| Value::Int(u as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i8>, _>(idx) {
            return v.map(|i| Value::Int(i as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<u8>, _>(idx) {
            return v.map(|u| Value::Int(u as i64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<bool>, _>(idx) {
            return v.map(Value::Bool).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(idx) {
            return v.map(Value::Float).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(idx) {
            return v.map(|f| Value::Float(f as f64)).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<String>, _>(idx) {
            return v.map(Value::Text).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx) {
            return v
                .map(|dt| Value::Text(dt.to_rfc3339()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(idx) {
            return v
                .map(|dt| Value::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(idx) {
            return v
                .map(|d| Value::Text(d.format("%Y-%m-%d").to_string()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(idx) {
            return v.map(Value::Bytes).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(idx) {
            return v.map(Value::Json).unwrap_or(Value::Null);
        }

        Value::Null
    }

    /// Gets column info from a MySqlRow
    fn get_column_info(row: &MySqlRow) -> Vec<ColumnInfo> {
        row.columns()
            .iter()
            .map(|col| ColumnInfo {
                name: col.name().to_string(),
                data_type: col.type_info().name().to_string(),
                nullable: true,
            })
            .collect()
    }
}

impl Default for RelationalEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceEngine for RelationalEngine {
    fn source_id(&self) -> &'static str {
        "relational"
    }

    fn source_name(&self) -> &'static str {
        "Relational (MySQL / MariaDB)"
    }

    #[instrument(skip(self, descriptor), fields(table = %descriptor.table))]
    async fn connect(&self, descriptor: &SourceDescriptor) -> EngineResult<SessionId> {
        let SourceLocation::Remote {
            ref uri,
            ref credentials,
        } = descriptor.location
        else {
            return Err(EngineError::invalid_config(
                "relational source requires a remote location",
            ));
        };

        let conn_str = Self::build_connection_string(uri, credentials)?;

        let pool = MySqlPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(std::time::Duration::from_secs(10))
            .connect(&conn_str)
            .await
            .map_err(|e| {
                let msg = e.to_string();
                if msg.contains("Access denied") {
                    EngineError::auth_failed(msg)
                } else {
                    EngineError::connection_failed(msg)
                }
            })?;

        let session_id = SessionId::new();

        let mut sessions = self.sessions.write().await;
        sessions.insert(session_id, pool);

        Ok(session_id)
    }

    #[instrument(skip(self), fields(session_id = %session.0))]
    async fn disconnect(&self, session: SessionId) -> EngineResult<()> {
        let mut sessions = self.sessions.write().await;

        if let Some(pool) = sessions.remove(&session) {
            pool.close().await;
            Ok(())
        } else {
            Err(EngineError::session_not_found(session.0.to_string()))
        }
    }

    #[instrument(skip(self), fields(session_id = %session.0, table = %table))]
    async fn read_table(&self, session: SessionId, table: &str) -> EngineResult<Table> {
        let pool = self.get_pool(session).await?;

        // Resolve the table against the connected database before pulling it.
        let (exists,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            "#,
        )
        .bind(table)
        .fetch_one(&pool)
        .await
        .map_err(|e| EngineError::connection_failed(e.to_string()))?;

        if exists == 0 {
            return Err(EngineError::source_not_found(table));
        }

        let sql = format!("SELECT * FROM {}", Self::quote_ident(table));
        let mysql_rows = sqlx::query(&sql)
            .fetch_all(&pool)
            .await
            .map_err(|e| EngineError::schema_error(format!("failed to read table '{table}': {e}")))?;

        let columns = mysql_rows
            .first()
            .map(Self::get_column_info)
            .unwrap_or_default();

        let rows = mysql_rows.iter().map(Self::convert_row).collect();

        // An existing but empty table still needs its column shape.
        if columns.is_empty() {
            let described: Vec<(String, String)> = sqlx::query_as(
                r#"
                SELECT CAST(COLUMN_NAME AS CHAR), CAST(DATA_TYPE AS CHAR)
                FROM information_schema.COLUMNS
                WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
                ORDER BY ORDINAL_POSITION
                "#,
            )
            .bind(table)
            .fetch_all(&pool)
            .await
            .map_err(|e| EngineError::schema_error(e.to_string()))?;

            let columns = described
                .into_iter()
                .map(|(name, data_type)| ColumnInfo {
                    name,
                    data_type,
                    nullable: true,
                })
                .collect();

            return Ok(Table::new(columns, rows));
        }

        Ok(Table::new(columns, rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_string_carries_encoded_credentials() {
        let creds = Credentials::new("ro ot", "p@ss:word");
        let conn = RelationalEngine::build_connection_string("mysql://bigdata:3306/test", &creds)
            .expect("connection string");

        assert!(conn.starts_with("mysql://"));
        assert!(conn.contains("ro%20ot"));
        assert!(conn.contains("p%40ss%3Aword") || conn.contains("p%40ss:word"));
        assert!(conn.contains("bigdata:3306/test"));
    }

    #[test]
    fn rejects_non_mysql_schemes() {
        let creds = Credentials::new("root", "pw");
        let result =
            RelationalEngine::build_connection_string("postgres://host:5432/db", &creds);
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn rejects_unparsable_uris() {
        let creds = Credentials::new("root", "pw");
        let result = RelationalEngine::build_connection_string("not a uri", &creds);
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn connect_requires_remote_location() {
        let engine = RelationalEngine::new();
        let descriptor = SourceDescriptor {
            location: SourceLocation::Catalog {
                path: ":memory:".to_string(),
            },
            table: "tb_dept".to_string(),
        };

        let result = engine.connect(&descriptor).await;
        assert!(matches!(result, Err(EngineError::InvalidConfig { .. })));
    }

    #[test]
    fn identifiers_are_backtick_quoted() {
        assert_eq!(RelationalEngine::quote_ident("tb_dept"), "`tb_dept`");
        assert_eq!(RelationalEngine::quote_ident("we`ird"), "`we``ird`");
    }
}
