// SPDX-License-Identifier: Apache-2.0

//! Normalized error types for the joinpipe engine
//!
//! All backend-specific errors are mapped to these unified error types
//! so every stage of the pipeline fails with a distinguishable kind.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all engine operations
#[derive(Debug, Error, Serialize, Deserialize)]
pub enum EngineError {
    #[error("Connection failed: {message}")]
    ConnectionFailed { message: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Source not found: {source_name}")]
    SourceNotFound { source_name: String },

    #[error("Schema error: {message}")]
    SchemaError { message: String },

    #[error("Join key column '{column}' not found on {side} side")]
    KeyNotFound { column: String, side: String },

    #[error("Output column not found: {column}")]
    ColumnNotFound { column: String },

    #[error("Operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Session not found or expired: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("No source engine registered for: {source_id}")]
    SourceKindUnknown { source_id: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl EngineError {
    pub fn connection_failed(msg: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: msg.into() }
    }

    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: msg.into() }
    }

    pub fn source_not_found(source: impl Into<String>) -> Self {
        Self::SourceNotFound { source_name: source.into() }
    }

    pub fn schema_error(msg: impl Into<String>) -> Self {
        Self::SchemaError { message: msg.into() }
    }

    pub fn key_not_found(column: impl Into<String>, side: impl Into<String>) -> Self {
        Self::KeyNotFound {
            column: column.into(),
            side: side.into(),
        }
    }

    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound { column: column.into() }
    }

    pub fn session_not_found(id: impl Into<String>) -> Self {
        Self::SessionNotFound { session_id: id.into() }
    }

    pub fn source_kind_unknown(id: impl Into<String>) -> Self {
        Self::SourceKindUnknown { source_id: id.into() }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig { message: msg.into() }
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal { message: msg.into() }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
