//! Universal data types for the joinpipe engine
//!
//! These types provide a normalized, read-once-materialized representation
//! of tabular data across the warehouse and relational backends.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observability::Sensitive;

/// Unique identifier for a live source session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Which backend family a source belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Catalog-registered table in the embedded analytical store
    Warehouse,
    /// Row-oriented table behind a network connection string
    Relational,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Warehouse => "warehouse",
            Self::Relational => "relational",
        }
    }
}

/// Credentials for a network-reachable backend.
///
/// The password is held behind [`Sensitive`] so it never appears in logs,
/// Debug output, or serialized form. Callers that need the raw value use
/// `password.expose()` at the single point where the connection string is
/// assembled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: Sensitive<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Sensitive::new(password.into()),
        }
    }
}

/// Where a source lives and how to reach it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceLocation {
    /// File path of the warehouse catalog (`:memory:` supported)
    Catalog { path: String },
    /// Connection URI plus credentials for the relational backend
    Remote {
        uri: String,
        credentials: Credentials,
    },
}

/// Configuration identifying one backend table. Immutable once constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub location: SourceLocation,
    /// Table name; for the warehouse this may be qualified as `schema.table`
    pub table: String,
}

impl SourceDescriptor {
    pub fn kind(&self) -> SourceKind {
        match self.location {
            SourceLocation::Catalog { .. } => SourceKind::Warehouse,
            SourceLocation::Remote { .. } => SourceKind::Relational,
        }
    }
}

/// Universal value representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(#[serde(with = "base64_bytes")] Vec<u8>),
    Json(serde_json::Value),
    Array(Vec<Value>),
}

impl Value {
    /// Coarse kind name, used for key-type compatibility checks.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Json(_) => "json",
            Self::Array(_) => "array",
        }
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

/// Column metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
        }
    }
}

/// A single row of data (indexed by column order)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
}

/// Materialized tabular result: an ordered set of named columns and an
/// unordered multiset of rows. Shape and row count are fixed once built;
/// the join stage never observes a partial read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// Index of a column by name, if present.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// The join key, projected output columns, and the result row cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Key column name, required on both sides
    pub key: String,
    /// Output column names in the requested order; colliding non-key names
    /// are addressed qualified as `left.<name>` / `right.<name>`
    pub output_columns: Vec<String>,
    /// Maximum number of result rows emitted by the sink
    pub max_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_kind_follows_location() {
        let warehouse = SourceDescriptor {
            location: SourceLocation::Catalog {
                path: ":memory:".to_string(),
            },
            table: "db_hive.emp".to_string(),
        };
        assert_eq!(warehouse.kind(), SourceKind::Warehouse);

        let relational = SourceDescriptor {
            location: SourceLocation::Remote {
                uri: "mysql://bigdata:3306/test".to_string(),
                credentials: Credentials::new("root", "secret"),
            },
            table: "tb_dept".to_string(),
        };
        assert_eq!(relational.kind(), SourceKind::Relational);
    }

    #[test]
    fn credentials_never_serialize_password() {
        let creds = Credentials::new("root", "secret");
        let json = serde_json::to_string(&creds).unwrap();
        assert!(!json.contains("secret"));
        assert!(format!("{creds:?}").contains("[REDACTED]"));
    }

    #[test]
    fn table_column_lookup() {
        let table = Table::new(
            vec![ColumnInfo::new("empno", "BIGINT"), ColumnInfo::new("sal", "BIGINT")],
            vec![],
        );
        assert_eq!(table.column_index("sal"), Some(1));
        assert_eq!(table.column_index("dname"), None);
    }

    #[test]
    fn bytes_round_trip_as_base64() {
        let v = Value::Bytes(vec![1, 2, 3]);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"AQID\"");
    }
}
