// SPDX-License-Identifier: Apache-2.0

//! Equi-join and projection over two materialized tables.
//!
//! The join is a hash join on a single key column: build a map of right-side
//! rows keyed by their key value, then probe it with each left-side row.
//! Matching is by value equality with no implicit coercion — an `Int(1)` key
//! never matches a `Float(1.0)` key. Null and non-scalar key values never
//! match anything, following standard equi-join semantics. Duplicate key
//! values yield the full cross product within the matching group.
//!
//! Output order is deterministic per run: left row order, then right row
//! order within each key group.

use std::collections::HashMap;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{ColumnInfo, JoinSpec, Row, Table, Value};

/// Which input table a combined-schema column came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Hashable form of a scalar key value. Floats hash by bit pattern, which
/// keeps NaN keys self-consistent within a run.
#[derive(Debug, PartialEq, Eq, Hash)]
enum JoinKey {
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
    Bytes(Vec<u8>),
}

fn join_key(value: &Value) -> Option<JoinKey> {
    match value {
        Value::Bool(b) => Some(JoinKey::Bool(*b)),
        Value::Int(i) => Some(JoinKey::Int(*i)),
        Value::Float(f) => Some(JoinKey::Float(f.to_bits())),
        Value::Text(s) => Some(JoinKey::Text(s.clone())),
        Value::Bytes(b) => Some(JoinKey::Bytes(b.clone())),
        // Null keys never match; neither do non-scalar values.
        Value::Null | Value::Json(_) | Value::Array(_) => None,
    }
}

/// Computes the equi-join of `left` and `right` on `spec.key`, then projects
/// exactly `spec.output_columns` in the order listed.
///
/// Fails with `KeyNotFound` if the key column is absent from either side,
/// `SchemaError` if the observed key value kinds are incompatible, and
/// `ColumnNotFound` if a requested output column does not exist in the
/// combined schema. All precondition checks run before any row is joined,
/// so no partial table is ever produced.
pub fn join(left: &Table, right: &Table, spec: &JoinSpec) -> EngineResult<Table> {
    let left_key = left
        .column_index(&spec.key)
        .ok_or_else(|| EngineError::key_not_found(&spec.key, Side::Left.as_str()))?;
    let right_key = right
        .column_index(&spec.key)
        .ok_or_else(|| EngineError::key_not_found(&spec.key, Side::Right.as_str()))?;

    check_key_compatibility(left, left_key, right, right_key, &spec.key)?;

    let combined = combined_schema(left, left_key, right, right_key);
    let projection = resolve_projection(&combined, &spec.output_columns)?;

    // Build phase: right rows grouped by key value.
    let mut groups: HashMap<JoinKey, Vec<usize>> = HashMap::new();
    for (idx, row) in right.rows.iter().enumerate() {
        if let Some(key) = row.values.get(right_key).and_then(join_key) {
            groups.entry(key).or_default().push(idx);
        }
    }

    // Probe phase: left row order, right order within each group.
    let mut rows = Vec::new();
    for left_row in &left.rows {
        let Some(key) = left_row.values.get(left_key).and_then(join_key) else {
            continue;
        };
        let Some(matches) = groups.get(&key) else {
            continue;
        };
        for &right_idx in matches {
            let right_row = &right.rows[right_idx];
            let values = projection
                .iter()
                .map(|col| {
                    let row = match col.side {
                        Side::Left => left_row,
                        Side::Right => right_row,
                    };
                    row.values.get(col.index).cloned().unwrap_or(Value::Null)
                })
                .collect();
            rows.push(Row { values });
        }
    }

    let columns = projection
        .into_iter()
        .map(|col| ColumnInfo {
            name: col.output_name,
            data_type: col.data_type,
            nullable: true,
        })
        .collect();

    Ok(Table::new(columns, rows))
}

/// One column of the combined (post-join, pre-projection) schema
struct CombinedColumn {
    exposed_name: String,
    side: Side,
    index: usize,
    data_type: String,
}

/// A resolved output column
struct ProjectedColumn {
    output_name: String,
    side: Side,
    index: usize,
    data_type: String,
}

/// The combined schema is the key column once (left copy), then left
/// non-key columns, then right non-key columns. A non-key name present on
/// both sides is exposed qualified as `left.<name>` / `right.<name>`.
fn combined_schema(
    left: &Table,
    left_key: usize,
    right: &Table,
    right_key: usize,
) -> Vec<CombinedColumn> {
    let collides = |name: &str| {
        left.columns
            .iter()
            .enumerate()
            .any(|(i, c)| i != left_key && c.name == name)
            && right
                .columns
                .iter()
                .enumerate()
                .any(|(i, c)| i != right_key && c.name == name)
    };

    let mut combined = Vec::with_capacity(left.columns.len() + right.columns.len() - 1);

    combined.push(CombinedColumn {
        exposed_name: left.columns[left_key].name.clone(),
        side: Side::Left,
        index: left_key,
        data_type: left.columns[left_key].data_type.clone(),
    });

    for (side, key_idx, table) in [(Side::Left, left_key, left), (Side::Right, right_key, right)] {
        for (idx, col) in table.columns.iter().enumerate() {
            if idx == key_idx {
                continue;
            }
            let exposed_name = if collides(&col.name) {
                format!("{}.{}", side.as_str(), col.name)
            } else {
                col.name.clone()
            };
            combined.push(CombinedColumn {
                exposed_name,
                side,
                index: idx,
                data_type: col.data_type.clone(),
            });
        }
    }

    combined
}

fn resolve_projection(
    combined: &[CombinedColumn],
    output_columns: &[String],
) -> EngineResult<Vec<ProjectedColumn>> {
    output_columns
        .iter()
        .map(|name| {
            combined
                .iter()
                .find(|col| col.exposed_name == *name)
                .map(|col| ProjectedColumn {
                    output_name: name.clone(),
                    side: col.side,
                    index: col.index,
                    data_type: col.data_type.clone(),
                })
                .ok_or_else(|| EngineError::column_not_found(name))
        })
        .collect()
}

/// Rejects key columns whose observed value kinds differ. The check is by
/// the first non-null value on each side; a side with no non-null keys
/// imposes no constraint (the join of such a side is empty anyway).
fn check_key_compatibility(
    left: &Table,
    left_key: usize,
    right: &Table,
    right_key: usize,
    key: &str,
) -> EngineResult<()> {
    let kind_of = |table: &Table, idx: usize| {
        table
            .rows
            .iter()
            .filter_map(|row| row.values.get(idx))
            .find(|v| !matches!(v, Value::Null))
            .map(Value::kind)
    };

    if let (Some(left_kind), Some(right_kind)) =
        (kind_of(left, left_key), kind_of(right, right_key))
    {
        if left_kind != right_kind {
            return Err(EngineError::schema_error(format!(
                "key column '{key}' has incompatible types: {left_kind} on left, {right_kind} on right"
            )));
        }
    }

    Ok(())
}
