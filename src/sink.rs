// SPDX-License-Identifier: Apache-2.0

//! Bounded, tab-delimited rendering of a joined table.
//!
//! The sink takes the first `max_rows` rows (or all rows if fewer exist) and
//! renders each as one line: field values in projected column order, joined
//! by a single tab. Zero rows yields an empty sequence, not an error.

use std::io::{self, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{Table, Value};

/// Renders one value for output. Nulls render empty, binary as base64,
/// structured values as their JSON text.
fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Bytes(b) => STANDARD.encode(b),
        Value::Json(j) => j.to_string(),
        Value::Array(arr) => serde_json::to_string(arr).unwrap_or_else(|_| "[]".to_string()),
    }
}

/// Lazy, finite, non-restartable sequence of rendered lines over the first
/// `min(max_rows, row_count)` rows of `table`, in the table's row order.
pub fn render_lines(table: &Table, max_rows: usize) -> impl Iterator<Item = String> + '_ {
    table.rows.iter().take(max_rows).map(|row| {
        row.values
            .iter()
            .map(format_value)
            .collect::<Vec<_>>()
            .join("\t")
    })
}

/// Writes the rendered lines to `out`, one per row with a trailing newline
/// each, and returns the number of rows emitted.
pub fn emit<W: Write>(table: &Table, max_rows: usize, out: &mut W) -> EngineResult<u64> {
    let mut emitted = 0u64;
    for line in render_lines(table, max_rows) {
        writeln!(out, "{line}").map_err(io_error)?;
        emitted += 1;
    }
    out.flush().map_err(io_error)?;
    Ok(emitted)
}

fn io_error(err: io::Error) -> EngineError {
    EngineError::internal(format!("failed to write result row: {err}"))
}
