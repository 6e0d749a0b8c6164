// SPDX-License-Identifier: Apache-2.0

//! Types for the join-and-project pipeline.

use serde::{Deserialize, Serialize};

use crate::engine::context::ContextConfig;
use crate::engine::types::{JoinSpec, SourceDescriptor};

/// Everything one pipeline run needs: the two sources and the join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSpec {
    /// Catalog-registered warehouse table
    pub warehouse: SourceDescriptor,
    /// Network-reachable relational table
    pub relational: SourceDescriptor,
    /// Join key, output columns, result row cap
    pub join: JoinSpec,
}

/// Default global timeout for the full pipeline (60 seconds).
pub const DEFAULT_GLOBAL_TIMEOUT_MS: u64 = 60_000;

/// Options for one pipeline execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineOptions {
    /// Global timeout over connect + read + join + emit (default: 60_000).
    /// Resource release still runs after a timeout.
    pub timeout_ms: Option<u64>,
    /// Per-connection and per-read timeouts
    pub context: ContextConfig,
}

/// Fetch statistics for a single source read.
#[derive(Debug, Clone, Serialize)]
pub struct SourceFetchStats {
    /// Source family ("warehouse" / "relational")
    pub source: String,
    /// Table name
    pub table: String,
    /// Number of rows materialized
    pub row_count: u64,
    /// Read duration in milliseconds
    pub fetch_time_ms: f64,
}

/// Execution report for a completed pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    /// Per-source fetch statistics
    pub sources: Vec<SourceFetchStats>,
    /// Rows actually emitted (bounded by the row cap)
    pub rows_emitted: u64,
    /// Join + projection time in milliseconds
    pub join_time_ms: f64,
    /// Total pipeline time in milliseconds
    pub total_time_ms: f64,
}
