// SPDX-License-Identifier: Apache-2.0

//! Pipeline lifecycle controller.
//!
//! Orchestrates one run end-to-end:
//! acquire context → connect both sources → read both tables concurrently →
//! equi-join + project → emit bounded rows → release context.
//!
//! The context is released on every exit path, including timeouts and
//! failures partway through. Output is all-or-nothing: no row is written
//! unless both reads and the join fully succeeded.

pub mod types;

use std::io::Write;
use std::time::Instant;

use tokio::time::{timeout, Duration};
use tracing::instrument;

use crate::engine::context::ExecutionContext;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{SessionId, SourceDescriptor, Table};
use crate::{join, sink};

pub use types::{PipelineOptions, PipelineReport, PipelineSpec, SourceFetchStats};

/// Runs the pipeline against the default registry (warehouse + relational
/// engines), writing result lines to `out`.
pub async fn run<W: Write>(
    options: &PipelineOptions,
    spec: &PipelineSpec,
    out: &mut W,
) -> EngineResult<PipelineReport> {
    let ctx = ExecutionContext::acquire(options.context.clone())?;
    run_with_context(ctx, options, spec, out).await
}

/// Runs the pipeline over a caller-supplied context and consumes it.
///
/// The context is released exactly once, on every exit path. A global
/// timeout bounds the whole sequence; release still runs after it fires.
#[instrument(skip_all, fields(
    warehouse_table = %spec.warehouse.table,
    relational_table = %spec.relational.table,
    key = %spec.join.key
))]
pub async fn run_with_context<W: Write>(
    ctx: ExecutionContext,
    options: &PipelineOptions,
    spec: &PipelineSpec,
    out: &mut W,
) -> EngineResult<PipelineReport> {
    let total_start = Instant::now();
    let global_timeout = options.timeout_ms.unwrap_or(types::DEFAULT_GLOBAL_TIMEOUT_MS);

    let result = match timeout(
        Duration::from_millis(global_timeout),
        run_inner(&ctx, spec, out),
    )
    .await
    {
        Ok(inner) => inner,
        Err(_) => Err(EngineError::Timeout {
            timeout_ms: global_timeout,
        }),
    };

    // Release on every exit path. A release failure after a successful run
    // is still a failure; after a failed run the pipeline error wins.
    let release_result = ctx.release().await;

    let mut report = result?;
    release_result?;

    report.total_time_ms = total_start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        rows_emitted = report.rows_emitted,
        total_time_ms = report.total_time_ms,
        "pipeline completed"
    );

    Ok(report)
}

async fn run_inner<W: Write>(
    ctx: &ExecutionContext,
    spec: &PipelineSpec,
    out: &mut W,
) -> EngineResult<PipelineReport> {
    let warehouse_session = ctx.connect(&spec.warehouse).await?;
    let relational_session = ctx.connect(&spec.relational).await?;

    // The two reads touch independent backends and share no mutable state,
    // so they run concurrently. If either fails, try_join! drops the
    // sibling future (best-effort cancellation) and no join is attempted.
    let (warehouse, relational) = tokio::try_join!(
        read_source(ctx, warehouse_session, &spec.warehouse),
        read_source(ctx, relational_session, &spec.relational),
    )?;

    let (left, warehouse_stats) = warehouse;
    let (right, relational_stats) = relational;

    let join_start = Instant::now();
    let joined = join::join(&left, &right, &spec.join)?;
    let join_time_ms = join_start.elapsed().as_secs_f64() * 1000.0;

    let rows_emitted = sink::emit(&joined, spec.join.max_rows, out)?;

    Ok(PipelineReport {
        sources: vec![warehouse_stats, relational_stats],
        rows_emitted,
        join_time_ms,
        total_time_ms: 0.0, // Set by caller
    })
}

/// Reads one side in full and captures its fetch statistics.
async fn read_source(
    ctx: &ExecutionContext,
    session: SessionId,
    descriptor: &SourceDescriptor,
) -> EngineResult<(Table, SourceFetchStats)> {
    let start = Instant::now();

    let table = ctx.read_table(session).await.map_err(|err| {
        tracing::error!(
            source = descriptor.kind().as_str(),
            table = %descriptor.table,
            error = %err,
            "source read failed"
        );
        err
    })?;

    let stats = SourceFetchStats {
        source: descriptor.kind().as_str().to_string(),
        table: descriptor.table.clone(),
        row_count: table.row_count() as u64,
        fetch_time_ms: start.elapsed().as_secs_f64() * 1000.0,
    };

    Ok((table, stats))
}
