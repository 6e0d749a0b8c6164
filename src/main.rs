// SPDX-License-Identifier: Apache-2.0

//! Process entrypoint: configuration in, result rows out.
//!
//! Result lines go to stdout; all logging goes to stderr. The optional
//! post-run idle is host-level convenience and runs after the pipeline has
//! released every resource.

use std::io::Write;

use joinpipe::{config::HostConfig, observability, pipeline};

#[tokio::main]
async fn main() {
    observability::init_tracing();

    let config = match HostConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "invalid configuration");
            std::process::exit(2);
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match pipeline::run(&config.options, &config.spec, &mut out).await {
        Ok(report) => {
            let _ = out.flush();
            tracing::info!(
                rows_emitted = report.rows_emitted,
                join_time_ms = report.join_time_ms,
                total_time_ms = report.total_time_ms,
                "run finished"
            );

            if let Some(secs) = config.idle_after_run_secs {
                tracing::info!(idle_secs = secs, "idling before shutdown");
                tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
            }
        }
        Err(err) => {
            tracing::error!(error = %err, "pipeline failed");
            std::process::exit(1);
        }
    }
}
