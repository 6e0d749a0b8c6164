// SPDX-License-Identifier: Apache-2.0

//! Host-supplied configuration.
//!
//! The pipeline itself takes structured specs; this module is the thin
//! boundary where the host environment (environment variables) becomes one.
//! Every knob is prefixed `JOINPIPE_`.

use crate::engine::context::ContextConfig;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::types::{Credentials, JoinSpec, SourceDescriptor, SourceLocation};
use crate::pipeline::{PipelineOptions, PipelineSpec};

/// Fully parsed host configuration for one run.
#[derive(Debug, Clone)]
pub struct HostConfig {
    pub spec: PipelineSpec,
    pub options: PipelineOptions,
    /// Optional post-run idle before shutdown, owned by the host process
    /// (keeps an external dashboard alive); not part of the pipeline.
    pub idle_after_run_secs: Option<u64>,
}

impl HostConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an injectable lookup (testable seam).
    pub fn from_vars<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                EngineError::invalid_config(format!("missing environment variable {key}"))
            })
        };

        let parse_u64 = |key: &str| -> EngineResult<Option<u64>> {
            lookup(key)
                .map(|v| {
                    v.parse::<u64>().map_err(|_| {
                        EngineError::invalid_config(format!("{key} must be an integer, got '{v}'"))
                    })
                })
                .transpose()
        };

        let warehouse = SourceDescriptor {
            location: SourceLocation::Catalog {
                path: required("JOINPIPE_WAREHOUSE_CATALOG")?,
            },
            table: required("JOINPIPE_WAREHOUSE_TABLE")?,
        };

        let relational = SourceDescriptor {
            location: SourceLocation::Remote {
                uri: required("JOINPIPE_RELATIONAL_URI")?,
                credentials: Credentials::new(
                    required("JOINPIPE_RELATIONAL_USERNAME")?,
                    required("JOINPIPE_RELATIONAL_PASSWORD")?,
                ),
            },
            table: required("JOINPIPE_RELATIONAL_TABLE")?,
        };

        let output_columns: Vec<String> = required("JOINPIPE_OUTPUT_COLUMNS")?
            .split(',')
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if output_columns.is_empty() {
            return Err(EngineError::invalid_config(
                "JOINPIPE_OUTPUT_COLUMNS must name at least one column",
            ));
        }

        let max_rows = parse_u64("JOINPIPE_MAX_ROWS")?.ok_or_else(|| {
            EngineError::invalid_config("missing environment variable JOINPIPE_MAX_ROWS")
        })? as usize;

        let join = JoinSpec {
            key: required("JOINPIPE_JOIN_KEY")?,
            output_columns,
            max_rows,
        };

        let mut context = ContextConfig::default();
        if let Some(ms) = parse_u64("JOINPIPE_CONNECT_TIMEOUT_MS")? {
            context.connect_timeout_ms = ms;
        }
        if let Some(ms) = parse_u64("JOINPIPE_READ_TIMEOUT_MS")? {
            context.read_timeout_ms = ms;
        }

        let options = PipelineOptions {
            timeout_ms: parse_u64("JOINPIPE_TIMEOUT_MS")?,
            context,
        };

        Ok(Self {
            spec: PipelineSpec {
                warehouse,
                relational,
                join,
            },
            options,
            idle_after_run_secs: parse_u64("JOINPIPE_IDLE_AFTER_RUN_SECS")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("JOINPIPE_WAREHOUSE_CATALOG", "/data/warehouse.duckdb"),
            ("JOINPIPE_WAREHOUSE_TABLE", "db_hive.emp"),
            ("JOINPIPE_RELATIONAL_URI", "mysql://bigdata:3306/test"),
            ("JOINPIPE_RELATIONAL_TABLE", "tb_dept"),
            ("JOINPIPE_RELATIONAL_USERNAME", "root"),
            ("JOINPIPE_RELATIONAL_PASSWORD", "secret"),
            ("JOINPIPE_JOIN_KEY", "deptno"),
            ("JOINPIPE_OUTPUT_COLUMNS", "empno, sal, dname"),
            ("JOINPIPE_MAX_ROWS", "14"),
        ])
    }

    fn config_from(vars: HashMap<&'static str, &'static str>) -> EngineResult<HostConfig> {
        HostConfig::from_vars(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn parses_a_complete_configuration() {
        let config = config_from(base_vars()).expect("config");

        assert_eq!(config.spec.warehouse.table, "db_hive.emp");
        assert_eq!(config.spec.relational.table, "tb_dept");
        assert_eq!(config.spec.join.key, "deptno");
        assert_eq!(config.spec.join.output_columns, vec!["empno", "sal", "dname"]);
        assert_eq!(config.spec.join.max_rows, 14);
        assert_eq!(config.idle_after_run_secs, None);
        assert_eq!(config.options.timeout_ms, None);
    }

    #[test]
    fn missing_variable_is_reported_by_name() {
        let mut vars = base_vars();
        vars.remove("JOINPIPE_JOIN_KEY");

        let err = config_from(vars).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidConfig { ref message } if message.contains("JOINPIPE_JOIN_KEY")
        ));
    }

    #[test]
    fn unparsable_row_cap_is_rejected() {
        let mut vars = base_vars();
        vars.insert("JOINPIPE_MAX_ROWS", "fourteen");

        let err = config_from(vars).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn empty_output_column_list_is_rejected() {
        let mut vars = base_vars();
        vars.insert("JOINPIPE_OUTPUT_COLUMNS", " , ");

        let err = config_from(vars).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig { .. }));
    }

    #[test]
    fn optional_knobs_are_honored() {
        let mut vars = base_vars();
        vars.insert("JOINPIPE_TIMEOUT_MS", "5000");
        vars.insert("JOINPIPE_READ_TIMEOUT_MS", "1000");
        vars.insert("JOINPIPE_IDLE_AFTER_RUN_SECS", "60");

        let config = config_from(vars).expect("config");
        assert_eq!(config.options.timeout_ms, Some(5000));
        assert_eq!(config.options.context.read_timeout_ms, 1000);
        assert_eq!(config.idle_after_run_secs, Some(60));
    }
}
