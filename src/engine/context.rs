//! Execution context
//!
//! Centralized ownership of all live source sessions for one pipeline run.
//! This is the SINGLE SOURCE OF TRUTH for connection state: sessions are
//! tracked here, not inside the engines, and `release` tears down whatever
//! is still open regardless of how the run ended.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::time::{timeout, Duration};
use tracing::instrument;

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::registry::SourceRegistry;
use crate::engine::traits::SourceEngine;
use crate::engine::types::{SessionId, SourceDescriptor, Table};
use crate::sources::{RelationalEngine, WarehouseEngine};

/// Tuning knobs for the execution context. Everything has a default; the
/// host environment only overrides what it cares about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Timeout for establishing one source connection
    pub connect_timeout_ms: u64,
    /// Timeout for one full table read
    pub read_timeout_ms: u64,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 15_000,
            read_timeout_ms: 30_000,
        }
    }
}

/// Active session with the descriptor it was opened for
struct ActiveSource {
    source_id: String,
    table: String,
}

/// One live session against the execution runtime.
///
/// Created once per run, released exactly once at the end — `release` is
/// idempotent, so every exit path may call it without double-teardown.
/// Concurrent read-only use by both source reads is supported: reads take
/// shared access to the session table and never mutate it.
pub struct ExecutionContext {
    registry: Arc<SourceRegistry>,
    sessions: RwLock<HashMap<SessionId, ActiveSource>>,
    released: AtomicBool,
    config: ContextConfig,
}

impl ExecutionContext {
    /// Acquires a context backed by the default registry: the warehouse
    /// catalog engine and the relational engine.
    pub fn acquire(config: ContextConfig) -> EngineResult<Self> {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(WarehouseEngine::new()));
        registry.register(Arc::new(RelationalEngine::new()));
        Self::with_registry(Arc::new(registry), config)
    }

    /// Acquires a context over a caller-supplied registry.
    pub fn with_registry(
        registry: Arc<SourceRegistry>,
        config: ContextConfig,
    ) -> EngineResult<Self> {
        if registry.is_empty() {
            return Err(EngineError::invalid_config(
                "execution context requires at least one registered source engine",
            ));
        }
        if config.connect_timeout_ms == 0 || config.read_timeout_ms == 0 {
            return Err(EngineError::invalid_config(
                "context timeouts must be non-zero",
            ));
        }

        Ok(Self {
            registry,
            sessions: RwLock::new(HashMap::new()),
            released: AtomicBool::new(false),
            config,
        })
    }

    /// Establishes a connection to one source and tracks its session.
    #[instrument(
        skip(self, descriptor),
        fields(source = descriptor.kind().as_str(), table = %descriptor.table)
    )]
    pub async fn connect(&self, descriptor: &SourceDescriptor) -> EngineResult<SessionId> {
        self.ensure_live()?;

        let source_id = descriptor.kind().as_str();
        let engine = self
            .registry
            .get(source_id)
            .ok_or_else(|| EngineError::source_kind_unknown(source_id))?;

        let connect_future = async {
            let session_id = engine.connect(descriptor).await?;

            let mut sessions = self.sessions.write().await;
            sessions.insert(
                session_id,
                ActiveSource {
                    source_id: source_id.to_string(),
                    table: descriptor.table.clone(),
                },
            );

            Ok(session_id)
        };

        match timeout(
            Duration::from_millis(self.config.connect_timeout_ms),
            connect_future,
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                timeout_ms: self.config.connect_timeout_ms,
            }),
        }
    }

    /// Reads the table the session was opened for, in full.
    #[instrument(skip(self), fields(session_id = %session_id.0))]
    pub async fn read_table(&self, session_id: SessionId) -> EngineResult<Table> {
        self.ensure_live()?;

        let (engine, table) = self.engine_for(session_id).await?;

        match timeout(
            Duration::from_millis(self.config.read_timeout_ms),
            engine.read_table(session_id, &table),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(EngineError::Timeout {
                timeout_ms: self.config.read_timeout_ms,
            }),
        }
    }

    /// Disconnects a single session.
    #[instrument(skip(self), fields(session_id = %session_id.0))]
    pub async fn disconnect(&self, session_id: SessionId) -> EngineResult<()> {
        let source = {
            let mut sessions = self.sessions.write().await;
            sessions
                .remove(&session_id)
                .ok_or_else(|| EngineError::session_not_found(session_id.0.to_string()))?
        };

        let engine = self
            .registry
            .get(&source.source_id)
            .ok_or_else(|| EngineError::source_kind_unknown(&source.source_id))?;

        engine.disconnect(session_id).await
    }

    /// Tears down every remaining session. Idempotent: the first call does
    /// the work, later calls are no-ops. Disconnect failures are logged and
    /// the first one is returned after all sessions have been attempted.
    #[instrument(skip(self))]
    pub async fn release(&self) -> EngineResult<()> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let sessions: Vec<(SessionId, ActiveSource)> = {
            let mut sessions = self.sessions.write().await;
            sessions.drain().collect()
        };

        let mut first_err = None;
        for (session_id, source) in sessions {
            let Some(engine) = self.registry.get(&source.source_id) else {
                continue;
            };
            if let Err(err) = engine.disconnect(session_id).await {
                tracing::warn!(
                    source = %source.source_id,
                    table = %source.table,
                    error = %err,
                    "failed to disconnect session during release"
                );
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Number of sessions currently tracked.
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    fn ensure_live(&self) -> EngineResult<()> {
        if self.released.load(Ordering::SeqCst) {
            return Err(EngineError::internal(
                "execution context already released",
            ));
        }
        Ok(())
    }

    async fn engine_for(
        &self,
        session_id: SessionId,
    ) -> EngineResult<(Arc<dyn SourceEngine>, String)> {
        let sessions = self.sessions.read().await;
        let source = sessions
            .get(&session_id)
            .ok_or_else(|| EngineError::session_not_found(session_id.0.to_string()))?;

        let engine = self
            .registry
            .get(&source.source_id)
            .ok_or_else(|| EngineError::source_kind_unknown(&source.source_id))?;

        Ok((engine, source.table.clone()))
    }
}
