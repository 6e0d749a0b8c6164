//! Source Registry
//!
//! Central registry for the available source backends. New backends plug in
//! by implementing [`SourceEngine`] and registering here.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::traits::SourceEngine;

/// Registry that holds all available source engines
pub struct SourceRegistry {
    engines: HashMap<String, Arc<dyn SourceEngine>>,
}

impl SourceRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            engines: HashMap::new(),
        }
    }

    /// Registers a new engine
    ///
    /// The engine's `source_id()` is used as the key.
    pub fn register(&mut self, engine: Arc<dyn SourceEngine>) {
        let id = engine.source_id().to_string();
        self.engines.insert(id, engine);
    }

    /// Gets an engine by its ID
    pub fn get(&self, source_id: &str) -> Option<Arc<dyn SourceEngine>> {
        self.engines.get(source_id).cloned()
    }

    /// Lists all registered engine IDs
    pub fn list(&self) -> Vec<&str> {
        self.engines.keys().map(|s| s.as_str()).collect()
    }

    /// Returns the number of registered engines
    pub fn len(&self) -> usize {
        self.engines.len()
    }

    /// Returns true if no engines are registered
    pub fn is_empty(&self) -> bool {
        self.engines.is_empty()
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
