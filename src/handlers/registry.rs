use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use super::traits::PrefetchHandler;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("handler not found: {0}")]
    NotFound(String),
}

/// Registry mapping content types to handler instances
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn PrefetchHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: BTreeMap::new(),
        }
    }

    /// Register a handler under its own mod name, replacing any previous one
    pub fn register(&mut self, handler: Arc<dyn PrefetchHandler>) {
        let mod_name = handler.mod_name().to_string();
        tracing::debug!(mod_name, handler = handler.name(), "Registered prefetch handler");
        self.handlers.insert(mod_name, handler);
    }

    pub fn get(&self, mod_name: &str) -> Result<Arc<dyn PrefetchHandler>, RegistryError> {
        self.handlers
            .get(mod_name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(mod_name.to_string()))
    }

    pub fn has_handler(&self, mod_name: &str) -> bool {
        self.handlers.contains_key(mod_name)
    }

    pub fn handlers(&self) -> impl Iterator<Item = &Arc<dyn PrefetchHandler>> {
        self.handlers.values()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
