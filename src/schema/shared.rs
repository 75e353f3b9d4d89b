//! Process-wide registry handle with one-time initialization.

use super::registry::SchemaRegistry;
use crate::config::ScimCoreConfig;
use crate::error::BuildResult;
use log::{info, warn};
use std::sync::{Arc, PoisonError, RwLock};

/// Lazily built, shareable [`SchemaRegistry`].
///
/// The registry is built on first access. Concurrent first callers
/// serialize on the write lock and the second one finds the registry already
/// present, so it is built at most once. A failed build is not cached: the
/// next call retries.
#[derive(Debug)]
pub struct SharedSchemaRegistry {
    config: ScimCoreConfig,
    registry: RwLock<Option<Arc<SchemaRegistry>>>,
}

impl SharedSchemaRegistry {
    pub fn new(config: ScimCoreConfig) -> Self {
        Self {
            config,
            registry: RwLock::new(None),
        }
    }

    /// Wrap an already-built registry.
    pub fn from_registry(config: ScimCoreConfig, registry: SchemaRegistry) -> Self {
        Self {
            config,
            registry: RwLock::new(Some(Arc::new(registry))),
        }
    }

    pub fn config(&self) -> &ScimCoreConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Get the registry, building it on first use.
    pub fn get(&self) -> BuildResult<Arc<SchemaRegistry>> {
        if let Some(registry) = self
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(Arc::clone(registry));
        }

        let mut slot = self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(registry) = slot.as_ref() {
            return Ok(Arc::clone(registry));
        }

        let registry = Arc::new(SchemaRegistry::from_config(&self.config)?);
        *slot = Some(Arc::clone(&registry));
        info!("Shared schema registry initialized");
        Ok(registry)
    }

    /// Rebuild the registry from config and swap it in.
    ///
    /// Holders of the previous `Arc` keep using the old registry. On failure
    /// the current registry stays in place.
    pub fn reload(&self) -> BuildResult<Arc<SchemaRegistry>> {
        let registry = match SchemaRegistry::from_config(&self.config) {
            Ok(registry) => Arc::new(registry),
            Err(e) => {
                warn!("Schema registry reload failed, keeping current registry: {}", e);
                return Err(e);
            }
        };

        *self
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&registry));
        info!("Shared schema registry reloaded");
        Ok(registry)
    }
}

impl Default for SharedSchemaRegistry {
    fn default() -> Self {
        Self::new(ScimCoreConfig::default())
    }
}
