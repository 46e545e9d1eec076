use std::sync::Arc;
use std::time::Instant;

use moka::sync::Cache;
use tracing::{debug, info};

use crate::config::Lang;
use crate::error::{Error, Result};
use super::registry::{ModelRegistry, ModelSpec};
use super::traits::{EngineLoader, TranslationEngine};

/// Loaded engines keyed by target language.
///
/// Concurrent requests for the same language wait on a single load; a
/// failed load is not cached, so the next request tries again.
pub struct EngineCache {
    registry: ModelRegistry,
    loader: Arc<dyn EngineLoader>,
    engines: Option<Cache<Lang, Arc<dyn TranslationEngine>>>,
}

impl EngineCache {
    /// `capacity` is the number of engines kept loaded; 0 loads per request.
    pub fn new(registry: ModelRegistry, loader: Arc<dyn EngineLoader>, capacity: u64) -> Self {
        let engines = (capacity > 0).then(|| Cache::builder().max_capacity(capacity).build());

        Self {
            registry,
            loader,
            engines,
        }
    }

    pub const fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Get the engine for `target`, loading it on first use.
    pub fn get(&self, target: &Lang) -> Result<Arc<dyn TranslationEngine>> {
        let spec = self.registry.resolve(target)?;

        match &self.engines {
            None => self.load(&spec),
            Some(cache) => {
                if let Some(engine) = cache.get(&spec.target) {
                    debug!("Engine cache hit for {}", spec.target);
                    return Ok(engine);
                }
                cache
                    .try_get_with(spec.target.clone(), || self.load(&spec))
                    .map_err(Error::from_shared)
            }
        }
    }

    fn load(&self, spec: &ModelSpec) -> Result<Arc<dyn TranslationEngine>> {
        info!("Loading translation model {}", spec.model_id);
        let started = Instant::now();
        let engine = self.loader.load(spec)?;
        debug!("{} ready after {:.1?}", spec.model_id, started.elapsed());
        Ok(engine)
    }
}
